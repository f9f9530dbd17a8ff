//! # Daemon Connection
//!
//! Purpose: Own one TCP connection to searchd for the duration of a single
//! request/response round trip.
//!
//! ## Design Principles
//! 1. **Connection Per Call**: Opened, used once, dropped; no reuse.
//! 2. **Handshake Up Front**: A connection is only handed out after the
//!    version marker exchange succeeded.
//! 3. **Exact Reads**: Frames are read with `read_exact`, which retries short
//!    reads and reports a closed socket as `UnexpectedEof`.

use std::io::{self, BufReader, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};

use bytes::Buf;
use tracing::{debug, trace};

use sphinx_common::{SphinxError, SphinxResult, HANDSHAKE_CLIENT, HANDSHAKE_SERVER};

use crate::client::ClientConfig;

/// Size of status + version + length.
const RESPONSE_HEADER_LEN: usize = 8;

/// One response frame as read off the socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub status: u16,
    pub version: u16,
    pub payload: Vec<u8>,
}

/// Handshaken TCP connection to the daemon.
pub struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<TcpStream>,
}

impl Connection {
    /// Dials the configured daemon and performs the handshake.
    pub fn open(config: &ClientConfig) -> SphinxResult<Self> {
        let mut stream = connect_stream(config)?;
        stream.set_nodelay(true)?;
        handshake(&mut stream)?;
        debug!(addr = %config.addr(), "searchd handshake complete");

        Ok(Connection {
            reader: BufReader::new(stream),
        })
    }

    /// Writes the whole request buffer.
    pub fn send(&mut self, data: &[u8]) -> SphinxResult<()> {
        let stream = self.reader.get_mut();
        stream.write_all(data)?;
        stream.flush()?;
        Ok(())
    }

    /// Reads one complete response frame.
    pub fn receive_frame(&mut self) -> SphinxResult<Frame> {
        read_frame(&mut self.reader)
    }
}

fn connect_stream(config: &ClientConfig) -> SphinxResult<TcpStream> {
    let addr = config.addr();
    let connection_error = |source: io::Error| SphinxError::Connection {
        addr: addr.clone(),
        source,
    };

    let candidates = (config.host.as_str(), config.port)
        .to_socket_addrs()
        .map_err(connection_error)?;

    let mut last_err = None;
    for candidate in candidates {
        match TcpStream::connect_timeout(&candidate, config.connect_timeout) {
            Ok(stream) => return Ok(stream),
            Err(err) => {
                debug!(addr = %candidate, error = %err, "connect attempt failed");
                last_err = Some(err);
            }
        }
    }

    Err(connection_error(last_err.unwrap_or_else(|| {
        io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses")
    })))
}

/// Exchanges the 4-byte protocol markers.
///
/// On mismatch nothing is written back and the caller drops the stream.
pub fn handshake<S: Read + Write>(stream: &mut S) -> SphinxResult<()> {
    let mut marker = [0u8; 4];
    stream.read_exact(&mut marker)?;
    if marker != HANDSHAKE_SERVER {
        return Err(SphinxError::VersionMismatch { received: marker });
    }
    stream.write_all(&HANDSHAKE_CLIENT)?;
    stream.flush()?;
    Ok(())
}

/// Reads a status/version/length header and exactly `length` payload bytes.
pub fn read_frame<R: Read>(reader: &mut R) -> SphinxResult<Frame> {
    let mut header = [0u8; RESPONSE_HEADER_LEN];
    reader.read_exact(&mut header)?;

    let mut header = &header[..];
    let status = header.get_u16();
    let version = header.get_u16();
    let len = header.get_u32() as usize;
    trace!(status, version, len, "response frame header");

    // Grow with the data actually received instead of trusting `len` upfront.
    let mut payload = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut payload)?;
    if payload.len() != len {
        return Err(SphinxError::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("response frame truncated: {} of {} bytes", payload.len(), len),
        )));
    }

    Ok(Frame {
        status,
        version,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    /// In-memory duplex: reads come from `input`, writes land in `output`.
    struct Duplex {
        input: Cursor<Vec<u8>>,
        output: Vec<u8>,
    }

    impl Read for Duplex {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for Duplex {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// Hands out at most one byte per read call.
    struct Trickle(Cursor<Vec<u8>>);

    impl Read for Trickle {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let len = buf.len().min(1);
            self.0.read(&mut buf[..len])
        }
    }

    #[test]
    fn handshake_accepts_expected_marker() {
        let mut duplex = Duplex {
            input: Cursor::new(HANDSHAKE_SERVER.to_vec()),
            output: Vec::new(),
        };
        handshake(&mut duplex).unwrap();
        assert_eq!(duplex.output, HANDSHAKE_CLIENT.to_vec());
    }

    #[test]
    fn handshake_rejects_other_marker() {
        let mut duplex = Duplex {
            input: Cursor::new(vec![0, 0, 0, 1]),
            output: Vec::new(),
        };
        match handshake(&mut duplex) {
            Err(SphinxError::VersionMismatch { received }) => assert_eq!(received, [0, 0, 0, 1]),
            other => panic!("expected version mismatch, got {:?}", other),
        }
        assert!(duplex.output.is_empty());
    }

    #[test]
    fn reads_frame_across_short_reads() {
        let mut raw = vec![0, 3, 0x01, 0x13, 0, 0, 0, 3];
        raw.extend_from_slice(b"abc");
        let frame = read_frame(&mut Trickle(Cursor::new(raw))).unwrap();
        assert_eq!(frame.status, 3);
        assert_eq!(frame.version, 0x0113);
        assert_eq!(frame.payload, b"abc".to_vec());
    }

    #[test]
    fn truncated_payload_is_eof() {
        let raw = vec![0, 0, 0x01, 0x13, 0, 0, 0, 10, 1, 2];
        match read_frame(&mut Cursor::new(raw)) {
            Err(SphinxError::Io(err)) => assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof),
            other => panic!("expected eof, got {:?}", other),
        }
    }

    #[test]
    fn truncated_header_is_eof() {
        let raw = vec![0, 0, 0x01];
        assert!(matches!(
            read_frame(&mut Cursor::new(raw)),
            Err(SphinxError::Io(_))
        ));
    }
}

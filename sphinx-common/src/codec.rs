//! # Wire Codec
//!
//! Purpose: Encode and decode the searchd framing primitives: big-endian
//! integers, length-prefixed byte strings, and floats carried as raw 32-bit
//! words.
//!
//! ## Design Principles
//! 1. **No I/O**: Works purely on buffers; sockets live in the client crate.
//! 2. **Bounds First**: Every read checks the remaining length before touching
//!    bytes, so a short payload becomes `SphinxError::Malformed`, never a panic.
//! 3. **Binary-Safe**: Strings are raw bytes on the wire; no encoding
//!    conversion happens on the way out, and decoding is lossy UTF-8.
//!
//! ## Memory Layout Example
//!
//! ```text
//! String "abc":
//! +------------------+-----------+
//! | len:4B (0x0003)  | 'a' 'b' 'c'|
//! +------------------+-----------+
//! ```

use bytes::{Buf, BufMut};

use crate::error::{SphinxError, SphinxResult};

/// Writes a 4-byte big-endian length followed by the raw bytes.
pub fn put_str<B: BufMut>(out: &mut B, value: &str) {
    put_bytes(out, value.as_bytes());
}

/// Writes a 4-byte big-endian length followed by `data`.
pub fn put_bytes<B: BufMut>(out: &mut B, data: &[u8]) {
    out.put_i32(data.len() as i32);
    out.put_slice(data);
}

/// Writes a float as its IEEE-754 bit pattern.
pub fn put_float<B: BufMut>(out: &mut B, value: f32) {
    out.put_u32(value.to_bits());
}

/// Writes a boolean as a 4-byte 0/1 flag.
pub fn put_flag<B: BufMut>(out: &mut B, value: bool) {
    out.put_i32(i32::from(value));
}

/// Cursor over a response payload.
///
/// Each read names what it was looking for so that a truncated payload
/// reports the field that ran past the end.
#[derive(Debug, Clone)]
pub struct WireReader<'a> {
    buf: &'a [u8],
    total: usize,
}

impl<'a> WireReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        WireReader {
            buf,
            total: buf.len(),
        }
    }

    /// Bytes not yet consumed.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    pub fn has_remaining(&self) -> bool {
        self.buf.has_remaining()
    }

    /// Offset of the next unread byte from the start of the payload.
    #[inline]
    pub fn position(&self) -> usize {
        self.total - self.buf.len()
    }

    pub fn read_u16(&mut self, what: &str) -> SphinxResult<u16> {
        self.ensure(2, what)?;
        Ok(self.buf.get_u16())
    }

    pub fn read_u32(&mut self, what: &str) -> SphinxResult<u32> {
        self.ensure(4, what)?;
        Ok(self.buf.get_u32())
    }

    pub fn read_u64(&mut self, what: &str) -> SphinxResult<u64> {
        self.ensure(8, what)?;
        Ok(self.buf.get_u64())
    }

    /// Reads a raw 32-bit word and reinterprets it as a float.
    pub fn read_float(&mut self, what: &str) -> SphinxResult<f32> {
        self.read_u32(what).map(f32::from_bits)
    }

    /// Reads a 4-byte length and then that many raw bytes.
    pub fn read_bytes(&mut self, what: &str) -> SphinxResult<&'a [u8]> {
        let len = self.read_u32(what)? as usize;
        self.take(len, what)
    }

    /// Reads a length-prefixed string, replacing invalid UTF-8.
    pub fn read_string(&mut self, what: &str) -> SphinxResult<String> {
        self.read_bytes(what)
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
    }

    /// Splits off exactly `len` bytes.
    pub fn take(&mut self, len: usize, what: &str) -> SphinxResult<&'a [u8]> {
        self.ensure(len, what)?;
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    /// Everything not yet consumed, leaving the reader empty.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = self.buf;
        self.buf = &[];
        rest
    }

    fn ensure(&self, len: usize, what: &str) -> SphinxResult<()> {
        if self.buf.remaining() < len {
            return Err(SphinxError::malformed(format!(
                "{} needs {} bytes at offset {}, {} left",
                what,
                len,
                self.position(),
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}

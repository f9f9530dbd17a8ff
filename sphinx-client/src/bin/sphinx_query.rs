//! # Query Driver
//!
//! Purpose: Run one search against a live searchd and print the decoded
//! result as JSON.
//!
//! Usage: `sphinx-query <query> <indexes> [comment]`
//!
//! The daemon address comes from `SPHINX_HOST` / `SPHINX_PORT`, and the dial
//! timeout from `SPHINX_TIMEOUT_SECS`. Log verbosity follows `RUST_LOG`.

use std::env;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use sphinx_client::{ClientConfig, SphinxClient};

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let (query, indexes) = match (args.next(), args.next()) {
        (Some(query), Some(indexes)) => (query, indexes),
        _ => bail!("usage: sphinx-query <query> <indexes> [comment]"),
    };
    let comment = args.next().unwrap_or_default();

    let config = config_from_env()?;
    info!(addr = %config.addr(), %indexes, "running query");
    let client = SphinxClient::with_config(config)?;

    let result = client
        .query(&query, &indexes, &comment)
        .with_context(|| format!("query {:?} against {:?} failed", query, indexes))?;

    info!(
        total = result.total,
        total_found = result.total_found,
        time = result.time,
        "query finished"
    );
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

fn config_from_env() -> Result<ClientConfig> {
    let mut config = ClientConfig::default();
    if let Ok(host) = env::var("SPHINX_HOST") {
        config.host = host;
    }
    if let Ok(port) = env::var("SPHINX_PORT") {
        config.port = port
            .parse()
            .with_context(|| format!("SPHINX_PORT is not a port: {:?}", port))?;
    }
    if let Ok(secs) = env::var("SPHINX_TIMEOUT_SECS") {
        let secs: u64 = secs
            .parse()
            .with_context(|| format!("SPHINX_TIMEOUT_SECS is not a number: {:?}", secs))?;
        config.connect_timeout = Duration::from_secs(secs);
    }
    Ok(config)
}

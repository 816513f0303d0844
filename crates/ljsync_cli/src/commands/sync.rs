//! The `sync` command: run one full export and emit JSON-lines records.

use crate::client::ReqwestClient;
use ljsync_engine::{HttpTransport, RetryConfig, SyncConfig, SyncEngine};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Runs one full sync and writes one JSON record per line.
pub fn run(
    username: &str,
    password: &str,
    server: &str,
    output: Option<&Path>,
    max_failures: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = SyncConfig::new(username, password)
        .with_host(server)
        .with_retry(RetryConfig::new(max_failures));
    let transport = HttpTransport::new(server, ReqwestClient::new()?);
    let engine = SyncEngine::new(config, transport);

    tracing::info!(username, server, "starting sync");
    let outcome = engine.sync()?;

    match output {
        Some(path) => {
            let file = File::create(path)?;
            write_records(BufWriter::new(file), &outcome.records)?;
            tracing::info!(path = %path.display(), records = outcome.records.len(), "records written");
        }
        None => {
            let stdout = std::io::stdout();
            write_records(stdout.lock(), &outcome.records)?;
        }
    }

    tracing::info!(
        posts = outcome.stats.posts_fetched,
        comments = outcome.stats.comments_fetched,
        dropped = outcome.stats.posts_dropped + outcome.stats.comments_dropped,
        retries = outcome.stats.retries,
        "sync finished"
    );
    Ok(())
}

fn write_records(
    mut out: impl Write,
    records: &[ljsync_protocol::Record],
) -> Result<(), Box<dyn std::error::Error>> {
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}

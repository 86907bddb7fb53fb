//! TCP front end: one command per line, one JSON response per line

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tablecache::MemoryStore;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::handler::{CommandHandler, Response};

/// Accept clients until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, handler: Arc<CommandHandler>, shutdown: F)
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    info!("New connection from {}", addr);
                    let handler = Arc::clone(&handler);

                    tokio::spawn(async move {
                        if let Err(e) = handle_client(stream, handler).await {
                            error!("Error handling client {}: {}", addr, e);
                        }
                        info!("Connection closed: {}", addr);
                    });
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                }
            },
            _ = &mut shutdown => return,
        }
    }
}

async fn handle_client(stream: TcpStream, handler: Arc<CommandHandler>) -> std::io::Result<()> {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::with_capacity(256);

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }

        let response = match std::str::from_utf8(&buf) {
            Ok(line) if line.trim().is_empty() => continue,
            Ok(line) => handler.handle(line).await,
            Err(e) => {
                warn!("Invalid command bytes: {}", e);
                Response::BadRequest {
                    error: "command is not valid UTF-8".to_string(),
                }
            }
        };
        let mut out = response.to_line();
        out.push('\n');
        writer.write_all(out.as_bytes()).await?;
    }
}

/// Periodically drop expired entries so idle tables release memory
pub fn spawn_purger(store: Arc<MemoryStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            let purged = store.purge_expired();
            if purged > 0 {
                debug!(purged, "Purged expired cache entries");
            }
        }
    })
}

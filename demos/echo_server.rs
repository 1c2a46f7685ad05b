//! Echo server demo.
//!
//! Binds a pipe name, waits for clients, and answers every message with an
//! `echo: ` prefix. Serves one client at a time and re-arms after each
//! disconnect; stop with Ctrl-C.
//!
//! ```sh
//! cargo run --example echo_server [pipe-name]
//! ```

use std::sync::Arc;

use pipelink::{PipeEvent, PipeServer, SessionConfig};

#[cfg(unix)]
const DEFAULT_PIPE_NAME: &str = "/tmp/pipelink-echo.sock";
#[cfg(windows)]
const DEFAULT_PIPE_NAME: &str = r"\\.\pipe\pipelink-echo";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PIPE_NAME.to_string());

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Vec<u8>>();
    let server = Arc::new(PipeServer::bind(
        &name,
        SessionConfig::default(),
        Arc::new(move |event| match event {
            PipeEvent::Connected => tracing::info!("client connected"),
            PipeEvent::Disconnected => tracing::info!("client disconnected"),
            PipeEvent::Received(bytes) => {
                tracing::info!("received {} bytes", bytes.len());
                let _ = tx.send(bytes.to_vec());
            }
            PipeEvent::Exception(e) => tracing::error!("session failed: {}", e),
            PipeEvent::Closed => tracing::info!("server closed"),
        }),
    )?);

    println!("echo server listening on {}", server.pipe_name());

    let echo = server.clone();
    let responder = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let mut reply = b"echo: ".to_vec();
            reply.extend_from_slice(&message);
            if let Err(e) = echo.write(&reply).await {
                tracing::warn!("echo reply failed: {}", e);
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    server.shutdown().await;
    responder.abort();
    Ok(())
}

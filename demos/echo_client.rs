//! Echo client demo.
//!
//! Connects to the echo server and sends every stdin line as one message,
//! printing the replies. An empty line quits.
//!
//! ```sh
//! cargo run --example echo_client [pipe-name]
//! ```

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};

use pipelink::{PipeClient, PipeEvent, SessionConfig};

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

    let client = PipeClient::connect(
        &name,
        SessionConfig::default(),
        Arc::new(|event| match event {
            PipeEvent::Received(bytes) => {
                println!("{}", String::from_utf8_lossy(bytes));
            }
            PipeEvent::Disconnected => {
                tracing::info!("server went away");
                std::process::exit(0);
            }
            PipeEvent::Exception(e) => tracing::error!("session failed: {}", e),
            _ => {}
        }),
    )
    .await?;

    println!("connected to {}; empty line quits", client.pipe_name());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            break;
        }
        client.write(line.as_bytes()).await?;
    }

    client.shutdown().await;
    Ok(())
}

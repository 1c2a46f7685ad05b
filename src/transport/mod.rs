//! Transport module - the platform pipe primitive.
//!
//! Provides [`PipeListener`] and [`PipeStream`] over the local duplex pipe
//! of the platform:
//!
//! - Unix: Unix Domain Socket
//! - Windows: Named Pipe
//!
//! The listener admits one client at a time; the session layer re-arms it
//! after each disconnect.

mod pipe;

pub use pipe::{PipeListener, PipeReadHalf, PipeStream, PipeWriteHalf};

/// Generate a unique pipe path for this process.
///
/// Format:
/// - Unix: `/tmp/pipelink-{pid}-{random}.sock`
/// - Windows: `\\.\pipe\pipelink-{pid}-{random}`
pub fn generate_pipe_path() -> String {
    let pid = std::process::id();
    let rand: u64 = rand_u64();

    #[cfg(unix)]
    {
        format!("/tmp/pipelink-{}-{:x}.sock", pid, rand)
    }

    #[cfg(windows)]
    {
        format!(r"\\.\pipe\pipelink-{}-{:x}", pid, rand)
    }
}

/// Simple random u64 using system time and process ID.
fn rand_u64() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);

    let pid = std::process::id() as u64;
    nanos.wrapping_mul(0x517cc1b727220a95) ^ pid
}

//! Streaming of subprocess output into the log.

use std::io::{BufRead, BufReader, Read};

/// Which pipe of the child a reader thread is draining.
#[derive(Clone, Copy)]
pub(super) enum StreamType {
    Stdout,
    Stderr,
}

impl std::fmt::Display for StreamType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdout => f.write_str("stdout"),
            Self::Stderr => f.write_str("stderr"),
        }
    }
}

/// Extracts a human-readable message from a thread panic payload.
pub(super) fn panic_message(err: &(dyn std::any::Any + Send)) -> &str {
    err.downcast_ref::<&str>()
        .copied()
        .or_else(|| err.downcast_ref::<String>().map(|s| s.as_str()))
        .unwrap_or("unknown panic")
}

/// Drains a pipe line by line into `tracing`.
///
/// mount and curl are quiet on success, so stdout goes to DEBUG while
/// stderr (where both report failures) goes to WARN. Read errors end the
/// stream; the exit status alone decides whether the command succeeded.
pub(super) fn read_pipe_to_log<R: Read>(pipe: Option<R>, command: &str, stream_type: StreamType) {
    let Some(pipe) = pipe else {
        tracing::error!(command, stream = %stream_type, "pipe was not captured");
        return;
    };

    let mut reader = BufReader::new(pipe);
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line) {
            Ok(0) => break,
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end_matches(['\n', '\r']);
                match stream_type {
                    StreamType::Stdout => tracing::debug!(command, stream = %stream_type, "{}", text),
                    StreamType::Stderr => tracing::warn!(command, stream = %stream_type, "{}", text),
                }
            }
            Err(e) => {
                tracing::error!(command, stream = %stream_type, error = %e, "I/O error, stopping read");
                break;
            }
        }
    }
}

//! Interactive phase: forward console lines until the sentinel or end-of-input.

use std::io::BufRead;

use crate::error::ClientResult;
use crate::net::outbound::FrameSink;

/// Line that ends the interactive phase, compared case-insensitively.
pub const DEFAULT_SENTINEL: &str = "bye";

/// Operator input for the interactive phase.
pub type Console = Box<dyn BufRead + Send>;

/// Why the interactive loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractiveEnd {
    /// The sentinel line was forwarded.
    Sentinel,
    /// The console reached end-of-input (or became unreadable).
    EndOfInput,
}

pub struct InteractiveForwarder<R> {
    console: R,
    sentinel: String,
}

impl<R: BufRead> InteractiveForwarder<R> {
    pub fn new(console: R, sentinel: impl Into<String>) -> Self {
        Self {
            console,
            sentinel: sentinel.into().to_lowercase(),
        }
    }

    /// Forward lines to `sink`. Each line, without its terminator, is one write.
    pub fn run(mut self, sink: &dyn FrameSink) -> ClientResult<InteractiveEnd> {
        let mut line = Vec::new();
        loop {
            line.clear();
            match self.console.read_until(b'\n', &mut line) {
                Ok(0) => return Ok(InteractiveEnd::EndOfInput),
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    tracing::warn!(error = %e, "Console read failed, treating as end of input");
                    return Ok(InteractiveEnd::EndOfInput);
                }
            }

            strip_line_ending(&mut line);
            let is_sentinel = self.is_sentinel(&line);
            sink.submit(std::mem::take(&mut line))?;

            if is_sentinel {
                tracing::info!("Bye");
                return Ok(InteractiveEnd::Sentinel);
            }
        }
    }

    fn is_sentinel(&self, line: &[u8]) -> bool {
        String::from_utf8_lossy(line).to_lowercase() == self.sentinel
    }
}

fn strip_line_ending(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

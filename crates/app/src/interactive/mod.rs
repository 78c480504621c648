//! Line oriented front end for the send and receive sessions
//!
//! The event loop owns the session and multiplexes three sources with
//! `tokio::select!`: lines typed or pasted on stdin, events from the task
//! dispatcher, and Ctrl-C. Stdin is only read while the session is idle, so a
//! session never has more than one task in flight.
//!
//! Prompts and status go to stderr. Stdout is left for the payload.

pub mod receive;
pub mod send;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

const PEM_BEGIN: &str = "-----BEGIN";
const PEM_END: &str = "-----END";

/// Reads user input one submission at a time
///
/// A submission is normally one line. A pasted PEM block spans several lines
/// and is collected up to and including its `-----END` line. Partial input is
/// kept across calls, so a pending read can be dropped at any time.
pub struct InputLines<R> {
    lines: Lines<R>,
    block: Option<String>,
    paste: Option<String>,
}

impl InputLines<BufReader<Stdin>> {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }
}

impl<R: AsyncBufRead + Unpin> InputLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            block: None,
            paste: None,
        }
    }

    /// Next submission, trimmed; `None` once input is closed
    pub async fn next_input(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(self.block.take());
            };
            let line = line.trim();

            if let Some(block) = self.block.as_mut() {
                block.push_str(line);
                block.push('\n');
                if line.starts_with(PEM_END) {
                    return Ok(self.block.take());
                }
            } else if line.starts_with(PEM_BEGIN) {
                self.block = Some(format!("{}\n", line));
            } else {
                return Ok(Some(line.to_string()));
            }
        }
    }

    /// Next pasted submission, which may span several lines
    ///
    /// Lines are joined with `\n` until an empty line or the end of input, so
    /// a payload or key wrapped by a mail or chat client arrives whole. An
    /// empty line with nothing pasted before it is returned as `""`.
    pub async fn next_paste(&mut self) -> std::io::Result<Option<String>> {
        loop {
            let Some(line) = self.lines.next_line().await? else {
                return Ok(self.paste.take());
            };
            let line = line.trim();

            if line.is_empty() {
                return Ok(Some(self.paste.take().unwrap_or_default()));
            }

            let paste = self.paste.get_or_insert_with(String::new);
            if !paste.is_empty() {
                paste.push('\n');
            }
            paste.push_str(line);
        }
    }

    /// Read one submission, as a paste when `multiline` is set
    pub async fn next_submission(&mut self, multiline: bool) -> std::io::Result<Option<String>> {
        if multiline {
            self.next_paste().await
        } else {
            self.next_input().await
        }
    }
}

/// Prints a status block only when it differs from the last one
#[derive(Debug, Default)]
pub struct Screen {
    last: Option<String>,
}

impl Screen {
    pub fn show(&mut self, status: String) {
        if self.last.as_deref() != Some(status.as_str()) {
            eprintln!("{}", status);
            self.last = Some(status);
        }
    }
}

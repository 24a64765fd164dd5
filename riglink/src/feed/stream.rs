//! Stream port
//!
//! Owns one server-push connection to the rig's stream endpoint and
//! bridges it to a crossbeam channel. A dedicated thread performs the
//! blocking reads: it frames the byte stream into events, forwards
//! each event's data text, and reports exactly one terminal error
//! when the transport goes down. The thread closes the response
//! before reporting, so by the time a receiver observes the error the
//! connection is no longer open.
//!
//! Note: the reader thread spends its life blocked in a read. When a
//! `StreamPort` is dropped while the connection is healthy, the
//! thread only notices the closed channel at the next event or read
//! error and lingers until then. The connections this client opens
//! are chatty enough that this has not been worth plumbing around.

use std::env;
use std::io;
use std::io::BufRead;
use std::thread;
use std::time::Duration;

use crossbeam::channel;

/// Possible errors when receiving from a `StreamPort`.
#[derive(Debug)]
pub enum RecvError {
    /// The server closed the stream, or the connection dropped.
    Disconnected,
    /// Low level IO error.
    IO(io::Error),
}

/// Possible errors when opening a stream connection.
#[derive(Debug)]
pub enum ConnectError {
    /// The request could not be performed.
    Http(reqwest::Error),
    /// The endpoint answered with a non-success status.
    Status(u16),
}

/// Default size of the rx channel between the reader thread and the
/// stream's consumer.
static DEFAULT_RX_CHANNEL_SIZE: usize = 64;

fn rx_channel_size() -> usize {
    let min_size = DEFAULT_RX_CHANNEL_SIZE;
    if let Ok(req) = env::var("RIGLINK_STREAM_RX_BUFSIZE") {
        std::cmp::max(req.parse().unwrap_or(0), min_size)
    } else {
        min_size
    }
}

/// An HTTP client suitable for long-lived stream requests: a connect
/// timeout only, since the response body never ends on purpose.
pub fn stream_http_client(connect_timeout: Duration) -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .timeout(None)
        .connect_timeout(connect_timeout)
        .build()
        .expect("stream HTTP client construction failure")
}

/// Incremental framer for the `text/event-stream` wire format. Fed
/// one line at a time; returns the completed event data, if any.
pub struct SseFrameParser {
    data: String,
}

impl SseFrameParser {
    pub fn new() -> SseFrameParser {
        SseFrameParser {
            data: String::new(),
        }
    }

    /// Process one line with its terminator already stripped. An
    /// empty line dispatches the accumulated data; `data:` lines
    /// accumulate; comments and any other fields are ignored. An
    /// event with empty data text dispatches nothing.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data));
        }
        if line.starts_with(':') {
            return None;
        }
        if let Some(rest) = line.strip_prefix("data:") {
            let rest = rest.strip_prefix(' ').unwrap_or(rest);
            if !self.data.is_empty() {
                self.data.push('\n');
            }
            self.data.push_str(rest);
        }
        // Other fields (event:, id:, retry:) carry nothing this
        // client uses.
        None
    }
}

impl Default for SseFrameParser {
    fn default() -> SseFrameParser {
        SseFrameParser::new()
    }
}

/// One open stream connection, delivering event data text in arrival
/// order, then a single `Err` when the transport fails.
pub struct StreamPort {
    rx: channel::Receiver<Result<String, RecvError>>,
}

impl StreamPort {
    /// Opens the stream at `url` and starts the reader thread.
    /// Callers must drop any previous port before connecting again;
    /// the client core enforces this as part of its reconnect
    /// protocol.
    pub fn connect(http: &reqwest::blocking::Client, url: &str) -> Result<StreamPort, ConnectError> {
        let response = http
            .get(url)
            .header("Accept", "text/event-stream")
            .send()
            .map_err(ConnectError::Http)?;
        if !response.status().is_success() {
            return Err(ConnectError::Status(response.status().as_u16()));
        }
        let (tx, rx) = channel::bounded(rx_channel_size());
        thread::spawn(move || {
            StreamPort::reader_thread(response, tx);
        });
        Ok(StreamPort { rx })
    }

    /// To receive, or to `select!` over the stream.
    pub fn receiver(&self) -> &channel::Receiver<Result<String, RecvError>> {
        &self.rx
    }

    fn reader_thread(
        response: reqwest::blocking::Response,
        tx: channel::Sender<Result<String, RecvError>>,
    ) {
        let mut reader = io::BufReader::new(response);
        let mut parser = SseFrameParser::new();
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line) {
                Ok(0) => {
                    // Close the connection before reporting, so a
                    // reconnect can never overlap with it.
                    drop(reader);
                    let _ = tx.send(Err(RecvError::Disconnected));
                    return;
                }
                Ok(_) => {
                    let trimmed = line.trim_end_matches(|c| c == '\r' || c == '\n');
                    if let Some(event) = parser.push_line(trimmed) {
                        if tx.send(Ok(event)).is_err() {
                            // Receiver gone: the port was dropped.
                            return;
                        }
                    }
                }
                Err(err) => {
                    drop(reader);
                    let _ = tx.send(Err(RecvError::IO(err)));
                    return;
                }
            }
        }
    }
}

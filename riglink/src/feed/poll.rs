//! Polling fallback
//!
//! Alternate transport to the same data model: one-shot snapshot
//! requests against the rig server, returning the same message and
//! status shapes the stream carries. The message request can resume
//! from the log's high-water cursor, so repeated polls only fetch
//! what the server produced since the last one.

use std::time::Duration;

use serde::Deserialize;

use super::payload::{Message, StatusSnapshot};
use crate::view::{MessageLog, StatusAggregator};

const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Possible errors from one poll request.
#[derive(Debug)]
pub enum PollError {
    /// The request could not be performed.
    Http(reqwest::Error),
    /// The endpoint answered with a non-success status.
    Status(u16),
    /// The response body did not match the expected shape.
    Decode(serde_json::Error),
}

#[derive(Deserialize)]
struct MessagesResponse {
    messages: Vec<Message>,
}

/// One-shot snapshot client for a rig server.
pub struct PollClient {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl PollClient {
    pub fn new(base_url: &str) -> PollClient {
        PollClient {
            http: reqwest::blocking::Client::builder()
                .timeout(POLL_TIMEOUT)
                .build()
                .expect("poll HTTP client construction failure"),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, PollError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).send().map_err(PollError::Http)?;
        if !response.status().is_success() {
            return Err(PollError::Status(response.status().as_u16()));
        }
        let bytes = response.bytes().map_err(PollError::Http)?;
        serde_json::from_slice(&bytes).map_err(PollError::Decode)
    }

    /// Current status of every device.
    pub fn fetch_status(&self) -> Result<StatusSnapshot, PollError> {
        self.get_json("/api/status")
    }

    /// Messages, optionally only those after the given id.
    pub fn fetch_messages(&self, since: Option<u64>) -> Result<Vec<Message>, PollError> {
        match since {
            Some(id) => self.get_json(&format!("/api/messages?since={}", id)),
            None => self.get_json("/api/messages"),
        }
        .map(|response: MessagesResponse| response.messages)
    }

    /// Send one operator command, reusing this client's connection
    /// settings. See `client::send_command`.
    pub fn send_command(&self, cmd: &str) -> Result<(), super::client::SendCommandError> {
        super::client::send_command(&self.http, &self.base_url, cmd)
    }

    /// One full poll cycle: fetch messages from the log's cursor
    /// onward and the latest snapshot, and fold both into the given
    /// state holders.
    pub fn refresh(
        &self,
        log: &mut MessageLog,
        status: &mut StatusAggregator,
    ) -> Result<(), PollError> {
        let since = match log.last_seen_id() {
            0 => None,
            id => Some(id),
        };
        let messages = self.fetch_messages(since)?;
        log.append(&messages);
        status.apply(&self.fetch_status()?);
        Ok(())
    }
}

//! Message log
//!
//! Append-only, size-bounded window of displayable log lines. The log
//! keeps a monotonic high-water mark of the largest message id seen,
//! used as a resume cursor for snapshot requests. The cursor does not
//! filter appends: a line is stored for every message handed in,
//! whether or not its id was already seen.

use std::collections::VecDeque;

use crate::feed::payload::Message;

/// Number of lines retained when no explicit bound is given.
pub const DEFAULT_MAX_LINES: usize = 400;

/// Format one message as a display line.
pub fn format_line(msg: &Message) -> String {
    match &msg.device {
        Some(device) => format!("[{}] [{}] {}", device, msg.src, msg.text),
        None => format!("[{}] {}", msg.src, msg.text),
    }
}

/// Bounded accumulator of log lines, oldest evicted first.
pub struct MessageLog {
    last_seen_id: u64,
    lines: VecDeque<String>,
    max_lines: usize,
}

impl MessageLog {
    pub fn new() -> MessageLog {
        MessageLog::with_max_lines(DEFAULT_MAX_LINES)
    }

    pub fn with_max_lines(max_lines: usize) -> MessageLog {
        MessageLog {
            last_seen_id: 0,
            lines: VecDeque::new(),
            max_lines,
        }
    }

    /// Append a batch of messages in order, then trim the window from
    /// the front down to the line bound. Messages carrying an id move
    /// the high-water mark; messages without one are stored all the
    /// same.
    pub fn append(&mut self, messages: &[Message]) {
        for msg in messages {
            if let Some(id) = msg.id {
                self.last_seen_id = self.last_seen_id.max(id);
            }
            self.lines.push_back(format_line(msg));
        }
        while self.lines.len() > self.max_lines {
            self.lines.pop_front();
        }
    }

    /// All stored lines joined with newlines, oldest to newest.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for (n, line) in self.lines.iter().enumerate() {
            if n > 0 {
                out.push('\n');
            }
            out.push_str(line);
        }
        out
    }

    /// Stored lines in order, oldest first.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    /// The most recent `count` lines, oldest of those first.
    pub fn tail(&self, count: usize) -> Vec<String> {
        let skip = self.lines.len().saturating_sub(count);
        self.lines.iter().skip(skip).cloned().collect()
    }

    /// Largest message id observed so far (0 before any id was seen).
    pub fn last_seen_id(&self) -> u64 {
        self.last_seen_id
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl Default for MessageLog {
    fn default() -> MessageLog {
        MessageLog::new()
    }
}

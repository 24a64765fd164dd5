use std::sync::{Arc, Mutex};
use std::time::Duration;

use crossbeam::{channel, select};

use super::client::{DashboardState, Event, FeedConfig};
use super::payload::Payload;
use super::route::route_payload;
use super::stream::{self, RecvError, StreamPort};
use crate::view::format_line;

/// Control messages from the `Interface` to the core.
pub(super) enum Control {
    Shutdown,
}

/// What one pass of the main loop decided to do.
enum Step {
    Shutdown,
    Data(String),
    StreamDown(RecvError),
    Connect,
}

pub(super) struct SyncCore {
    stream_url: String,
    reconnect_delay: Duration,
    ctl: channel::Receiver<Control>,
    state: Arc<Mutex<DashboardState>>,
    status_queue: Option<channel::Sender<Event>>,
    http: reqwest::blocking::Client,
}

impl SyncCore {
    pub(super) fn new(
        config: &FeedConfig,
        ctl: channel::Receiver<Control>,
        state: Arc<Mutex<DashboardState>>,
        status_queue: Option<channel::Sender<Event>>,
    ) -> SyncCore {
        SyncCore {
            stream_url: format!("{}/api/stream", config.base_url.trim_end_matches('/')),
            reconnect_delay: config.reconnect_delay,
            ctl,
            state,
            status_queue,
            http: stream::stream_http_client(config.connect_timeout),
        }
    }

    fn emit(&self, event: Event) {
        if let Some(queue) = &self.status_queue {
            // Best effort: a full queue drops the event rather than
            // stalling the engine.
            let _ = queue.try_send(event);
        }
    }

    /// Fold one event's data text into the dashboard state. Parse
    /// failures discard the single event and nothing else.
    fn process_event(&self, data: &str) {
        if data.trim().is_empty() {
            return;
        }
        let payload = match Payload::from_json(data) {
            Ok(payload) => payload,
            Err(err) => {
                self.emit(Event::PayloadError(err));
                return;
            }
        };
        if self.status_queue.is_some() {
            if let Payload::Messages { messages, .. } = &payload {
                for msg in messages {
                    self.emit(Event::Message(format_line(msg)));
                }
            }
        }
        let had_status = matches!(
            &payload,
            Payload::Status(_) | Payload::Messages { status: Some(_), .. }
        );
        let view = {
            let mut guard = self.state.lock().unwrap();
            let state = &mut *guard;
            route_payload(payload, &mut state.log, &mut state.status);
            state.status.view()
        };
        if had_status {
            self.emit(Event::Status(view));
        }
    }

    /// Main loop. At most one stream connection exists at a time:
    /// `port` is dropped before a retry is armed, and the reader has
    /// already closed the response by the time it reports down.
    pub(super) fn run(&mut self) {
        let mut port: Option<StreamPort> = None;
        // Drive the first connection attempt immediately.
        let mut retry = channel::after(Duration::from_millis(0));
        loop {
            let step = if let Some(active) = &port {
                select! {
                    recv(self.ctl) -> msg => match msg {
                        Ok(Control::Shutdown) | Err(_) => Step::Shutdown,
                    },
                    recv(active.receiver()) -> res => match res {
                        Ok(Ok(data)) => Step::Data(data),
                        Ok(Err(err)) => Step::StreamDown(err),
                        Err(_) => Step::StreamDown(RecvError::Disconnected),
                    },
                }
            } else {
                select! {
                    recv(self.ctl) -> msg => match msg {
                        Ok(Control::Shutdown) | Err(_) => Step::Shutdown,
                    },
                    recv(retry) -> _ => Step::Connect,
                }
            };
            match step {
                Step::Shutdown => break,
                Step::Data(data) => self.process_event(&data),
                Step::StreamDown(err) => {
                    port = None;
                    self.emit(Event::Disconnected(err));
                    retry = channel::after(self.reconnect_delay);
                }
                Step::Connect => {
                    self.emit(Event::Connecting);
                    match StreamPort::connect(&self.http, &self.stream_url) {
                        Ok(connected) => {
                            port = Some(connected);
                            self.emit(Event::Connected);
                        }
                        Err(err) => {
                            self.emit(Event::ConnectFailed(err));
                            retry = channel::after(self.reconnect_delay);
                        }
                    }
                }
            }
        }
        self.emit(Event::Exiting);
    }
}

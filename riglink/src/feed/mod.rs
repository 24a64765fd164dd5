pub mod client;
pub mod payload;
pub mod poll;
pub mod route;
pub mod stream;

mod client_core;
#[cfg(test)]
mod testsrv;

pub use client::{Event, FeedConfig, Interface, SendCommandError};
pub use payload::{DeviceStatus, Message, Payload, StatusSnapshot};
pub use poll::{PollClient, PollError};
pub use stream::{ConnectError, RecvError};

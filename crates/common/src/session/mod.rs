//! Sender and receiver sessions
//!
//! Both sessions are plain state machines. They never block and never touch
//! the filesystem themselves: each transition returns at most one [`Task`],
//! which the caller hands to a [`Dispatcher`]. The task's [`TaskEvent`] is fed
//! back in as the next input. Since a session only ever has one task in
//! flight, events are applied one at a time and in order.

mod jobs;
pub mod receive;
pub mod send;

pub use jobs::{Dispatcher, EventReceiver, Task, TaskEvent, TaskFailure};
pub use receive::{ReceiveInput, ReceiveOptions, ReceiveSession, ReceiveStep};
pub use send::{SendInput, SendSession, SendStep};

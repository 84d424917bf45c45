//! This crate completes CalDAV to-do items (iCal `VTODO`s).
//!
//! Completing a task that is not recurring marks it as completed. \
//! Completing a recurring task moves it to its next occurrence (see [`recurrence`] for how it is chosen),
//! and stores a completed copy of the occurrence that has been done, so that the history is kept.
//!
//! iCal files are edited line by line (see the [`ical`] module): every line that is not touched by a completion
//! is written back byte-for-byte, so that properties this crate does not know about are never lost.
//!
//! The engine itself is the [`Completer`](completer::Completer). It reads and writes items through a [`TaskStore`](traits::TaskStore),
//! which can be a CalDAV server (see the [`client`] module) or a local [`cache`].

pub mod traits;
pub mod error;
pub use error::CompletionError;

mod item;
pub use item::{generate_uid, ItemId};
pub mod ical;
pub mod clock;
pub mod recurrence;
pub mod completer;
pub use completer::{Completer, Completion, RecurrenceDecision};

pub mod client;
pub mod cache;
pub mod config;
pub use config::Settings;

pub mod mock_behaviour;

//! timew-sync - a live, subscribable view of Timewarrior.
//!
//! The [`application::SyncEngine`] polls the tool, publishes changes and
//! serializes timer commands against it. UI and IPC front-ends embed the
//! engine through this crate; the `timew-sync` binary is one such front-end.

pub mod application;
pub mod domain;
pub mod infrastructure;

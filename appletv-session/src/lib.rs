//! Session orchestration for Apple TV and HomePod accessories
//!
//! A [`SessionOrchestrator`] takes a paired device identity and brings up
//! the channels its [`ChannelAdapter`] names, in a fixed order: resolve
//! endpoints, open and pair-verify each channel, enable encryption, run the
//! remote/input bring-up, then the realtime control handshake.
//!
//! The resulting [`Session`] owns the channels, their event streams and a
//! keepalive task. When an event stream ends the owner calls
//! [`SessionOrchestrator::reconnect`], which retries from scratch once per
//! `reconnect_delay` until it succeeds or is cancelled.

pub mod adapter;
pub mod config;
pub mod error;
pub mod keepalive;
pub mod orchestrator;
pub mod session;

pub use adapter::ChannelAdapter;
pub use config::SessionConfig;
pub use error::{ConnectStage, Result, SessionError};
pub use keepalive::KeepaliveTask;
pub use orchestrator::SessionOrchestrator;
pub use session::{Session, SessionEvent};

//! Router/Client: mTLS `tonic` channel management and Swamp-name routing
//! across a fleet of servers partitioned by island range (`spec.md` §4.7).
//!
//! This crate does not generate or depend on service-stub code from a
//! `.proto` file; it implements only the channel-management and routing
//! layer, with heartbeat checks left to the caller via [`HeartbeatProbe`].

pub mod backoff;
mod client;
pub mod error;
mod server;

pub use backoff::{retry_with_backoff, BackoffPolicy};
pub use client::{Client, HeartbeatProbe, NoopProbe};
pub use error::{Error, Result};
pub use server::{validate_ranges, Server};

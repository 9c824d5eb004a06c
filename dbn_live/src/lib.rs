//!
//! Blocking client for the Databento live subscription gateway.
//!
//! This crate aggregates:
//! - `auth` — API key checks and the challenge-response reply.
//! - `gateway` — control-line messages of the handshake.
//! - `client` — `LiveClient`, its `LiveConfig` and the session state machine.
//! - `relay` — copies a whole session to a byte sink and always stops it.
//!
//! Once started, records are read through `dbn_common::DbnScanner`, or
//! `dbn_common::JsonScanner` for `json` sessions.
#![warn(missing_docs)]
pub mod auth;
pub mod gateway;
pub mod client;
pub mod relay;

pub use client::{LiveClient, LiveConfig, SessionState, StopHandle};
pub use gateway::SubscriptionRequest;

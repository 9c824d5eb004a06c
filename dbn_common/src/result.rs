//! Result type alias shared across the workspace.
//!
//! Defaults the error type to `DbnError`, so functions can simply return
//! `Result<T>`.
use crate::error::DbnError;

/// Workspace-wide `Result` alias with `DbnError` as the default error.
pub type Result<T, E = DbnError> = std::result::Result<T, E>;

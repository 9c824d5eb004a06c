//! Error types shared by the codec, the scanner and the live client.
//!
//! The `DbnError` enum unifies every failure the workspace can surface so that
//! crates propagate a single error type. `ErrorClass` groups the variants into
//! the categories callers react to: framing, format, protocol, transport and
//! local misuse.
use std::io;

use strum_macros::Display;
use thiserror::Error;

/// Unified error type shared by the codec, scanner and live client.
#[derive(Error, Debug)]
pub enum DbnError {
    /// I/O error originating from the standard library or sockets/files.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Socket failure during a named phase of the live session.
    #[error("Transport error while {phase}: {source}")]
    Transport {
        /// What the client was doing when the socket failed.
        phase: &'static str,
        /// Underlying socket error.
        #[source]
        source: io::Error,
    },

    /// Not enough bytes for a declared section.
    #[error("Truncated {context} at offset {offset}: expected {expected} bytes, got {got}")]
    Truncated {
        /// Section being read.
        context: &'static str,
        /// Offset where the read started.
        offset: usize,
        /// Bytes the section requires.
        expected: usize,
        /// Bytes that were available.
        got: usize,
    },

    /// A record's declared length disagrees with the layout of its type.
    #[error("Record length mismatch for rtype {rtype:#04x}: expected {expected} bytes, got {got}")]
    RecordLength {
        /// Record type tag.
        rtype: u8,
        /// Size required by the layout.
        expected: usize,
        /// Size declared by the header or supplied by the caller.
        got: usize,
    },

    /// A header's length field cannot even cover the header itself.
    #[error("Record length of {length} words is shorter than a record header")]
    RecordTooShort {
        /// Length field in 32-bit words.
        length: u8,
    },

    /// The metadata frame does not start with `DBN`.
    #[error("Invalid DBN magic: {0:?}")]
    InvalidMagic([u8; 3]),

    /// Metadata version byte is not one this crate decodes.
    #[error("Unsupported DBN version: {0}")]
    UnsupportedVersion(u8),

    /// The metadata declares a symbol width that does not match its version.
    #[error("Unexpected symbol width {got} for DBN version {version}, expected {expected}")]
    UnexpectedSymbolWidth {
        /// Metadata version.
        version: u8,
        /// Width required by the version.
        expected: usize,
        /// Width found on the wire.
        got: usize,
    },

    /// A fixed-width string has non-padding bytes after its first NUL.
    #[error("Invalid C string in {field} at offset {offset}: non-NUL byte after terminator")]
    InvalidCString {
        /// Field being decoded.
        field: &'static str,
        /// Offset of the offending byte.
        offset: usize,
    },

    /// A fixed-width string is not valid UTF-8.
    #[error("Invalid UTF-8 in {field} at offset {offset}")]
    InvalidUtf8 {
        /// Field being decoded.
        field: &'static str,
        /// Offset where the string starts.
        offset: usize,
    },

    /// An enumerated field carries a value with no known meaning.
    #[error("Unknown {field} value {value} at offset {offset}")]
    UnknownValue {
        /// Field being decoded.
        field: &'static str,
        /// Raw value found.
        value: u64,
        /// Offset of the field.
        offset: usize,
    },

    /// A string does not fit its fixed-width field on encode.
    #[error("Value for {field} is {len} bytes, must be shorter than {width}")]
    StringTooLong {
        /// Field being encoded.
        field: &'static str,
        /// Length of the value.
        len: usize,
        /// Width of the field, including the terminator.
        width: usize,
    },

    /// A price string is neither a raw integer nor a decimal with at most nine
    /// fractional digits, or it overflows the raw range.
    #[error("Invalid fixed-point price: {0:?}")]
    InvalidPrice(String),

    /// A JSON record line exceeds the scanner's line limit.
    #[error("JSON line {line} exceeds {limit} bytes")]
    LineTooLong {
        /// 1-based line number.
        line: u64,
        /// Maximum accepted line length.
        limit: usize,
    },

    /// Malformed or unexpected control message from the gateway.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Gateway rejected the authentication request. Carries the server text verbatim.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Subscription without symbols. Rejected before anything is written.
    #[error("Subscription request must contain at least one symbol")]
    EmptySubscription,

    /// Operation called in a session state that does not allow it.
    #[error("Cannot {operation} while session is {state}")]
    InvalidState {
        /// Operation that was attempted.
        operation: &'static str,
        /// State the session was in.
        state: String,
    },

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The scanner already returned an error and cannot continue.
    #[error("Scanner is unusable after a previous error")]
    ScannerFailed,

    /// Symbol map could not be built from the supplied metadata.
    #[error("Symbol map error: {0}")]
    SymbolMap(String),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJson(#[from] serde_json::Error),
}

/// Category of a `DbnError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ErrorClass {
    /// Truncated or inconsistent length fields.
    Framing,
    /// Unknown versions, malformed strings, unknown enum values.
    Format,
    /// Handshake or authentication failures.
    Protocol,
    /// Socket or file I/O failures.
    Transport,
    /// Local misuse: bad configuration, wrong state, oversize values.
    Usage,
}

impl DbnError {
    /// Returns the category this error belongs to.
    pub fn class(&self) -> ErrorClass {
        match self {
            DbnError::Io(_) | DbnError::Transport { .. } => ErrorClass::Transport,
            DbnError::Truncated { .. }
            | DbnError::RecordLength { .. }
            | DbnError::RecordTooShort { .. }
            | DbnError::LineTooLong { .. } => ErrorClass::Framing,
            DbnError::InvalidMagic(_)
            | DbnError::UnsupportedVersion(_)
            | DbnError::UnexpectedSymbolWidth { .. }
            | DbnError::InvalidCString { .. }
            | DbnError::InvalidUtf8 { .. }
            | DbnError::UnknownValue { .. }
            | DbnError::InvalidPrice(_) => ErrorClass::Format,
            DbnError::Protocol(_) | DbnError::Authentication(_) => ErrorClass::Protocol,
            DbnError::StringTooLong { .. }
            | DbnError::EmptySubscription
            | DbnError::InvalidState { .. }
            | DbnError::Config(_)
            | DbnError::ScannerFailed
            | DbnError::SymbolMap(_) => ErrorClass::Usage,
            DbnError::SerdeJson(e) => match e.classify() {
                serde_json::error::Category::Io => ErrorClass::Transport,
                serde_json::error::Category::Eof => ErrorClass::Framing,
                serde_json::error::Category::Syntax | serde_json::error::Category::Data => {
                    ErrorClass::Format
                }
            },
        }
    }

    /// Wraps a socket error with the session phase it happened in.
    pub fn transport(phase: &'static str, source: io::Error) -> Self {
        DbnError::Transport { phase, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classes_follow_taxonomy() {
        let truncated = DbnError::Truncated {
            context: "record header",
            offset: 0,
            expected: 16,
            got: 3,
        };
        assert_eq!(truncated.class(), ErrorClass::Framing);
        assert_eq!(DbnError::UnsupportedVersion(9).class(), ErrorClass::Format);
        assert_eq!(
            DbnError::Authentication("bad key".into()).class(),
            ErrorClass::Protocol
        );
        let io = io::Error::new(io::ErrorKind::BrokenPipe, "closed");
        assert_eq!(
            DbnError::transport("sending start", io).class(),
            ErrorClass::Transport
        );
        assert_eq!(DbnError::EmptySubscription.class(), ErrorClass::Usage);
    }

    #[test]
    fn json_errors_are_classed_by_category() {
        let syntax = serde_json::from_str::<serde_json::Value>("{\"hd\":}").unwrap_err();
        assert_eq!(DbnError::from(syntax).class(), ErrorClass::Format);
        let eof = serde_json::from_str::<serde_json::Value>("{\"hd\":{").unwrap_err();
        assert_eq!(DbnError::from(eof).class(), ErrorClass::Framing);
        let data = serde_json::from_str::<u8>("300").unwrap_err();
        assert_eq!(DbnError::from(data).class(), ErrorClass::Format);
        assert_eq!(
            DbnError::LineTooLong { line: 3, limit: 64 }.class(),
            ErrorClass::Framing
        );
    }

    #[test]
    fn transport_message_names_phase() {
        let io = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        let err = DbnError::transport("reading greeting", io);
        assert_eq!(err.to_string(), "Transport error while reading greeting: reset");
    }
}

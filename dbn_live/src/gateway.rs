//! Line-oriented control messages exchanged with the live gateway before
//! the session switches to binary DBN.
//!
//! Every message is one `\n`-terminated line of `key=value` pairs joined by
//! `|`. Pairs without `=` are ignored.
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use dbn_common::enums::Encoding;
use dbn_common::timestamp::datetime_to_ts;
use dbn_common::{DbnError, Result, SType, Schema};
use serde::Serialize;

/// Longest control line accepted from the gateway, terminator included.
pub const MAX_LINE_LENGTH: usize = 24 * 1024;

/// Splits a control line into its key/value pairs, in wire order.
pub fn parse_control_message(line: &str) -> Vec<(&str, &str)> {
    let line = line.strip_suffix('\n').unwrap_or(line);
    let line = line.strip_suffix('\r').unwrap_or(line);
    line.split('|')
        .filter_map(|pair| pair.split_once('='))
        .collect()
}

fn lookup<'a>(fields: &[(&'a str, &'a str)], key: &str) -> Option<&'a str> {
    fields
        .iter()
        .rev()
        .find(|(k, _)| *k == key)
        .map(|(_, v)| *v)
}

fn require<'a>(fields: &[(&'a str, &'a str)], key: &str, message: &str) -> Result<&'a str> {
    lookup(fields, key).ok_or_else(|| {
        DbnError::Protocol(format!("{} is missing required key '{}'", message, key))
    })
}

/// Gateway version announcement, the first line of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    /// Gateway software version.
    pub lsg_version: String,
}

impl Greeting {
    /// Parses `lsg_version=<v>`.
    pub fn parse(line: &str) -> Result<Self> {
        let fields = parse_control_message(line);
        Ok(Greeting {
            lsg_version: require(&fields, "lsg_version", "greeting")?.to_string(),
        })
    }
}

/// Authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeRequest {
    /// Challenge token to hash with the API key.
    pub cram: String,
}

impl ChallengeRequest {
    /// Parses `cram=<token>`.
    pub fn parse(line: &str) -> Result<Self> {
        let fields = parse_control_message(line);
        Ok(ChallengeRequest {
            cram: require(&fields, "cram", "challenge")?.to_string(),
        })
    }
}

/// Gateway verdict on an authentication request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationResponse {
    /// Whether authentication succeeded.
    pub success: bool,
    /// Session identifier, present on success.
    pub session_id: Option<String>,
    /// Error text, present on failure.
    pub error: Option<String>,
}

impl AuthenticationResponse {
    /// Parses `success=0|1[|session_id=<id>][|error=<text>]`.
    ///
    /// `1`/`true` and `0`/`false` are accepted for `success`; anything else
    /// is a protocol error.
    pub fn parse(line: &str) -> Result<Self> {
        let fields = parse_control_message(line);
        let success = match require(&fields, "success", "authentication response")? {
            "1" | "true" => true,
            "0" | "false" => false,
            other => {
                return Err(DbnError::Protocol(format!(
                    "authentication response has invalid success flag '{}'",
                    other
                )));
            }
        };
        Ok(AuthenticationResponse {
            success,
            session_id: lookup(&fields, "session_id").map(str::to_string),
            error: lookup(&fields, "error").map(str::to_string),
        })
    }

    /// Session ID on success, the gateway's error text as an
    /// `Authentication` error otherwise.
    pub fn into_session_id(self) -> Result<String> {
        if self.success {
            Ok(self.session_id.unwrap_or_default())
        } else {
            Err(DbnError::Authentication(
                self.error
                    .unwrap_or_else(|| "gateway gave no reason".to_string()),
            ))
        }
    }
}

/// Client reply to the challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticationRequest {
    /// CRAM reply, see `auth::cram_reply`.
    pub auth: String,
    /// Dataset to stream.
    pub dataset: String,
    /// Requested encoding.
    pub encoding: Encoding,
    /// Whether records should carry the gateway send timestamp.
    pub ts_out: bool,
    /// Client identification.
    pub client: String,
}

impl AuthenticationRequest {
    /// Wire form, terminator included.
    pub fn encode(&self) -> String {
        format!(
            "auth={}|dataset={}|encoding={}|ts_out={}|client={}\n",
            self.auth,
            self.dataset,
            self.encoding,
            self.ts_out as u8,
            self.client
        )
    }
}

/// One subscription. A session can carry several; none can be removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionRequest {
    /// Schema to receive.
    pub schema: Schema,
    /// Symbology of `symbols`.
    pub stype_in: SType,
    /// Symbols to subscribe to. Must not be empty.
    pub symbols: Vec<String>,
    /// Replay start in UNIX nanoseconds. `None` streams from now.
    pub start: Option<u64>,
    /// Request a book snapshot first.
    pub snapshot: bool,
}

impl SubscriptionRequest {
    /// Live subscription without replay or snapshot.
    pub fn new<S: Into<String>>(
        schema: Schema,
        stype_in: SType,
        symbols: impl IntoIterator<Item = S>,
    ) -> Self {
        SubscriptionRequest {
            schema,
            stype_in,
            symbols: symbols.into_iter().map(Into::into).collect(),
            start: None,
            snapshot: false,
        }
    }

    /// Sets the replay start.
    pub fn with_start(mut self, start: &DateTime<Utc>) -> Self {
        self.start = Some(datetime_to_ts(start));
        self
    }

    /// Requests a snapshot.
    pub fn with_snapshot(mut self, snapshot: bool) -> Self {
        self.snapshot = snapshot;
        self
    }

    /// Wire form, terminator included. Fails on an empty symbol list.
    pub fn encode(&self) -> Result<String> {
        if self.symbols.is_empty() {
            return Err(DbnError::EmptySubscription);
        }
        let mut line = format!("schema={}|stype_in={}", self.schema, self.stype_in);
        if let Some(start) = self.start {
            let _ = write!(line, "|time={}", start);
        }
        if self.snapshot {
            line.push_str("|snapshot=1");
        }
        line.push_str("|symbols=");
        line.push_str(&self.symbols.join(","));
        line.push('\n');
        Ok(line)
    }
}

/// Request to start streaming all subscriptions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStart;

impl SessionStart {
    /// Wire form, terminator included.
    pub fn encode(&self) -> &'static str {
        "start_session=\n"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_skips_junk() {
        let fields = parse_control_message("success=1|garbage|session_id=5|x=a=b\n");
        assert_eq!(
            fields,
            vec![("success", "1"), ("session_id", "5"), ("x", "a=b")]
        );
    }

    #[test]
    fn greeting_and_challenge() {
        assert_eq!(
            Greeting::parse("lsg_version=0.4.2\n").unwrap().lsg_version,
            "0.4.2"
        );
        assert_eq!(ChallengeRequest::parse("cram=abc123\n").unwrap().cram, "abc123");
        assert!(matches!(
            ChallengeRequest::parse("lsg_version=1\n"),
            Err(DbnError::Protocol(_))
        ));
    }

    #[test]
    fn authentication_response_flags() {
        let ok = AuthenticationResponse::parse("success=1|session_id=1700000000\n").unwrap();
        assert_eq!(ok.into_session_id().unwrap(), "1700000000");

        let ok = AuthenticationResponse::parse("success=true|session_id=7\n").unwrap();
        assert!(ok.success);

        let denied = AuthenticationResponse::parse("success=0|error=Unknown API key.\n").unwrap();
        assert!(!denied.success);
        match denied.into_session_id() {
            Err(DbnError::Authentication(text)) => assert_eq!(text, "Unknown API key."),
            other => panic!("expected authentication error, got {:?}", other),
        }
        assert!(!AuthenticationResponse::parse("success=false\n").unwrap().success);
        assert!(matches!(
            AuthenticationResponse::parse("success=maybe\n"),
            Err(DbnError::Protocol(_))
        ));
        assert!(AuthenticationResponse::parse("session_id=1\n").is_err());
    }

    #[test]
    fn encodes_requests() {
        let auth = AuthenticationRequest {
            auth: "abc-mNUM6".to_string(),
            dataset: "GLBX.MDP3".to_string(),
            encoding: Encoding::Dbn,
            ts_out: true,
            client: "Rust dbn_live 0.1.0".to_string(),
        };
        assert_eq!(
            auth.encode(),
            "auth=abc-mNUM6|dataset=GLBX.MDP3|encoding=dbn|ts_out=1|client=Rust dbn_live 0.1.0\n"
        );

        let sub = SubscriptionRequest::new(Schema::Mbp1, SType::RawSymbol, ["ESH4", "NQH4"]);
        assert_eq!(
            sub.encode().unwrap(),
            "schema=mbp-1|stype_in=raw_symbol|symbols=ESH4,NQH4\n"
        );
        let start = DateTime::from_timestamp(1_704_067_200, 0).unwrap();
        let sub = sub.with_start(&start).with_snapshot(true);
        assert_eq!(
            sub.encode().unwrap(),
            "schema=mbp-1|stype_in=raw_symbol|time=1704067200000000000|snapshot=1|symbols=ESH4,NQH4\n"
        );
        assert_eq!(SessionStart.encode(), "start_session=\n");
    }

    #[test]
    fn empty_subscription_is_rejected() {
        let sub = SubscriptionRequest::new(Schema::Trades, SType::Parent, Vec::<String>::new());
        assert!(matches!(sub.encode(), Err(DbnError::EmptySubscription)));
    }
}

//! Blocking client for one live gateway session.
//!
//! The session runs as a strict sequence over a single TCP connection:
//! greeting, challenge, authentication, any number of subscriptions, session
//! start, then records until the connection closes: a metadata frame and
//! binary DBN, or JSON lines when the session asked for `json`. Each method
//! checks the current `SessionState` before touching the socket. Transport,
//! protocol and framing errors move the session to `Failed`; a failed or
//! stopped client cannot be reused.
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use dbn_common::enums::Encoding;
use dbn_common::net::{LIVE_API_PORT, gateway_host};
use dbn_common::scanner::READ_BUFFER_SIZE;
use dbn_common::{
    DbnError, DbnScanner, DbnVersion, ErrorClass, JsonScanner, Metadata, Record, RecordCodec,
    Result,
};
use log::{debug, info, warn};
use strum_macros::Display;

use crate::auth::{cram_reply, validate_api_key};
use crate::gateway::{
    AuthenticationRequest, AuthenticationResponse, ChallengeRequest, Greeting, MAX_LINE_LENGTH,
    SessionStart, SubscriptionRequest,
};

/// Client identification sent during authentication unless overridden.
pub fn default_client_name() -> String {
    format!("Rust dbn_live {}", env!("CARGO_PKG_VERSION"))
}

/// Settings for one live session. Nothing here is read from the environment.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// 32-character API key.
    pub api_key: String,
    /// Dataset code, e.g. `GLBX.MDP3`.
    pub dataset: String,
    /// Client identification string.
    pub client: String,
    /// Wire encoding, `dbn` or `json`.
    pub encoding: Encoding,
    /// Ask the gateway to append its send timestamp to every record.
    pub send_ts_out: bool,
    /// Gateway host override. Derived from `dataset` when `None`.
    pub gateway: Option<String>,
    /// Gateway port.
    pub port: u16,
    /// Upper bound on the TCP connect. Reads are never timed out.
    pub connect_timeout: Option<Duration>,
}

impl LiveConfig {
    /// Configuration with defaults for everything but the key and dataset.
    pub fn new(api_key: impl Into<String>, dataset: impl Into<String>) -> Self {
        LiveConfig {
            api_key: api_key.into(),
            dataset: dataset.into(),
            client: default_client_name(),
            encoding: Encoding::Dbn,
            send_ts_out: false,
            gateway: None,
            port: LIVE_API_PORT,
            connect_timeout: None,
        }
    }

    /// Checks the dataset, key and encoding.
    pub fn validate(&self) -> Result<()> {
        if self.dataset.trim().is_empty() {
            return Err(DbnError::Config("dataset is unset".to_string()));
        }
        validate_api_key(&self.api_key)?;
        if !matches!(self.encoding, Encoding::Dbn | Encoding::Json) {
            return Err(DbnError::Config(format!(
                "encoding '{}' is not supported, only 'dbn' or 'json'",
                self.encoding
            )));
        }
        Ok(())
    }

    /// Host the session connects to.
    pub fn gateway_host(&self) -> String {
        self.gateway
            .clone()
            .unwrap_or_else(|| gateway_host(&self.dataset))
    }
}

/// Position of a session in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum SessionState {
    /// Socket open, nothing exchanged yet.
    Connected,
    /// Waiting for the version line.
    AwaitingGreeting,
    /// Waiting for the challenge line.
    AwaitingChallenge,
    /// Authentication request sent, waiting for the verdict.
    Authenticating,
    /// Authenticated, no subscription sent yet.
    Authenticated,
    /// At least one subscription sent.
    Subscribing,
    /// Session start sent, metadata not read yet.
    Started,
    /// Reading records.
    Streaming,
    /// Closed by the caller.
    Stopped,
    /// Closed by an error.
    Failed,
}

/// Shuts a session's socket down from another thread.
///
/// Blocking reads on the session fail or see end of stream afterwards.
#[derive(Debug, Clone)]
pub struct StopHandle {
    stream: Arc<TcpStream>,
}

impl StopHandle {
    /// Shuts both directions of the socket down.
    pub fn stop(&self) -> Result<()> {
        shutdown(&self.stream)
    }
}

fn shutdown(stream: &TcpStream) -> Result<()> {
    match stream.shutdown(Shutdown::Both) {
        Err(e) if e.kind() != io::ErrorKind::NotConnected => {
            Err(DbnError::transport("closing connection", e))
        }
        _ => Ok(()),
    }
}

/// Maps plain I/O errors coming out of the scanner to transport errors.
fn in_phase(phase: &'static str) -> impl Fn(DbnError) -> DbnError {
    move |e| match e {
        DbnError::Io(source) => DbnError::transport(phase, source),
        other => other,
    }
}

/// Reader of the data phase, by encoding.
enum DataPhase {
    Dbn(DbnScanner<TcpStream>),
    Json(JsonScanner<TcpStream>),
}

/// Live session over one TCP connection.
pub struct LiveClient {
    config: LiveConfig,
    gateway: String,
    port: u16,
    stream: TcpStream,
    reader: Option<BufReader<TcpStream>>,
    data: Option<DataPhase>,
    metadata: Option<Metadata>,
    state: SessionState,
    lsg_version: Option<String>,
    session_id: Option<String>,
    subscriptions: Vec<SubscriptionRequest>,
}

impl LiveClient {
    /// Validates `config` and opens the connection to the gateway.
    pub fn connect(config: LiveConfig) -> Result<Self> {
        config.validate()?;
        let gateway = config.gateway_host();
        let port = config.port;
        info!("Connecting to {}:{} for {}", gateway, port, config.dataset);

        let stream = open_stream(&gateway, port, config.connect_timeout)?;
        let reader = stream
            .try_clone()
            .map_err(|e| DbnError::transport("connecting", e))?;
        let mut client = LiveClient {
            config,
            gateway,
            port,
            stream,
            reader: Some(BufReader::with_capacity(READ_BUFFER_SIZE, reader)),
            data: None,
            metadata: None,
            state: SessionState::Connected,
            lsg_version: None,
            session_id: None,
            subscriptions: Vec::new(),
        };
        client.state = SessionState::AwaitingGreeting;
        Ok(client)
    }

    /// Reads the greeting and the challenge, answers it and reads the verdict.
    ///
    /// Returns the session ID. A rejection carries the gateway's error text.
    pub fn authenticate(&mut self) -> Result<String> {
        self.expect_state("authenticate", &[SessionState::AwaitingGreeting])?;
        let result = self.run_authentication();
        self.guard(result)
    }

    /// Sends one subscription. May be called repeatedly before `start`.
    ///
    /// An empty symbol list is rejected before anything is written.
    pub fn subscribe(&mut self, subscription: &SubscriptionRequest) -> Result<()> {
        self.expect_state(
            "subscribe",
            &[SessionState::Authenticated, SessionState::Subscribing],
        )?;
        let line = subscription.encode()?;
        let result = self.send_line(&line, "sending subscription");
        self.guard(result)?;
        info!(
            "Subscribed to {} {} ({} symbols, start {:?}, snapshot {})",
            subscription.schema,
            subscription.stype_in,
            subscription.symbols.len(),
            subscription.start,
            subscription.snapshot
        );
        self.subscriptions.push(subscription.clone());
        self.state = SessionState::Subscribing;
        Ok(())
    }

    /// Starts the session.
    ///
    /// With `dbn` encoding the session metadata is read and returned. A `json`
    /// session has no metadata frame and returns `None`.
    pub fn start(&mut self) -> Result<Option<Metadata>> {
        self.expect_state("start", &[SessionState::Subscribing])?;
        let result = self.run_start();
        self.guard(result)
    }

    /// Next record of the stream, `Ok(None)` once the gateway closes it.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        let result = match self.streaming_data("next_record")? {
            DataPhase::Dbn(scanner) => scanner.next_record(),
            DataPhase::Json(scanner) => scanner.next_record(),
        }
        .map_err(in_phase("streaming records"));
        self.guard(result)
    }

    /// Advances to the next raw frame or JSON line without decoding it, for
    /// relaying through `scanner()` or `json_scanner()`.
    pub fn next_frame(&mut self) -> Result<bool> {
        let result = match self.streaming_data("next_frame")? {
            DataPhase::Dbn(scanner) => scanner.next_frame(),
            DataPhase::Json(scanner) => scanner.next_line(),
        }
        .map_err(in_phase("streaming records"));
        self.guard(result)
    }

    /// Binary scanner over the data phase of a started `dbn` session.
    pub fn scanner(&self) -> Option<&DbnScanner<TcpStream>> {
        match &self.data {
            Some(DataPhase::Dbn(scanner)) => Some(scanner),
            _ => None,
        }
    }

    /// Line scanner over the data phase of a started `json` session.
    pub fn json_scanner(&self) -> Option<&JsonScanner<TcpStream>> {
        match &self.data {
            Some(DataPhase::Json(scanner)) => Some(scanner),
            _ => None,
        }
    }

    /// Closes the connection. Idempotent; the client cannot be restarted.
    pub fn stop(&mut self) -> Result<()> {
        if self.state == SessionState::Stopped {
            return Ok(());
        }
        self.state = SessionState::Stopped;
        shutdown(&self.stream)?;
        info!("Session {} stopped", self.session_id.as_deref().unwrap_or("-"));
        Ok(())
    }

    /// Handle that can stop this session from another thread.
    pub fn stop_handle(&self) -> Result<StopHandle> {
        let stream = self
            .stream
            .try_clone()
            .map_err(|e| DbnError::transport("cloning socket", e))?;
        Ok(StopHandle {
            stream: Arc::new(stream),
        })
    }

    /// Session configuration.
    pub fn config(&self) -> &LiveConfig {
        &self.config
    }

    /// Gateway host.
    pub fn gateway(&self) -> &str {
        &self.gateway
    }

    /// Gateway port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Gateway version from the greeting.
    pub fn lsg_version(&self) -> Option<&str> {
        self.lsg_version.as_deref()
    }

    /// Session ID from the authentication response.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Current protocol state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Session metadata, once a `dbn` session has started.
    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    /// Subscriptions sent so far.
    pub fn subscriptions(&self) -> &[SubscriptionRequest] {
        &self.subscriptions
    }

    fn run_authentication(&mut self) -> Result<String> {
        let greeting = Greeting::parse(&self.read_line("reading greeting")?)?;
        info!("Gateway version {}", greeting.lsg_version);
        self.lsg_version = Some(greeting.lsg_version);
        self.state = SessionState::AwaitingChallenge;

        let challenge = ChallengeRequest::parse(&self.read_line("reading challenge")?)?;
        debug!("Received challenge");
        let request = AuthenticationRequest {
            auth: cram_reply(&challenge.cram, &self.config.api_key)?,
            dataset: self.config.dataset.clone(),
            encoding: self.config.encoding,
            ts_out: self.config.send_ts_out,
            client: self.config.client.clone(),
        };
        self.send_line(&request.encode(), "sending authentication request")?;
        self.state = SessionState::Authenticating;

        let response =
            AuthenticationResponse::parse(&self.read_line("reading authentication response")?)?;
        let session_id = response.into_session_id()?;
        info!("Authenticated, session {}", session_id);
        self.session_id = Some(session_id.clone());
        self.state = SessionState::Authenticated;
        Ok(session_id)
    }

    fn run_start(&mut self) -> Result<Option<Metadata>> {
        self.send_line(SessionStart.encode(), "sending session start")?;
        self.state = SessionState::Started;

        let reader = self.reader.take().ok_or_else(|| DbnError::InvalidState {
            operation: "start",
            state: self.state.to_string(),
        })?;
        if self.config.encoding == Encoding::Json {
            let codec = RecordCodec::new(DbnVersion::V2, self.config.send_ts_out);
            self.data = Some(DataPhase::Json(
                JsonScanner::from_buf_reader(reader).with_codec(codec),
            ));
            info!("Streaming {} as JSON lines", self.config.dataset);
            self.state = SessionState::Streaming;
            return Ok(None);
        }
        let mut scanner = DbnScanner::from_buf_reader(reader);
        let metadata = scanner
            .metadata()
            .map_err(in_phase("reading session metadata"))?
            .clone();
        info!(
            "Streaming {} (DBN v{}, ts_out {})",
            metadata.dataset,
            metadata.version.as_u8(),
            metadata.ts_out
        );
        self.data = Some(DataPhase::Dbn(scanner));
        self.metadata = Some(metadata.clone());
        self.state = SessionState::Streaming;
        Ok(Some(metadata))
    }

    fn read_line(&mut self, phase: &'static str) -> Result<String> {
        let reader = self.reader.as_mut().ok_or_else(|| DbnError::InvalidState {
            operation: phase,
            state: self.state.to_string(),
        })?;
        let mut line = String::new();
        let read = reader
            .by_ref()
            .take(MAX_LINE_LENGTH as u64)
            .read_line(&mut line)
            .map_err(|e| DbnError::transport(phase, e))?;
        if read == 0 {
            return Err(DbnError::transport(
                phase,
                io::Error::new(io::ErrorKind::UnexpectedEof, "gateway closed the connection"),
            ));
        }
        if !line.ends_with('\n') {
            return Err(DbnError::Protocol(format!(
                "control line longer than {} bytes while {}",
                MAX_LINE_LENGTH, phase
            )));
        }
        debug!("<- {}", line.trim_end());
        Ok(line)
    }

    fn send_line(&mut self, line: &str, phase: &'static str) -> Result<()> {
        self.stream
            .write_all(line.as_bytes())
            .and_then(|_| self.stream.flush())
            .map_err(|e| DbnError::transport(phase, e))
    }

    fn streaming_data(&mut self, operation: &'static str) -> Result<&mut DataPhase> {
        if self.state != SessionState::Streaming {
            return Err(DbnError::InvalidState {
                operation,
                state: self.state.to_string(),
            });
        }
        self.data.as_mut().ok_or_else(|| DbnError::InvalidState {
            operation,
            state: SessionState::Streaming.to_string(),
        })
    }

    fn expect_state(&self, operation: &'static str, allowed: &[SessionState]) -> Result<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(DbnError::InvalidState {
                operation,
                state: self.state.to_string(),
            })
        }
    }

    /// Fails the session on anything but local misuse.
    fn guard<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            if e.class() != ErrorClass::Usage && self.state != SessionState::Stopped {
                warn!("Session failed in state {}: {}", self.state, e);
                self.state = SessionState::Failed;
                let _ = self.stream.shutdown(Shutdown::Both);
            }
        }
        result
    }
}

impl Drop for LiveClient {
    fn drop(&mut self) {
        if !matches!(self.state, SessionState::Stopped | SessionState::Failed) {
            warn!(
                "LiveClient for {} dropped in state {} without stop()",
                self.config.dataset, self.state
            );
            let _ = self.stream.shutdown(Shutdown::Both);
        }
    }
}

fn open_stream(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream> {
    let phase = "connecting";
    let Some(timeout) = timeout else {
        return TcpStream::connect((host, port)).map_err(|e| DbnError::transport(phase, e));
    };
    let mut last_err = io::Error::new(io::ErrorKind::NotFound, "gateway resolved to no address");
    for addr in (host, port)
        .to_socket_addrs()
        .map_err(|e| DbnError::transport(phase, e))?
    {
        match TcpStream::connect_timeout(&addr, timeout) {
            Ok(stream) => return Ok(stream),
            Err(e) => {
                debug!("Connect to {} failed: {}", addr, e);
                last_err = e;
            }
        }
    }
    Err(DbnError::transport(phase, last_err))
}

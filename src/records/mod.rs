//! Typed connection observations and the Zeek conn.log source that produces them.
//! Records arriving here have already passed the ingestion boundary: hosts, ports,
//! protocol and timestamp are always present.

mod zeek;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use zeek::ZeekConnReader;

/// One observation of a connection. Several records may describe the same
/// connection over time (an early SYN-only line, later a closing summary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRecord {
    /// Seconds since the epoch, fractional
    pub ts: f64,
    /// Connection identifier; repeats across records of one connection
    pub uid: String,
    pub orig_host: String,
    pub orig_port: u16,
    pub resp_host: String,
    pub resp_port: u16,
    pub proto: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orig_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resp_bytes: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conn_state: Option<ConnState>,
}

impl ConnectionRecord {
    pub fn new(
        ts: f64,
        orig: (impl Into<String>, u16),
        resp: (impl Into<String>, u16),
        proto: impl Into<String>,
    ) -> Self {
        Self {
            ts,
            uid: String::new(),
            orig_host: orig.0.into(),
            orig_port: orig.1,
            resp_host: resp.0.into(),
            resp_port: resp.1,
            proto: proto.into(),
            duration: None,
            orig_bytes: None,
            resp_bytes: None,
            conn_state: None,
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.uid = uid.into();
        self
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_bytes(mut self, orig: Option<u64>, resp: Option<u64>) -> Self {
        self.orig_bytes = orig;
        self.resp_bytes = resp;
        self
    }

    pub fn with_state(mut self, state: ConnState) -> Self {
        self.conn_state = Some(state);
        self
    }

    pub fn duration_or_zero(&self) -> f64 {
        self.duration.unwrap_or(0.0)
    }

    pub fn orig_bytes_or_zero(&self) -> u64 {
        self.orig_bytes.unwrap_or(0)
    }

    pub fn resp_bytes_or_zero(&self) -> u64 {
        self.resp_bytes.unwrap_or(0)
    }

    /// Duration > 0 or a terminal state: the connection is over and the flow can be finalized now.
    pub fn signals_end(&self) -> bool {
        self.duration_or_zero() > 0.0
            || self.conn_state.as_ref().is_some_and(ConnState::is_terminal)
    }
}

/// Zeek `conn_state` vocabulary. Codes outside it are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnState {
    /// S0: connection attempt seen, no reply
    SynOnly,
    /// S1: established, not terminated
    Established,
    /// SF: normal establishment and termination
    ClosedSuccess,
    /// REJ: connection attempt rejected
    Rejected,
    /// S2: established, close attempt by originator only
    OrigCloseOnly,
    /// S3: established, close attempt by responder only
    RespCloseOnly,
    /// RSTO: originator aborted with RST
    ResetByOriginator,
    /// RSTR: responder sent RST
    ResetByResponder,
    /// RSTOS0: originator sent SYN then RST
    OrigSynReset,
    /// RSTRH: responder sent SYN-ACK then RST
    RespSynAckReset,
    /// SH: originator sent SYN then FIN
    OrigHalfOpen,
    /// SHR: responder sent SYN-ACK then FIN
    RespHalfOpen,
    /// OTH: midstream traffic, no SYN seen
    Midstream,
    Other(String),
}

impl ConnState {
    pub fn from_code(code: &str) -> Self {
        match code {
            "S0" => Self::SynOnly,
            "S1" => Self::Established,
            "SF" => Self::ClosedSuccess,
            "REJ" => Self::Rejected,
            "S2" => Self::OrigCloseOnly,
            "S3" => Self::RespCloseOnly,
            "RSTO" => Self::ResetByOriginator,
            "RSTR" => Self::ResetByResponder,
            "RSTOS0" => Self::OrigSynReset,
            "RSTRH" => Self::RespSynAckReset,
            "SH" => Self::OrigHalfOpen,
            "SHR" => Self::RespHalfOpen,
            "OTH" => Self::Midstream,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::SynOnly => "S0",
            Self::Established => "S1",
            Self::ClosedSuccess => "SF",
            Self::Rejected => "REJ",
            Self::OrigCloseOnly => "S2",
            Self::RespCloseOnly => "S3",
            Self::ResetByOriginator => "RSTO",
            Self::ResetByResponder => "RSTR",
            Self::OrigSynReset => "RSTOS0",
            Self::RespSynAckReset => "RSTRH",
            Self::OrigHalfOpen => "SH",
            Self::RespHalfOpen => "SHR",
            Self::Midstream => "OTH",
            Self::Other(code) => code,
        }
    }

    /// States that close a flow immediately on ingest.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ClosedSuccess | Self::Rejected | Self::ResetByOriginator | Self::ResetByResponder
        )
    }

    /// The code carries the finished marker `F`.
    pub fn has_fin(&self) -> bool {
        self.code().contains('F')
    }
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for ConnState {
    fn from(code: String) -> Self {
        Self::from_code(&code)
    }
}

impl From<ConnState> for String {
    fn from(state: ConnState) -> Self {
        state.code().to_string()
    }
}

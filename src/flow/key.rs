//! Direction-independent flow identity.

use crate::records::ConnectionRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One side of a connection.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Protocol plus the unordered endpoint pair. `low <= high` always holds, so a record
/// and its mirror image (originator and responder swapped) produce the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FlowKey {
    proto: String,
    low: Endpoint,
    high: Endpoint,
}

impl FlowKey {
    pub fn new(orig_host: &str, orig_port: u16, resp_host: &str, resp_port: u16, proto: &str) -> Self {
        let a = Endpoint {
            host: orig_host.to_string(),
            port: orig_port,
        };
        let b = Endpoint {
            host: resp_host.to_string(),
            port: resp_port,
        };
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        Self {
            proto: proto.to_string(),
            low,
            high,
        }
    }

    pub fn from_record(record: &ConnectionRecord) -> Self {
        Self::new(
            &record.orig_host,
            record.orig_port,
            &record.resp_host,
            record.resp_port,
            &record.proto,
        )
    }

    pub fn proto(&self) -> &str {
        &self.proto
    }

    pub fn endpoints(&self) -> (&Endpoint, &Endpoint) {
        (&self.low, &self.high)
    }
}

impl fmt::Display for FlowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}<->{}/{}", self.low, self.high, self.proto)
    }
}

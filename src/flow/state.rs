//! Per-flow accumulator. Only the engine mutates it; everyone else reads.

use crate::records::ConnectionRecord;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct FlowState {
    id: Uuid,
    start_time: f64,
    last_seen_time: f64,
    fixed_orig_host: String,
    fixed_resp_host: String,
    records: Vec<ConnectionRecord>,
    inter_arrivals: Vec<f64>,
}

impl FlowState {
    /// Start a flow from its first record. Direction is fixed here for the flow's lifetime.
    pub(crate) fn open(record: ConnectionRecord) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_time: record.ts,
            last_seen_time: record.ts,
            fixed_orig_host: record.orig_host.clone(),
            fixed_resp_host: record.resp_host.clone(),
            records: vec![record],
            inter_arrivals: Vec::new(),
        }
    }

    /// Add a later record: one inter-arrival sample, then advance `last_seen_time`.
    pub(crate) fn push(&mut self, record: ConnectionRecord) {
        self.inter_arrivals.push(record.ts - self.last_seen_time);
        self.last_seen_time = record.ts;
        self.records.push(record);
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn last_seen_time(&self) -> f64 {
        self.last_seen_time
    }

    pub fn fixed_orig_host(&self) -> &str {
        &self.fixed_orig_host
    }

    pub fn fixed_resp_host(&self) -> &str {
        &self.fixed_resp_host
    }

    /// Records in arrival order. Never empty.
    pub fn records(&self) -> &[ConnectionRecord] {
        &self.records
    }

    pub fn inter_arrivals(&self) -> &[f64] {
        &self.inter_arrivals
    }

    pub fn first_record(&self) -> &ConnectionRecord {
        &self.records[0]
    }

    pub fn last_record(&self) -> &ConnectionRecord {
        &self.records[self.records.len() - 1]
    }

    pub fn is_idle(&self, now: f64, timeout: f64) -> bool {
        now - self.last_seen_time >= timeout
    }
}

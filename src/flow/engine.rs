//! Active-flow table and the two finalization paths: terminal signal on ingest, inactivity sweep.
//!
//! The table sits behind a single mutex. Every path that removes a flow does so under that lock
//! and moves the state out before extraction, so each flow lifetime yields exactly one vector.

use super::{FlowKey, FlowState};
use crate::config::FlowConfig;
use crate::features::{self, FeatureVector};
use crate::records::ConnectionRecord;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Why a flow left the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalizeReason {
    /// Record carried a duration or a terminal state
    Signal,
    /// Idle past the timeout at sweep time
    Timeout,
    /// Drained at end of input or shutdown
    Flush,
}

impl FinalizeReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            FinalizeReason::Signal => "signal",
            FinalizeReason::Timeout => "timeout",
            FinalizeReason::Flush => "flush",
        }
    }
}

/// Engine counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub records_ingested: u64,
    pub flows_opened: u64,
    pub closed_by_signal: u64,
    pub closed_by_timeout: u64,
    pub closed_by_flush: u64,
}

impl EngineStats {
    pub fn flows_closed(&self) -> u64 {
        self.closed_by_signal + self.closed_by_timeout + self.closed_by_flush
    }

    fn count_closed(&mut self, reason: FinalizeReason, n: usize) {
        let n = n as u64;
        match reason {
            FinalizeReason::Signal => self.closed_by_signal += n,
            FinalizeReason::Timeout => self.closed_by_timeout += n,
            FinalizeReason::Flush => self.closed_by_flush += n,
        }
    }
}

#[derive(Default)]
struct FlowTable {
    flows: HashMap<FlowKey, FlowState>,
    stats: EngineStats,
}

pub struct FlowEngine {
    timeout_secs: f64,
    table: Mutex<FlowTable>,
}

impl FlowEngine {
    pub fn new(config: &FlowConfig) -> Self {
        Self::with_timeout(config.timeout_secs)
    }

    pub fn with_timeout(timeout_secs: f64) -> Self {
        Self {
            timeout_secs,
            table: Mutex::new(FlowTable::default()),
        }
    }

    pub fn timeout_secs(&self) -> f64 {
        self.timeout_secs
    }

    // A panic while holding the lock cannot leave a half-moved flow behind.
    fn lock(&self) -> MutexGuard<'_, FlowTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add one record to its flow. Returns the flow's features when the record ends it.
    pub fn ingest(&self, record: ConnectionRecord) -> Option<FeatureVector> {
        let key = FlowKey::from_record(&record);
        let ends = record.signals_end();

        let finished = {
            let mut guard = self.lock();
            let table = &mut *guard;
            table.stats.records_ingested += 1;
            let finished = match table.flows.entry(key) {
                Entry::Occupied(mut entry) => {
                    entry.get_mut().push(record);
                    ends.then(|| entry.remove_entry())
                }
                Entry::Vacant(entry) => {
                    let state = FlowState::open(record);
                    table.stats.flows_opened += 1;
                    debug!(flow_id = %state.id(), key = %entry.key(), "flow opened");
                    if ends {
                        Some((entry.into_key(), state))
                    } else {
                        entry.insert(state);
                        None
                    }
                }
            };
            if finished.is_some() {
                table.stats.count_closed(FinalizeReason::Signal, 1);
            }
            finished
        };

        let (key, state) = finished?;
        Some(finalize(&key, state, FinalizeReason::Signal))
    }

    /// Ingest records in order and collect every vector finalized along the way.
    pub fn ingest_all<I>(&self, records: I) -> Vec<FeatureVector>
    where
        I: IntoIterator<Item = ConnectionRecord>,
    {
        records.into_iter().filter_map(|r| self.ingest(r)).collect()
    }

    /// Finalize every flow idle for at least `timeout` seconds as of `now`.
    pub fn sweep_timeouts(&self, now: f64, timeout: f64) -> Vec<FeatureVector> {
        let expired: Vec<(FlowKey, FlowState)> = {
            let mut guard = self.lock();
            let table = &mut *guard;
            let keys: Vec<FlowKey> = table
                .flows
                .iter()
                .filter(|(_, state)| state.is_idle(now, timeout))
                .map(|(key, _)| key.clone())
                .collect();
            let expired: Vec<_> = keys
                .into_iter()
                .filter_map(|key| table.flows.remove_entry(&key))
                .collect();
            table.stats.count_closed(FinalizeReason::Timeout, expired.len());
            expired
        };

        if !expired.is_empty() {
            info!(now, timeout, count = expired.len(), "timed out flows");
        }
        expired
            .into_iter()
            .map(|(key, state)| finalize(&key, state, FinalizeReason::Timeout))
            .collect()
    }

    /// Sweep with the configured timeout.
    pub fn sweep(&self, now: f64) -> Vec<FeatureVector> {
        self.sweep_timeouts(now, self.timeout_secs)
    }

    /// Finalize every active flow regardless of age.
    pub fn flush(&self) -> Vec<FeatureVector> {
        let drained: Vec<(FlowKey, FlowState)> = {
            let mut guard = self.lock();
            let table = &mut *guard;
            let drained: Vec<_> = table.flows.drain().collect();
            table.stats.count_closed(FinalizeReason::Flush, drained.len());
            drained
        };

        if !drained.is_empty() {
            info!(count = drained.len(), "flushed active flows");
        }
        drained
            .into_iter()
            .map(|(key, state)| finalize(&key, state, FinalizeReason::Flush))
            .collect()
    }

    pub fn active_flows(&self) -> usize {
        self.lock().flows.len()
    }

    pub fn contains(&self, key: &FlowKey) -> bool {
        self.lock().flows.contains_key(key)
    }

    /// Read-only view of an active flow.
    pub fn with_flow<T>(&self, key: &FlowKey, f: impl FnOnce(&FlowState) -> T) -> Option<T> {
        self.lock().flows.get(key).map(f)
    }

    pub fn stats(&self) -> EngineStats {
        self.lock().stats
    }
}

// Takes the state by value: once here, the flow no longer exists anywhere else.
fn finalize(key: &FlowKey, state: FlowState, reason: FinalizeReason) -> FeatureVector {
    let fv = features::extract(&state);
    debug!(
        flow_id = %state.id(),
        key = %key,
        reason = reason.as_str(),
        records = state.records().len(),
        "flow finalized"
    );
    fv
}

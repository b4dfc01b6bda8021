//! Pipeline: record source → flow engine → feature sink.
//! Replay sweeps on record time and flushes at end of input; live sweeps on the wall clock.

use crate::config::FlowConfig;
use crate::error::RecordError;
use crate::export::FeatureSink;
use crate::features::FeatureVector;
use crate::flow::{EngineStats, FlowEngine};
use crate::records::{ConnectionRecord, ZeekConnReader};
use chrono::Utc;
use serde::Serialize;
use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Shortest live-mode wait between sweep checks.
const MIN_TICK: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PipelineSummary {
    /// Lines rejected at the ingestion boundary
    pub rejected: u64,
    /// Feature vectors handed to the sink
    pub vectors_written: u64,
    pub engine: EngineStats,
}

pub struct Pipeline<S: FeatureSink> {
    engine: Arc<FlowEngine>,
    sink: S,
    sweep_interval_secs: f64,
    vectors_written: u64,
}

/// Wall clock as fractional epoch seconds, the unit record timestamps use.
pub fn wall_clock_secs() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1e6
}

impl<S: FeatureSink> Pipeline<S> {
    pub fn new(config: &FlowConfig, sink: S) -> Self {
        Self {
            engine: Arc::new(FlowEngine::new(config)),
            sink,
            sweep_interval_secs: config.sweep_interval_secs,
            vectors_written: 0,
        }
    }

    pub fn engine(&self) -> &Arc<FlowEngine> {
        &self.engine
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    fn emit(&mut self, vectors: &[FeatureVector]) -> io::Result<()> {
        self.sink.write_all(vectors)?;
        self.vectors_written += vectors.len() as u64;
        Ok(())
    }

    fn finish(&mut self, rejected: u64) -> io::Result<PipelineSummary> {
        let rest = self.engine.flush();
        self.emit(&rest)?;
        self.sink.flush()?;
        let summary = PipelineSummary {
            rejected,
            vectors_written: self.vectors_written,
            engine: self.engine.stats(),
        };
        info!(
            records = summary.engine.records_ingested,
            rejected = summary.rejected,
            flows = summary.engine.flows_opened,
            vectors = summary.vectors_written,
            "pipeline finished"
        );
        Ok(summary)
    }

    /// Replay a finished log. Record timestamps drive the sweep clock.
    pub fn replay<I>(&mut self, source: I) -> io::Result<PipelineSummary>
    where
        I: IntoIterator<Item = Result<ConnectionRecord, RecordError>>,
    {
        let mut rejected = 0u64;
        let mut last_sweep: Option<f64> = None;

        for item in source {
            let record = match item {
                Ok(record) => record,
                Err(RecordError::Io(e)) => {
                    warn!(error = %e, "input stream failed, flushing open flows");
                    self.finish(rejected)?;
                    return Err(e);
                }
                Err(e) => {
                    rejected += 1;
                    warn!(error = %e, "rejected record");
                    continue;
                }
            };
            let now = record.ts;
            if let Some(fv) = self.engine.ingest(record) {
                self.emit(&[fv])?;
            }
            match last_sweep {
                Some(prev) if now - prev < self.sweep_interval_secs => {}
                Some(_) => {
                    let expired = self.engine.sweep(now);
                    self.emit(&expired)?;
                    last_sweep = Some(now);
                }
                None => last_sweep = Some(now),
            }
        }

        self.finish(rejected)
    }

    /// Follow a stream. A reader thread ingests while this thread writes vectors and sweeps
    /// on the wall clock. Returns when the stream ends or `stop` is raised, after a flush.
    ///
    /// On `stop` the reader is closed off before the final flush: a record it is ingesting
    /// completes first, and anything read afterwards is dropped.
    pub fn live<R>(&mut self, reader: R, stop: &AtomicBool) -> io::Result<PipelineSummary>
    where
        R: BufRead + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<FeatureVector>();
        let rejected = Arc::new(AtomicU64::new(0));

        // true while the reader may ingest; held across each ingest and its send.
        let open = Arc::new(Mutex::new(true));

        let engine = Arc::clone(&self.engine);
        let rejected_in = Arc::clone(&rejected);
        let open_in = Arc::clone(&open);
        let handle = std::thread::spawn(move || {
            for item in ZeekConnReader::new(reader) {
                match item {
                    Ok(record) => {
                        let gate = open_in.lock().unwrap_or_else(PoisonError::into_inner);
                        if !*gate {
                            debug!(ts = record.ts, "input after shutdown dropped");
                            break;
                        }
                        if let Some(fv) = engine.ingest(record) {
                            if tx.send(fv).is_err() {
                                break;
                            }
                        }
                        drop(gate);
                    }
                    Err(RecordError::Io(e)) => {
                        warn!(error = %e, "input stream failed");
                        break;
                    }
                    Err(e) => {
                        rejected_in.fetch_add(1, Ordering::Relaxed);
                        warn!(error = %e, "rejected record");
                    }
                }
            }
        });

        let interval = Duration::from_secs_f64(self.sweep_interval_secs.max(0.0));
        let tick = interval.max(MIN_TICK);
        let mut last_sweep = Instant::now();
        info!(interval_secs = self.sweep_interval_secs, "live mode (Ctrl+C to stop)");

        loop {
            match rx.recv_timeout(tick) {
                Ok(fv) => self.emit(&[fv])?,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    if handle.join().is_err() {
                        warn!("input reader panicked");
                    }
                    break;
                }
            }
            if stop.load(Ordering::Relaxed) {
                *open.lock().unwrap_or_else(PoisonError::into_inner) = false;
                while let Ok(fv) = rx.try_recv() {
                    self.emit(&[fv])?;
                }
                if handle.is_finished() {
                    let _ = handle.join();
                } else {
                    debug!("input reader still blocked on read, detaching");
                }
                break;
            }
            if last_sweep.elapsed() >= interval {
                let expired = self.engine.sweep(wall_clock_secs());
                self.emit(&expired)?;
                self.sink.flush()?;
                last_sweep = Instant::now();
            }
        }

        self.finish(rejected.load(Ordering::Relaxed))
    }
}

//! Feature sinks: one row per finalized flow, as NDJSON objects or CSV lines.

use crate::config::OutputFormat;
use crate::features::{FeatureVector, FEATURE_NAMES};
use std::io::{self, Write};

pub trait FeatureSink {
    fn write(&mut self, fv: &FeatureVector) -> io::Result<()>;
    fn flush(&mut self) -> io::Result<()>;

    fn write_all(&mut self, vectors: &[FeatureVector]) -> io::Result<()> {
        for fv in vectors {
            self.write(fv)?;
        }
        Ok(())
    }
}

impl<S: FeatureSink + ?Sized> FeatureSink for Box<S> {
    fn write(&mut self, fv: &FeatureVector) -> io::Result<()> {
        (**self).write(fv)
    }

    fn flush(&mut self) -> io::Result<()> {
        (**self).flush()
    }
}

/// One JSON object per line, keyed by feature name.
pub struct NdjsonSink<W: Write> {
    out: W,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FeatureSink for NdjsonSink<W> {
    fn write(&mut self, fv: &FeatureVector) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, fv)?;
        writeln!(self.out)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Header on first write, then comma-separated values in scorer column order.
pub struct CsvSink<W: Write> {
    out: W,
    wrote_header: bool,
}

impl<W: Write> CsvSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            wrote_header: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> FeatureSink for CsvSink<W> {
    fn write(&mut self, fv: &FeatureVector) -> io::Result<()> {
        if !self.wrote_header {
            writeln!(self.out, "{}", FEATURE_NAMES.join(","))?;
            self.wrote_header = true;
        }
        let row: Vec<String> = fv.to_row().iter().map(f64::to_string).collect();
        writeln!(self.out, "{}", row.join(","))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.out.flush()
    }
}

/// Boxed sink for the configured format.
pub fn sink_for<W: Write + Send + 'static>(format: OutputFormat, out: W) -> Box<dyn FeatureSink + Send> {
    match format {
        OutputFormat::Ndjson => Box::new(NdjsonSink::new(out)),
        OutputFormat::Csv => Box::new(CsvSink::new(out)),
    }
}

//! Flow agent entrypoint: replays a Zeek conn.log (file or stdin) into feature rows, or follows
//! stdin in live mode until Ctrl+C.

use flow_agent::{
    config::{AgentConfig, RunMode},
    export::{self, FeatureSink},
    logging::StructuredLogger,
    pipeline::Pipeline,
    records::ZeekConnReader,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

static STOP: AtomicBool = AtomicBool::new(false);

fn open_sink(config: &AgentConfig) -> io::Result<Box<dyn FeatureSink + Send>> {
    let out: Box<dyn Write + Send> = match &config.output.path {
        Some(path) => Box::new(BufWriter::new(File::create(path)?)),
        None => Box::new(BufWriter::new(io::stdout())),
    };
    Ok(export::sink_for(config.output.format, out))
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config_path = std::env::var("FLOW_AGENT_CONFIG")
        .map(std::path::PathBuf::from)
        .unwrap_or_else(|_| std::path::PathBuf::from("flow-agent.json"));
    let config = AgentConfig::load(&config_path);

    StructuredLogger::init(config.log.json, &config.log.level);

    info!(
        input = ?config.input,
        mode = ?config.mode,
        timeout_secs = config.flow.timeout_secs,
        "flow agent starting"
    );

    let mut pipeline = Pipeline::new(&config.flow, open_sink(&config)?);

    let summary = match config.mode {
        RunMode::Replay => match &config.input {
            Some(path) => {
                let reader = BufReader::new(File::open(path)?);
                pipeline.replay(ZeekConnReader::new(reader))?
            }
            None => pipeline.replay(ZeekConnReader::new(io::stdin().lock()))?,
        },
        RunMode::Live => {
            if let Err(e) = ctrlc::set_handler(|| {
                STOP.store(true, Ordering::Relaxed);
            }) {
                warn!(error = %e, "could not install Ctrl+C handler, live mode stops only at end of input");
            }
            match &config.input {
                Some(path) => pipeline.live(BufReader::new(File::open(path)?), &STOP)?,
                None => pipeline.live(BufReader::new(io::stdin()), &STOP)?,
            }
        }
    };

    info!(
        vectors = summary.vectors_written,
        rejected = summary.rejected,
        "flow agent stopping"
    );
    Ok(())
}

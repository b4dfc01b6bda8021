//! Pipeline benchmark: records → flow engine → features, and conn.log replay.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use flow_agent::config::FlowConfig;
use flow_agent::export::NdjsonSink;
use flow_agent::flow::FlowEngine;
use flow_agent::pipeline::Pipeline;
use flow_agent::records::{ConnState, ConnectionRecord, ZeekConnReader};
use std::io::Cursor;

fn make_records(flows: usize, per_flow: usize) -> Vec<ConnectionRecord> {
    let mut out = Vec::with_capacity(flows * per_flow);
    for step in 0..per_flow {
        for f in 0..flows {
            let mut r = ConnectionRecord::new(
                step as f64,
                (format!("10.0.{}.{}", f / 250, f % 250), 40000 + (f % 20000) as u16),
                ("192.168.1.10", 443),
                "tcp",
            )
            .with_bytes(Some(512), Some(1024));
            r.conn_state = Some(if step + 1 == per_flow {
                ConnState::ClosedSuccess
            } else {
                ConnState::Established
            });
            out.push(r);
        }
    }
    out
}

fn make_conn_log(flows: usize) -> String {
    let mut log = String::from(
        "#fields\tts\tuid\tid.orig_h\tid.orig_p\tid.resp_h\tid.resp_p\tproto\tduration\torig_bytes\tresp_bytes\tconn_state\n",
    );
    for f in 0..flows {
        log.push_str(&format!(
            "{}.0\tC{}\t10.0.{}.{}\t{}\t192.168.1.10\t443\ttcp\t-\t512\t-\tS0\n",
            f,
            f,
            f / 250,
            f % 250,
            40000 + f % 20000
        ));
    }
    log
}

fn bench_ingest(c: &mut Criterion) {
    let records = make_records(1000, 4);

    c.bench_function("ingest_1000_flows_x4", |b| {
        b.iter(|| {
            let engine = FlowEngine::with_timeout(60.0);
            black_box(engine.ingest_all(black_box(records.clone())))
        })
    });
}

fn bench_sweep(c: &mut Criterion) {
    let records: Vec<ConnectionRecord> = make_records(1000, 2)
        .into_iter()
        .filter(|r| r.conn_state == Some(ConnState::Established))
        .collect();

    c.bench_function("sweep_1000_idle_flows", |b| {
        b.iter(|| {
            let engine = FlowEngine::with_timeout(60.0);
            engine.ingest_all(records.clone());
            black_box(engine.sweep_timeouts(black_box(1000.0), 60.0))
        })
    });
}

fn bench_replay(c: &mut Criterion) {
    let log = make_conn_log(1000);
    let config = FlowConfig::default();

    c.bench_function("replay_conn_log_1000", |b| {
        b.iter(|| {
            let mut pipeline = Pipeline::new(&config, NdjsonSink::new(Vec::new()));
            black_box(pipeline.replay(ZeekConnReader::new(Cursor::new(log.as_bytes()))))
        })
    });
}

criterion_group!(benches, bench_ingest, bench_sweep, bench_replay);
criterion_main!(benches);

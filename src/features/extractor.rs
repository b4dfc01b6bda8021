//! Flow state → feature vector. Pure arithmetic over the records a flow collected.

use super::FeatureVector;
use crate::flow::FlowState;
use crate::records::ConnState;

/// Substituted for a zero duration so rates stay finite.
pub const MIN_DURATION_SECS: f64 = 1e-6;

/// Span between first and last record, floored by the longest duration any record reported.
/// Exactly zero becomes [`MIN_DURATION_SECS`].
pub fn effective_duration(flow: &FlowState) -> f64 {
    let observed = flow.last_seen_time() - flow.start_time();
    let reported = flow
        .records()
        .iter()
        .map(|r| r.duration_or_zero())
        .fold(0.0_f64, f64::max);
    let duration = observed.max(reported);
    if duration == 0.0 {
        MIN_DURATION_SECS
    } else {
        duration
    }
}

pub fn extract(flow: &FlowState) -> FeatureVector {
    // Direction is relative to the first record's originator. Both tests run per record,
    // so a flow whose endpoints share a host counts each record in both directions.
    let fwd_bytes: Vec<u64> = flow
        .records()
        .iter()
        .filter(|r| r.orig_host == flow.fixed_orig_host())
        .map(|r| r.orig_bytes_or_zero())
        .collect();
    let bwd_bytes: Vec<u64> = flow
        .records()
        .iter()
        .filter(|r| r.orig_host == flow.fixed_resp_host())
        .map(|r| r.resp_bytes_or_zero())
        .collect();

    // Widened so byte counts near u64::MAX cannot overflow the sums.
    let fwd_total = wide_sum(&fwd_bytes);
    let all_total = fwd_total + wide_sum(&bwd_bytes);
    let sizes_len = fwd_bytes.len() + bwd_bytes.len();
    let average_packet_size = if sizes_len == 0 {
        0.0
    } else {
        all_total as f64 / sizes_len as f64
    };
    let max_packet_length = fwd_bytes.iter().chain(&bwd_bytes).copied().max().unwrap_or(0);

    let iats = flow.inter_arrivals();
    let idle_mean = if iats.is_empty() {
        0.0
    } else {
        iats.iter().sum::<f64>() / iats.len() as f64
    };

    let duration = effective_duration(flow);
    let final_state = flow.last_record().conn_state.as_ref();

    FeatureVector {
        idle_mean,
        psh_flag_count: u8::from(final_state == Some(&ConnState::ClosedSuccess)),
        average_packet_size,
        max_packet_length,
        total_fwd_packets: fwd_bytes.len() as u64,
        total_backward_packets: bwd_bytes.len() as u64,
        total_length_fwd_packets: u64::try_from(fwd_total).unwrap_or(u64::MAX),
        bwd_packets_per_sec: bwd_bytes.len() as f64 / duration,
        fin_flag_count: u8::from(final_state.is_some_and(ConnState::has_fin)),
        destination_port: flow.first_record().resp_port,
        flow_bytes_per_sec: all_total as f64 / duration,
    }
}

fn wide_sum(bytes: &[u64]) -> u128 {
    bytes.iter().map(|&b| u128::from(b)).sum()
}

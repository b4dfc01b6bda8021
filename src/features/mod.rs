//! Per-flow statistical features for the downstream scorer.

mod extractor;

pub use extractor::{effective_duration, extract, MIN_DURATION_SECS};

use serde::{Deserialize, Serialize};

/// Column names, in the order the scorer expects them.
pub const FEATURE_NAMES: [&str; 11] = [
    "Idle Mean",
    "PSH Flag Count",
    "Average Packet Size",
    "Max Packet Length",
    "Total Fwd Packets",
    "Total Backward Packets",
    "Total Length of Fwd Packets",
    "Bwd Packets/s",
    "FIN Flag Count",
    "Destination Port",
    "Flow Bytes/s",
];

/// Features of one finalized flow. Field order matches [`FEATURE_NAMES`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "Idle Mean")]
    pub idle_mean: f64,
    #[serde(rename = "PSH Flag Count")]
    pub psh_flag_count: u8,
    #[serde(rename = "Average Packet Size")]
    pub average_packet_size: f64,
    #[serde(rename = "Max Packet Length")]
    pub max_packet_length: u64,
    #[serde(rename = "Total Fwd Packets")]
    pub total_fwd_packets: u64,
    #[serde(rename = "Total Backward Packets")]
    pub total_backward_packets: u64,
    #[serde(rename = "Total Length of Fwd Packets")]
    pub total_length_fwd_packets: u64,
    #[serde(rename = "Bwd Packets/s")]
    pub bwd_packets_per_sec: f64,
    #[serde(rename = "FIN Flag Count")]
    pub fin_flag_count: u8,
    #[serde(rename = "Destination Port")]
    pub destination_port: u16,
    #[serde(rename = "Flow Bytes/s")]
    pub flow_bytes_per_sec: f64,
}

impl FeatureVector {
    /// Values as model input, same order as [`FEATURE_NAMES`].
    pub fn to_row(&self) -> [f64; 11] {
        [
            self.idle_mean,
            self.psh_flag_count as f64,
            self.average_packet_size,
            self.max_packet_length as f64,
            self.total_fwd_packets as f64,
            self.total_backward_packets as f64,
            self.total_length_fwd_packets as f64,
            self.bwd_packets_per_sec,
            self.fin_flag_count as f64,
            self.destination_port as f64,
            self.flow_bytes_per_sec,
        ]
    }
}

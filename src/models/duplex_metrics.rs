use serde::{Deserialize, Serialize};
use crate::models::result::LatencyStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStats {
    pub attempted: u64,
    pub successful: u64,
    pub failed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventStats {
    pub sent: u64,
    pub received: u64,
    pub errors: u64,
}

/// Raw samples behind the combined latency figures, in milliseconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DuplexSamples {
    pub connect_ms: Vec<f64>,
    pub message_ms: Vec<f64>,
}

impl DuplexSamples {
    pub fn combined(&self) -> Vec<f64> {
        let mut all = Vec::with_capacity(self.connect_ms.len() + self.message_ms.len());
        all.extend_from_slice(&self.connect_ms);
        all.extend_from_slice(&self.message_ms);
        all
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DuplexMetrics {
    pub role_name: String,
    pub connections: ConnectionStats,
    pub events: EventStats,
    // connect and round-trip samples pooled together
    pub latency: LatencyStats,
    pub duration_seconds: f64,
    #[serde(skip)]
    pub samples: DuplexSamples,
}

impl DuplexMetrics {
    pub fn new(
        role_name: &str,
        connections: ConnectionStats,
        events: EventStats,
        samples: DuplexSamples,
        duration_seconds: f64,
    ) -> Self {
        DuplexMetrics {
            role_name: role_name.to_string(),
            connections,
            events,
            latency: LatencyStats::from_samples(&samples.combined()),
            duration_seconds,
            samples,
        }
    }

    pub fn failure_rate(&self) -> f64 {
        self.connections.failed as f64 / self.connections.attempted.max(1) as f64
    }

    pub fn label(&self) -> String {
        format!("WebSocket ({})", self.role_name)
    }
}

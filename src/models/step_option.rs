use serde::{Deserialize, Serialize};

/// Concurrency ladder for stress escalation: `start`, `start + increase_step`, ...
/// up to `max`, each level measured for `window_secs`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepOption {
    pub start: usize,
    pub increase_step: usize,
    pub max: usize,
    pub window_secs: u64,
}

impl StepOption {
    pub fn levels(&self) -> Vec<usize> {
        if self.increase_step == 0 {
            return vec![self.start];
        }
        (self.start..=self.max).step_by(self.increase_step).collect()
    }
}

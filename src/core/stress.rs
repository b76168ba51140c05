use std::future::Future;
use tracing::{info, warn};
use crate::models::duplex_metrics::DuplexMetrics;
use crate::models::report::StressLevel;
use crate::models::result::TestResult;
use crate::models::step_option::StepOption;

/// A level whose error rate exceeds this stops the escalation.
pub const ERROR_RATE_THRESHOLD: f64 = 0.10;

/// Anything a stress level can be judged on.
pub trait CapacitySample {
    /// Fraction of failed work at this level, `0.0..=1.0`.
    fn error_rate(&self) -> f64;
}

impl CapacitySample for TestResult {
    fn error_rate(&self) -> f64 {
        TestResult::error_rate(self)
    }
}

impl CapacitySample for DuplexMetrics {
    fn error_rate(&self) -> f64 {
        self.failure_rate()
    }
}

/// Run `run_level` at each rung of `plan` in order, stopping after the first level
/// that breaches [`ERROR_RATE_THRESHOLD`]. A level that fails outright ends the
/// ladder without being recorded.
pub async fn escalate<T, F, Fut>(
    subject: &str,
    plan: &StepOption,
    mut run_level: F,
) -> Vec<StressLevel<T>>
where
    T: CapacitySample,
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let mut levels = Vec::new();
    for concurrency in plan.levels() {
        let result = match run_level(concurrency).await {
            Ok(result) => result,
            Err(e) => {
                warn!(subject, concurrency, error = %e, "stress level failed, escalation stopped");
                break;
            }
        };
        let error_rate = result.error_rate();
        let breached = error_rate > ERROR_RATE_THRESHOLD;
        info!(subject, concurrency, error_rate, breached, "stress level measured");
        levels.push(StressLevel { concurrency, result, breached });
        if breached {
            break;
        }
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct Synthetic(f64);

    impl CapacitySample for Synthetic {
        fn error_rate(&self) -> f64 {
            self.0
        }
    }

    fn plan() -> StepOption {
        StepOption { start: 100, increase_step: 100, max: 300, window_secs: 1 }
    }

    #[tokio::test]
    async fn stops_at_first_breach() {
        let executed = RefCell::new(Vec::new());
        let levels = escalate("synthetic", &plan(), |concurrency| {
            executed.borrow_mut().push(concurrency);
            let rate = match concurrency {
                100 => 0.02,
                200 => 0.12,
                _ => 0.30,
            };
            async move { Ok::<_, anyhow::Error>(Synthetic(rate)) }
        })
        .await;

        assert_eq!(levels.len(), 2);
        assert_eq!(levels[0].concurrency, 100);
        assert!(!levels[0].breached);
        assert_eq!(levels[1].concurrency, 200);
        assert!(levels[1].breached);
        assert_eq!(*executed.borrow(), vec![100, 200]);
    }

    #[tokio::test]
    async fn runs_to_ceiling_when_never_breached() {
        let levels = escalate("synthetic", &plan(), |_| async {
            Ok::<_, anyhow::Error>(Synthetic(0.01))
        })
        .await;
        let concurrencies: Vec<usize> = levels.iter().map(|l| l.concurrency).collect();
        assert_eq!(concurrencies, vec![100, 200, 300]);
        assert!(levels.iter().all(|l| !l.breached));
    }

    #[tokio::test]
    async fn exactly_ten_percent_does_not_breach() {
        let levels = escalate("synthetic", &plan(), |_| async {
            Ok::<_, anyhow::Error>(Synthetic(0.10))
        })
        .await;
        assert_eq!(levels.len(), 3);
    }

    #[tokio::test]
    async fn failed_level_ends_ladder() {
        let levels = escalate("synthetic", &plan(), |concurrency| async move {
            if concurrency == 200 {
                Err(anyhow::anyhow!("target went away"))
            } else {
                Ok(Synthetic(0.0))
            }
        })
        .await;
        assert_eq!(levels.len(), 1);
    }
}

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::config::AlignerConfig;
use crate::error::SimilarityError;
use crate::pipeline::traits::SimilarityProvider;

type ScoreJob = Box<dyn FnOnce() + Send>;

/// Long-lived threads that run provider calls so the caller can stop waiting
/// at the time budget. A hung call occupies one worker until it returns.
struct CallWorkers {
    jobs: Mutex<mpsc::Sender<ScoreJob>>,
}

impl CallWorkers {
    /// Returns `None` when not a single worker thread could be started.
    fn spawn(count: usize) -> Option<Self> {
        let (tx, rx) = mpsc::channel::<ScoreJob>();
        let rx = Arc::new(Mutex::new(rx));
        let mut started = 0usize;
        for idx in 0..count.max(1) {
            let rx = Arc::clone(&rx);
            let spawned = thread::Builder::new()
                .name(format!("similarity-worker-{idx}"))
                .spawn(move || loop {
                    let job = rx.lock().recv();
                    match job {
                        Ok(job) => job(),
                        Err(_) => break,
                    }
                });
            match spawned {
                Ok(_) => started += 1,
                Err(err) => tracing::warn!(error = %err, "failed to start similarity worker"),
            }
        }
        (started > 0).then(|| Self {
            jobs: Mutex::new(tx),
        })
    }

    fn submit(&self, job: ScoreJob) -> Result<(), SimilarityError> {
        self.jobs
            .lock()
            .send(job)
            .map_err(|_| SimilarityError::Unavailable("similarity workers stopped".to_string()))
    }
}

/// Wraps a [`SimilarityProvider`] with retries, a time budget and a
/// per-batch circuit breaker.
pub(crate) struct ProviderGuard {
    provider: Arc<dyn SimilarityProvider>,
    max_retries: u32,
    timeout: Duration,
    workers: Option<CallWorkers>,
    max_consecutive_failures: u32,
}

/// Provider bookkeeping for one batch. Dropped with the batch.
#[derive(Debug, Default)]
pub(crate) struct BatchProviderState {
    consecutive_failures: u32,
    tripped: bool,
    pub fallbacks: usize,
    pub timeouts: usize,
}

impl ProviderGuard {
    pub(crate) fn new(provider: Arc<dyn SimilarityProvider>, config: &AlignerConfig) -> Self {
        let workers = if config.provider_isolated_calls {
            let workers = CallWorkers::spawn(config.provider_workers);
            if workers.is_none() {
                tracing::warn!(
                    provider = provider.name(),
                    "no similarity worker available; provider calls run inline"
                );
            }
            workers
        } else {
            None
        };
        Self {
            provider,
            max_retries: config.provider_max_retries,
            timeout: Duration::from_millis(config.provider_timeout_ms.max(1)),
            workers,
            max_consecutive_failures: config.provider_max_consecutive_failures.max(1),
        }
    }

    pub(crate) fn provider_name(&self) -> &str {
        self.provider.name()
    }

    pub(crate) fn release_batch_state(&self) {
        self.provider.release_batch_state();
    }

    /// Returns the provider score, or `None` when the caller must fall back.
    pub(crate) fn score(
        &self,
        state: &mut BatchProviderState,
        source: &str,
        target: &str,
    ) -> Option<f32> {
        if state.tripped {
            state.fallbacks += 1;
            return None;
        }

        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            match self.attempt(source, target) {
                Ok(score) => {
                    state.consecutive_failures = 0;
                    return Some(score);
                }
                Err(err) => {
                    tracing::debug!(
                        provider = self.provider.name(),
                        attempt,
                        error = %err,
                        "similarity attempt failed"
                    );
                    let timed_out = err.is_timeout();
                    last_err = Some(err);
                    // Timeouts are not retried.
                    if timed_out {
                        state.timeouts += 1;
                        break;
                    }
                }
            }
        }

        state.fallbacks += 1;
        state.consecutive_failures += 1;
        if let Some(err) = last_err {
            tracing::warn!(
                provider = self.provider.name(),
                error = %err,
                "similarity provider failed; using lexical fallback"
            );
        }
        if state.consecutive_failures >= self.max_consecutive_failures {
            state.tripped = true;
            tracing::warn!(
                provider = self.provider.name(),
                consecutive_failures = state.consecutive_failures,
                "similarity provider disabled for the rest of this batch"
            );
        }
        None
    }

    fn attempt(&self, source: &str, target: &str) -> Result<f32, SimilarityError> {
        let started = Instant::now();
        let raw = match &self.workers {
            Some(workers) => self.attempt_on_worker(workers, source, target)?,
            None => self.provider.score(source, target)?,
        };
        let elapsed = started.elapsed();
        if elapsed > self.timeout {
            return Err(SimilarityError::Timeout {
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
        if !raw.is_finite() {
            return Err(SimilarityError::InvalidScore { value: raw });
        }
        Ok(raw.clamp(0.0, 1.0))
    }

    /// Hands the call to a worker and stops waiting at the budget. A late
    /// result is discarded when the worker finishes.
    fn attempt_on_worker(
        &self,
        workers: &CallWorkers,
        source: &str,
        target: &str,
    ) -> Result<f32, SimilarityError> {
        let (tx, rx) = mpsc::channel();
        let provider = Arc::clone(&self.provider);
        let source = source.to_owned();
        let target = target.to_owned();
        workers.submit(Box::new(move || {
            let _ = tx.send(provider.score(&source, &target));
        }))?;

        match rx.recv_timeout(self.timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => Err(SimilarityError::Timeout {
                elapsed_ms: self.timeout.as_millis() as u64,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(SimilarityError::Failed(
                "similarity call panicked".to_string(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    struct Flaky {
        calls: AtomicUsize,
        fail_first: usize,
    }

    impl SimilarityProvider for Flaky {
        fn score(&self, _source: &str, _target: &str) -> Result<f32, SimilarityError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                Err(SimilarityError::failed("transient"))
            } else {
                Ok(1.7)
            }
        }

        fn name(&self) -> &str {
            "flaky"
        }
    }

    struct Slow;

    impl SimilarityProvider for Slow {
        fn score(&self, _source: &str, _target: &str) -> Result<f32, SimilarityError> {
            thread::sleep(Duration::from_millis(200));
            Ok(0.9)
        }

        fn name(&self) -> &str {
            "slow"
        }
    }

    struct Nan;

    impl SimilarityProvider for Nan {
        fn score(&self, _source: &str, _target: &str) -> Result<f32, SimilarityError> {
            Ok(f32::NAN)
        }

        fn name(&self) -> &str {
            "nan"
        }
    }

    fn guard(provider: Arc<dyn SimilarityProvider>, config: AlignerConfig) -> ProviderGuard {
        ProviderGuard::new(provider, &config)
    }

    #[test]
    fn retries_then_clamps_success() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            fail_first: 2,
        });
        let g = guard(flaky.clone(), AlignerConfig::default());
        let mut state = BatchProviderState::default();
        assert_eq!(g.score(&mut state, "a", "b"), Some(1.0));
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
        assert_eq!(state.fallbacks, 0);
    }

    #[test]
    fn exhausted_retries_fall_back() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
        });
        let config = AlignerConfig {
            provider_max_retries: 1,
            ..AlignerConfig::default()
        };
        let g = guard(flaky.clone(), config);
        let mut state = BatchProviderState::default();
        assert_eq!(g.score(&mut state, "a", "b"), None);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.fallbacks, 1);
    }

    #[test]
    fn breaker_trips_after_consecutive_failures() {
        let flaky = Arc::new(Flaky {
            calls: AtomicUsize::new(0),
            fail_first: usize::MAX,
        });
        let config = AlignerConfig {
            provider_max_retries: 0,
            provider_max_consecutive_failures: 2,
            ..AlignerConfig::default()
        };
        let g = guard(flaky.clone(), config);
        let mut state = BatchProviderState::default();
        for _ in 0..5 {
            assert_eq!(g.score(&mut state, "a", "b"), None);
        }
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.fallbacks, 5);

        // A fresh batch gets a fresh breaker.
        let mut next = BatchProviderState::default();
        assert_eq!(g.score(&mut next, "a", "b"), None);
        assert_eq!(flaky.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn default_config_stops_waiting_at_budget() {
        let config = AlignerConfig {
            provider_timeout_ms: 20,
            ..AlignerConfig::default()
        };
        let g = guard(Arc::new(Slow), config);
        let mut state = BatchProviderState::default();
        let started = Instant::now();
        assert_eq!(g.score(&mut state, "a", "b"), None);
        assert!(started.elapsed() < Duration::from_millis(150));
        assert_eq!(state.timeouts, 1);
    }

    #[test]
    fn workers_are_reused_across_calls() {
        struct ThreadNames(Mutex<HashSet<String>>);

        impl SimilarityProvider for ThreadNames {
            fn score(&self, _source: &str, _target: &str) -> Result<f32, SimilarityError> {
                let name = thread::current().name().unwrap_or_default().to_string();
                self.0.lock().insert(name);
                Ok(0.5)
            }

            fn name(&self) -> &str {
                "thread-names"
            }
        }

        let config = AlignerConfig {
            provider_workers: 1,
            ..AlignerConfig::default()
        };
        let provider = Arc::new(ThreadNames(Mutex::new(HashSet::new())));
        let g = guard(provider.clone(), config);
        let mut state = BatchProviderState::default();
        for _ in 0..20 {
            assert_eq!(g.score(&mut state, "a", "b"), Some(0.5));
        }
        let names = provider.0.lock();
        assert_eq!(names.len(), 1);
        assert!(names.contains("similarity-worker-0"));
    }

    #[test]
    fn inline_overrun_counts_as_timeout() {
        let config = AlignerConfig {
            provider_timeout_ms: 20,
            provider_isolated_calls: false,
            ..AlignerConfig::default()
        };
        let g = guard(Arc::new(Slow), config);
        let mut state = BatchProviderState::default();
        assert_eq!(g.score(&mut state, "a", "b"), None);
        assert_eq!(state.timeouts, 1);
        assert_eq!(state.fallbacks, 1);
    }

    #[test]
    fn non_finite_score_is_a_failure() {
        let g = guard(Arc::new(Nan), AlignerConfig::default());
        let mut state = BatchProviderState::default();
        assert_eq!(g.score(&mut state, "a", "b"), None);
    }
}

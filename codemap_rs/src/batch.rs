//! Window-bounded batch orchestration.
//!
//! Items run in fixed windows of `concurrency` items. Every item of a window
//! runs concurrently, and the next window starts only once the whole window
//! has settled, so peak concurrency is exactly the window size. After each
//! window an optional [`WindowObserver`] receives the window's successful
//! results and is awaited before the next window begins.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::classifier::Classification;
use crate::error::{MapError, Result};

pub const DEFAULT_CONCURRENCY: usize = 20;

/// What the orchestrator needs to know about an item's output to keep cost
/// and cache accounting.
pub trait BatchOutput {
    /// Cost incurred by producing this output now; zero when it was served
    /// from a cache.
    fn incremental_cost_usd(&self) -> f64 {
        0.0
    }

    fn is_cached(&self) -> bool {
        false
    }
}

impl BatchOutput for Classification {
    fn incremental_cost_usd(&self) -> f64 {
        Classification::incremental_cost_usd(self)
    }

    fn is_cached(&self) -> bool {
        self.cached
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub continue_on_error: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            continue_on_error: true,
        }
    }
}

/// Outcome of one item. Failures keep the error's display text.
#[derive(Clone, Debug)]
pub struct ItemResult<T, R> {
    pub item: T,
    pub outcome: std::result::Result<R, String>,
    pub elapsed: Duration,
}

impl<T, R> ItemResult<T, R> {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Per-run accounting. Built fresh for every run and returned with it.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BatchStats {
    pub total_items: usize,
    pub completed: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub total_cost_usd: f64,
    pub average_cost_usd: f64,
    pub cache_hits: usize,
    pub cache_misses: usize,
    pub total_time_ms: u64,
    pub average_time_ms: f64,
}

#[derive(Clone, Debug)]
pub struct BatchReport<T, R> {
    pub results: Vec<ItemResult<T, R>>,
    pub stats: BatchStats,
}

impl<T, R> BatchReport<T, R> {
    pub fn successes(&self) -> impl Iterator<Item = (&T, &R)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().ok().map(|out| (&r.item, out)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&T, &str)> {
        self.results
            .iter()
            .filter_map(|r| r.outcome.as_ref().err().map(|e| (&r.item, e.as_str())))
    }
}

/// Owned progress event, suitable for sending across a channel.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WindowProgress {
    /// Zero-based window index.
    pub index: usize,
    pub window_count: usize,
    /// Items settled so far, this window included.
    pub current: usize,
    pub total: usize,
    pub last_item: Option<String>,
    pub succeeded: usize,
    pub failed: usize,
}

/// Borrowed view of a settled window, handed to the observer.
#[derive(Debug)]
pub struct WindowReport<'a, T, R> {
    pub index: usize,
    pub window_count: usize,
    pub current: usize,
    pub total: usize,
    pub last_item: Option<String>,
    /// Successful results of this window only.
    pub successes: Vec<(&'a T, &'a R)>,
    pub failed: usize,
}

impl<T, R> WindowReport<'_, T, R> {
    pub fn progress(&self) -> WindowProgress {
        WindowProgress {
            index: self.index,
            window_count: self.window_count,
            current: self.current,
            total: self.total,
            last_item: self.last_item.clone(),
            succeeded: self.successes.len(),
            failed: self.failed,
        }
    }
}

pub type ObserverFuture<'a> = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Receives one report per settled window, in window order.
///
/// An observer error is logged and ignored; it never fails the run.
pub trait WindowObserver<T, R>: Send {
    fn on_window<'a>(&'a mut self, report: WindowReport<'a, T, R>) -> ObserverFuture<'a>;
}

/// Progress stream: each window sends a [`WindowProgress`]. A closed
/// receiver shows up as an (ignored) observer error.
impl<T, R> WindowObserver<T, R> for tokio::sync::mpsc::Sender<WindowProgress> {
    fn on_window<'a>(&'a mut self, report: WindowReport<'a, T, R>) -> ObserverFuture<'a> {
        let progress = report.progress();
        Box::pin(async move {
            self.send(progress)
                .await
                .map_err(|_| anyhow::anyhow!("progress receiver dropped"))
        })
    }
}

#[derive(Clone, Debug)]
pub struct BatchOrchestrator {
    options: BatchOptions,
}

impl BatchOrchestrator {
    /// Rejects a zero window size; everything else is valid.
    pub fn new(options: BatchOptions) -> Result<Self> {
        if options.concurrency == 0 {
            return Err(MapError::InvalidConcurrency(options.concurrency));
        }
        Ok(Self { options })
    }

    pub fn options(&self) -> BatchOptions {
        self.options
    }

    /// Run `op` over `items` window by window.
    ///
    /// With `continue_on_error` a failing item is recorded and the run goes
    /// on. Without it, the first failure ends the run after its window
    /// settles and comes back as [`MapError::ItemFailed`].
    pub async fn run<T, R, F, Fut>(
        &self,
        items: Vec<T>,
        op: F,
        mut observer: Option<&mut dyn WindowObserver<T, R>>,
    ) -> Result<BatchReport<T, R>>
    where
        T: AsRef<Path> + Clone,
        R: BatchOutput,
        F: Fn(T) -> Fut,
        Fut: Future<Output = anyhow::Result<R>>,
    {
        let started = Instant::now();
        let total = items.len();
        let size = self.options.concurrency;
        let window_count = total.div_ceil(size);
        let mut stats = BatchStats {
            total_items: total,
            ..Default::default()
        };
        let mut results: Vec<ItemResult<T, R>> = Vec::with_capacity(total);

        for (index, window) in items.chunks(size).enumerate() {
            debug!(window = index + 1, window_count, items = window.len(), "starting window");

            let settled: Vec<ItemResult<T, R>> = join_all(window.iter().cloned().map(|item| {
                let fut = op(item.clone());
                async move {
                    let item_started = Instant::now();
                    let outcome = fut.await.map_err(|err| format!("{err:#}"));
                    ItemResult {
                        item,
                        outcome,
                        elapsed: item_started.elapsed(),
                    }
                }
            }))
            .await;

            let mut first_failure: Option<(String, String)> = None;
            for result in &settled {
                stats.completed += 1;
                match &result.outcome {
                    Ok(output) => {
                        stats.success_count += 1;
                        stats.total_cost_usd += output.incremental_cost_usd();
                        if output.is_cached() {
                            stats.cache_hits += 1;
                        } else {
                            stats.cache_misses += 1;
                        }
                    }
                    Err(message) => {
                        stats.failure_count += 1;
                        let label = item_label(&result.item);
                        warn!(item = %label, error = %message, "item failed");
                        if first_failure.is_none() {
                            first_failure = Some((label, message.clone()));
                        }
                    }
                }
            }

            let current = stats.completed;
            let last_item = settled.last().map(|r| item_label(&r.item));
            info!(window = index + 1, window_count, current, total, "window complete");

            if !self.options.continue_on_error
                && let Some((item, message)) = first_failure
            {
                return Err(MapError::ItemFailed { item, message });
            }

            if let Some(obs) = observer.as_deref_mut() {
                let report = WindowReport {
                    index,
                    window_count,
                    current,
                    total,
                    last_item,
                    successes: settled
                        .iter()
                        .filter_map(|r| r.outcome.as_ref().ok().map(|out| (&r.item, out)))
                        .collect(),
                    failed: settled.iter().filter(|r| !r.is_success()).count(),
                };
                if let Err(err) = obs.on_window(report).await {
                    warn!(window = index + 1, error = %err, "window observer failed");
                }
            }

            results.extend(settled);
        }

        let elapsed = started.elapsed();
        stats.total_time_ms = elapsed.as_millis() as u64;
        if stats.success_count > 0 {
            stats.average_cost_usd = stats.total_cost_usd / stats.success_count as f64;
            stats.average_time_ms = elapsed.as_secs_f64() * 1000.0 / stats.success_count as f64;
        }

        Ok(BatchReport { results, stats })
    }
}

fn item_label<T: AsRef<Path>>(item: &T) -> String {
    item.as_ref().display().to_string()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Out {
        cost: f64,
        cached: bool,
    }

    impl BatchOutput for Out {
        fn incremental_cost_usd(&self) -> f64 {
            if self.cached { 0.0 } else { self.cost }
        }

        fn is_cached(&self) -> bool {
            self.cached
        }
    }

    fn items(n: usize) -> Vec<PathBuf> {
        (0..n).map(|i| PathBuf::from(format!("file{i}.md"))).collect()
    }

    #[derive(Default)]
    struct Recorder {
        windows: Vec<(usize, usize, usize)>,
    }

    impl WindowObserver<PathBuf, Out> for Recorder {
        fn on_window<'a>(&'a mut self, report: WindowReport<'a, PathBuf, Out>) -> ObserverFuture<'a> {
            self.windows
                .push((report.current, report.total, report.successes.len()));
            Box::pin(async { Ok(()) })
        }
    }

    struct Failing;

    impl WindowObserver<PathBuf, Out> for Failing {
        fn on_window<'a>(&'a mut self, _report: WindowReport<'a, PathBuf, Out>) -> ObserverFuture<'a> {
            Box::pin(async { Err(anyhow::anyhow!("store unavailable")) })
        }
    }

    #[test]
    fn zero_concurrency_is_rejected() {
        let err = BatchOrchestrator::new(BatchOptions {
            concurrency: 0,
            continue_on_error: true,
        })
        .unwrap_err();
        assert!(matches!(err, MapError::InvalidConcurrency(0)));
    }

    #[tokio::test]
    async fn continues_past_failures_and_counts_them() {
        let orchestrator = BatchOrchestrator::new(BatchOptions {
            concurrency: 3,
            continue_on_error: true,
        })
        .expect("valid options");
        let mut recorder = Recorder::default();
        let observer: &mut dyn WindowObserver<PathBuf, Out> = &mut recorder;

        let report = orchestrator
            .run(
                items(7),
                |path: PathBuf| async move {
                    let name = path.display().to_string();
                    if name == "file2.md" || name == "file5.md" {
                        anyhow::bail!("rejected {name}");
                    }
                    Ok(Out {
                        cost: 0.5,
                        cached: name == "file0.md",
                    })
                },
                Some(observer),
            )
            .await
            .expect("run");

        assert_eq!(report.stats.total_items, 7);
        assert_eq!(report.stats.success_count, 5);
        assert_eq!(report.stats.failure_count, 2);
        assert_eq!(report.stats.cache_hits, 1);
        assert_eq!(report.stats.cache_misses, 4);
        assert!((report.stats.total_cost_usd - 2.0).abs() < 1e-9);
        assert!((report.stats.average_cost_usd - 0.4).abs() < 1e-9);

        let failed: Vec<_> = report.failures().map(|(p, _)| p.clone()).collect();
        assert_eq!(failed.len(), 2);
        assert!(failed.contains(&PathBuf::from("file5.md")));
        assert!(report.failures().all(|(_, msg)| msg.starts_with("rejected")));

        assert_eq!(recorder.windows, vec![(3, 7, 2), (6, 7, 2), (7, 7, 1)]);
    }

    #[tokio::test]
    async fn window_size_bounds_in_flight_items() {
        let orchestrator = BatchOrchestrator::new(BatchOptions {
            concurrency: 4,
            continue_on_error: true,
        })
        .expect("valid options");
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let report = orchestrator
            .run(
                items(10),
                |_path: PathBuf| {
                    let in_flight = Arc::clone(&in_flight);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(5)).await;
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        Ok::<_, anyhow::Error>(Out {
                            cost: 0.0,
                            cached: false,
                        })
                    }
                },
                None,
            )
            .await
            .expect("run");

        assert_eq!(report.stats.success_count, 10);
        assert_eq!(peak.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn fail_fast_stops_after_the_failing_window() {
        let orchestrator = BatchOrchestrator::new(BatchOptions {
            concurrency: 2,
            continue_on_error: false,
        })
        .expect("valid options");
        let calls = AtomicUsize::new(0);

        let err = orchestrator
            .run(
                items(6),
                |path: PathBuf| {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if path == Path::new("file1.md") {
                            anyhow::bail!("boom");
                        }
                        Ok(Out {
                            cost: 0.0,
                            cached: false,
                        })
                    }
                },
                None,
            )
            .await
            .unwrap_err();

        match err {
            MapError::ItemFailed { item, message } => {
                assert_eq!(item, "file1.md");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn observer_errors_do_not_fail_the_run() {
        let orchestrator = BatchOrchestrator::new(BatchOptions::default()).expect("valid options");
        let mut failing = Failing;
        let observer: &mut dyn WindowObserver<PathBuf, Out> = &mut failing;
        let report = orchestrator
            .run(
                items(3),
                |_path: PathBuf| async {
                    Ok::<_, anyhow::Error>(Out {
                        cost: 1.0,
                        cached: false,
                    })
                },
                Some(observer),
            )
            .await
            .expect("run");
        assert_eq!(report.stats.success_count, 3);
    }

    #[tokio::test]
    async fn channel_observer_streams_progress() {
        let orchestrator = BatchOrchestrator::new(BatchOptions {
            concurrency: 2,
            continue_on_error: true,
        })
        .expect("valid options");
        let (mut tx, mut rx) = tokio::sync::mpsc::channel::<WindowProgress>(8);
        let observer: &mut dyn WindowObserver<PathBuf, Out> = &mut tx;

        orchestrator
            .run(
                items(5),
                |_path: PathBuf| async {
                    Ok::<_, anyhow::Error>(Out {
                        cost: 0.0,
                        cached: false,
                    })
                },
                Some(observer),
            )
            .await
            .expect("run");
        drop(tx);

        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        assert_eq!(events.len(), 3);
        assert_eq!(events[2].current, 5);
        assert_eq!(events[2].window_count, 3);
        assert_eq!(events[2].last_item.as_deref(), Some("file4.md"));
    }

    #[tokio::test]
    async fn empty_input_is_an_empty_report() {
        let orchestrator = BatchOrchestrator::new(BatchOptions::default()).expect("valid options");
        let report = orchestrator
            .run(
                Vec::<PathBuf>::new(),
                |_path: PathBuf| async {
                    Ok::<_, anyhow::Error>(Out {
                        cost: 0.0,
                        cached: false,
                    })
                },
                None,
            )
            .await
            .expect("run");
        assert!(report.results.is_empty());
        assert_eq!(report.stats, BatchStats::default());
    }
}

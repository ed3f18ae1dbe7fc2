//! Execution of page tasks: bounded parallel or sequential.
//!
//! The mode is chosen once per document from the page count, the memory
//! available at that moment and whether isolated workers are supported.
//! Workers run on tokio's blocking pool, gated by a semaphore holding
//! `worker_cap` permits. Outcomes are always sorted by page index before
//! they are returned.

mod memory;

pub use memory::{parse_meminfo_available, FixedMemoryProbe, MemoryProbe, SystemMemoryProbe};

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::config::ExtractionConfig;
use crate::error::ExtractionError;
use crate::resolve::{PageOutcome, PageSourceKind, WorkerTask};

/// Runs one page task to completion. Implementations block.
pub trait PageTaskRunner: Send + Sync {
    fn run(&self, task: &WorkerTask) -> PageOutcome;
}

/// Why a document runs sequentially.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequentialReason {
    LowMemory,
    MemoryUnknown,
    FewPages,
    NoIsolation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionMode {
    Sequential(SequentialReason),
    Parallel { workers: usize },
}

/// Platform default for isolated worker support.
///
/// Only Linux can report available memory through `SystemMemoryProbe`, so on
/// other unix targets such as macOS the memory gate still selects sequential
/// mode unless a probe is injected with `Extractor::with_memory_probe`.
pub fn default_isolated_workers() -> bool {
    cfg!(unix)
}

/// Pick the execution mode. Checks run in order: memory, page count, isolation.
pub fn choose_mode(
    page_count: usize,
    available_memory: Option<u64>,
    supports_isolated_workers: bool,
    config: &ExtractionConfig,
) -> ExecutionMode {
    match available_memory {
        None => return ExecutionMode::Sequential(SequentialReason::MemoryUnknown),
        Some(bytes) if bytes < config.memory_floor_bytes => {
            return ExecutionMode::Sequential(SequentialReason::LowMemory)
        }
        Some(_) => {}
    }
    if page_count < config.min_pages_for_parallel {
        return ExecutionMode::Sequential(SequentialReason::FewPages);
    }
    if !supports_isolated_workers {
        return ExecutionMode::Sequential(SequentialReason::NoIsolation);
    }
    ExecutionMode::Parallel {
        workers: config.worker_cap.max(1),
    }
}

/// Join outcome texts in page order.
pub fn assemble(outcomes: &[PageOutcome]) -> String {
    outcomes
        .iter()
        .map(|o| o.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

pub struct Scheduler {
    config: Arc<ExtractionConfig>,
    memory: Arc<dyn MemoryProbe>,
    supports_isolated_workers: bool,
}

impl Scheduler {
    pub fn new(
        config: Arc<ExtractionConfig>,
        memory: Arc<dyn MemoryProbe>,
        supports_isolated_workers: bool,
    ) -> Self {
        Self {
            config,
            memory,
            supports_isolated_workers,
        }
    }

    pub fn with_memory_probe(mut self, memory: Arc<dyn MemoryProbe>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_isolated_workers(mut self, supported: bool) -> Self {
        self.supports_isolated_workers = supported;
        self
    }

    /// Mode for a document of `page_count` pages, reading memory now.
    pub fn mode_for(&self, page_count: usize) -> ExecutionMode {
        choose_mode(
            page_count,
            self.memory.available_bytes(),
            self.supports_isolated_workers,
            &self.config,
        )
    }

    /// Run every task and return outcomes sorted by page index.
    ///
    /// One task per page. Tasks for pages that do not need OCR return
    /// their native text without reaching a worker.
    pub async fn run(
        &self,
        tasks: Vec<WorkerTask>,
        runner: Arc<dyn PageTaskRunner>,
    ) -> Vec<PageOutcome> {
        let page_count = tasks.len();
        let ocr_count = tasks.iter().filter(|t| t.needs_ocr()).count();

        let mut outcomes = match self.mode_for(page_count) {
            ExecutionMode::Parallel { workers } => {
                tracing::info!(pages = page_count, ocr_pages = ocr_count, workers, "Parallel OCR");
                match self.run_parallel(&tasks, runner.clone(), workers).await {
                    Ok(outcomes) => outcomes,
                    Err(e) => {
                        tracing::warn!("Parallel OCR failed, re-running sequentially: {}", e);
                        self.run_sequential(&tasks, runner).await
                    }
                }
            }
            ExecutionMode::Sequential(reason) => {
                tracing::info!(pages = page_count, ocr_pages = ocr_count, ?reason, "Sequential OCR");
                self.run_sequential(&tasks, runner).await
            }
        };

        outcomes.sort_by_key(|o| o.index);
        outcomes
    }

    async fn run_parallel(
        &self,
        tasks: &[WorkerTask],
        runner: Arc<dyn PageTaskRunner>,
        workers: usize,
    ) -> Result<Vec<PageOutcome>, ExtractionError> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let timeout = self.config.page_timeout_secs;

        let handles: Vec<_> = tasks
            .iter()
            .cloned()
            .map(|task| {
                let semaphore = semaphore.clone();
                let runner = runner.clone();
                tokio::spawn(async move {
                    if !task.needs_ocr() {
                        return Ok(PageOutcome::native(&task, PageSourceKind::Native));
                    }
                    let permit = semaphore
                        .acquire_owned()
                        .await
                        .map_err(|e| ExtractionError::Worker(e.to_string()))?;
                    run_blocking(task, runner, timeout, Some(permit)).await
                })
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for joined in join_all(handles).await {
            match joined {
                Ok(Ok(outcome)) => outcomes.push(outcome),
                Ok(Err(e)) => return Err(e),
                Err(e) => return Err(ExtractionError::Worker(e.to_string())),
            }
        }
        Ok(outcomes)
    }

    async fn run_sequential(
        &self,
        tasks: &[WorkerTask],
        runner: Arc<dyn PageTaskRunner>,
    ) -> Vec<PageOutcome> {
        let timeout = self.config.page_timeout_secs;
        let mut outcomes = Vec::with_capacity(tasks.len());

        for task in tasks {
            if !task.needs_ocr() {
                outcomes.push(PageOutcome::native(task, PageSourceKind::Native));
                continue;
            }
            let outcome = match run_blocking(task.clone(), runner.clone(), timeout, None).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(page = task.page_index, "Page worker failed: {}", e);
                    PageOutcome::native(task, PageSourceKind::KeptNative)
                }
            };
            outcomes.push(outcome);
        }
        outcomes
    }
}

/// Run one task on the blocking pool.
///
/// The permit moves into the blocking closure, so a timed-out task keeps
/// its worker slot until it actually returns.
async fn run_blocking(
    task: WorkerTask,
    runner: Arc<dyn PageTaskRunner>,
    timeout_secs: Option<u64>,
    permit: Option<OwnedSemaphorePermit>,
) -> Result<PageOutcome, ExtractionError> {
    let task = Arc::new(task);
    let handle = tokio::task::spawn_blocking({
        let task = task.clone();
        move || {
            let _permit = permit;
            runner.run(&task)
        }
    });

    match timeout_secs {
        Some(secs) => match tokio::time::timeout(Duration::from_secs(secs), handle).await {
            Ok(joined) => joined.map_err(|e| ExtractionError::Worker(e.to_string())),
            Err(_) => {
                tracing::warn!(
                    page = task.page_index,
                    "{}, using native text",
                    ExtractionError::Timeout {
                        page: task.page_index,
                        secs
                    }
                );
                Ok(PageOutcome::native(&task, PageSourceKind::TimedOut))
            }
        },
        None => handle
            .await
            .map_err(|e| ExtractionError::Worker(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::Rotation;
    use std::collections::BTreeSet;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    const GIB: u64 = 1024 * 1024 * 1024;

    /// Returns `PAGE_<i>`, finishing later pages first.
    struct ReversedRunner {
        page_count: usize,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        panic_once: AtomicBool,
        slow_page: Option<(usize, Duration)>,
        seen: Mutex<Vec<usize>>,
    }

    impl ReversedRunner {
        fn new(page_count: usize) -> Self {
            Self {
                page_count,
                calls: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                panic_once: AtomicBool::new(false),
                slow_page: None,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl PageTaskRunner for ReversedRunner {
        fn run(&self, task: &WorkerTask) -> PageOutcome {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if self.panic_once.swap(false, Ordering::SeqCst) {
                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                panic!("worker pool exploded");
            }

            let delay = match self.slow_page {
                Some((page, delay)) if page == task.page_index => delay,
                _ => Duration::from_millis(((self.page_count - task.page_index) * 10) as u64),
            };
            std::thread::sleep(delay);

            self.seen.lock().unwrap().push(task.page_index);
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            PageOutcome {
                index: task.page_index,
                text: format!("PAGE_{}", task.page_index),
                source: PageSourceKind::FullPage,
                words: 1,
            }
        }
    }

    fn tasks(page_count: usize, flagged: impl IntoIterator<Item = usize>) -> Vec<WorkerTask> {
        let ocr_pages: Arc<BTreeSet<usize>> = Arc::new(flagged.into_iter().collect());
        (0..page_count)
            .map(|i| WorkerTask {
                file_path: PathBuf::from("doc.pdf"),
                page_index: i,
                word_count: 1,
                native_text: format!("NATIVE_{}", i),
                rotation: Rotation::Deg0,
                quality_good: true,
                ocr_pages: ocr_pages.clone(),
            })
            .collect()
    }

    fn scheduler(config: ExtractionConfig, memory: Option<u64>) -> Scheduler {
        Scheduler::new(Arc::new(config), Arc::new(FixedMemoryProbe(memory)), true)
    }

    #[test]
    fn test_few_pages_run_sequentially_with_ample_memory() {
        let mode = choose_mode(5, Some(64 * GIB), true, &ExtractionConfig::default());
        assert_eq!(mode, ExecutionMode::Sequential(SequentialReason::FewPages));
    }

    #[test]
    fn test_low_memory_runs_sequentially() {
        let mode = choose_mode(20, Some(GIB), true, &ExtractionConfig::default());
        assert_eq!(mode, ExecutionMode::Sequential(SequentialReason::LowMemory));
    }

    #[test]
    fn test_unknown_memory_runs_sequentially() {
        let mode = choose_mode(20, None, true, &ExtractionConfig::default());
        assert_eq!(mode, ExecutionMode::Sequential(SequentialReason::MemoryUnknown));
    }

    #[test]
    fn test_no_isolation_runs_sequentially() {
        let mode = choose_mode(20, Some(8 * GIB), false, &ExtractionConfig::default());
        assert_eq!(mode, ExecutionMode::Sequential(SequentialReason::NoIsolation));
    }

    #[test]
    fn test_parallel_at_thresholds() {
        let config = ExtractionConfig::default();
        let mode = choose_mode(10, Some(config.memory_floor_bytes), true, &config);
        assert_eq!(mode, ExecutionMode::Parallel { workers: 2 });
    }

    #[test]
    fn test_mode_for_reads_injected_probe() {
        let sched = scheduler(ExtractionConfig::default(), Some(GIB));
        assert_eq!(
            sched.mode_for(20),
            ExecutionMode::Sequential(SequentialReason::LowMemory)
        );
        let sched = sched.with_memory_probe(Arc::new(FixedMemoryProbe(Some(4 * GIB))));
        assert_eq!(sched.mode_for(20), ExecutionMode::Parallel { workers: 2 });
        let sched = sched.with_isolated_workers(false);
        assert_eq!(
            sched.mode_for(20),
            ExecutionMode::Sequential(SequentialReason::NoIsolation)
        );
    }

    #[tokio::test]
    async fn test_parallel_output_matches_sequential_order() {
        let page_count = 12;
        let expected: Vec<String> = (0..page_count).map(|i| format!("PAGE_{}", i)).collect();

        let runner = Arc::new(ReversedRunner::new(page_count));
        let parallel = scheduler(ExtractionConfig::default(), Some(8 * GIB))
            .run(tasks(page_count, 0..page_count), runner.clone())
            .await;
        assert_eq!(assemble(&parallel), expected.join("\n"));
        // Later pages finished first.
        let seen = runner.seen.lock().unwrap().clone();
        assert_ne!(seen, (0..page_count).collect::<Vec<_>>());

        let sequential = scheduler(ExtractionConfig::default(), Some(GIB))
            .run(
                tasks(page_count, 0..page_count),
                Arc::new(ReversedRunner::new(page_count)),
            )
            .await;
        assert_eq!(assemble(&sequential), assemble(&parallel));
    }

    #[tokio::test]
    async fn test_worker_cap_is_respected() {
        let page_count = 16;
        let runner = Arc::new(ReversedRunner::new(page_count));
        scheduler(ExtractionConfig::default(), Some(8 * GIB))
            .run(tasks(page_count, 0..page_count), runner.clone())
            .await;
        assert!(runner.max_in_flight.load(Ordering::SeqCst) <= 2);
        assert_eq!(runner.calls.load(Ordering::SeqCst), page_count);
    }

    #[tokio::test]
    async fn test_unflagged_pages_skip_workers() {
        let runner = Arc::new(ReversedRunner::new(12));
        let outcomes = scheduler(ExtractionConfig::default(), Some(8 * GIB))
            .run(tasks(12, [3, 7]), runner.clone())
            .await;

        assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcomes[0].text, "NATIVE_0");
        assert_eq!(outcomes[0].source, PageSourceKind::Native);
        assert_eq!(outcomes[3].text, "PAGE_3");
        assert_eq!(outcomes[7].text, "PAGE_7");
    }

    #[tokio::test]
    async fn test_parallel_failure_reruns_everything_sequentially() {
        let page_count = 10;
        let runner = Arc::new(ReversedRunner::new(page_count));
        runner.panic_once.store(true, Ordering::SeqCst);

        let outcomes = scheduler(ExtractionConfig::default(), Some(8 * GIB))
            .run(tasks(page_count, 0..page_count), runner.clone())
            .await;

        let texts: Vec<&str> = outcomes.iter().map(|o| o.text.as_str()).collect();
        let expected: Vec<String> = (0..page_count).map(|i| format!("PAGE_{}", i)).collect();
        assert_eq!(texts, expected);
        // The sequential re-run covered the whole page set again.
        assert!(runner.calls.load(Ordering::SeqCst) >= 2 * page_count - 1);
    }

    #[tokio::test]
    async fn test_timeout_falls_back_to_native() {
        let mut runner = ReversedRunner::new(3);
        runner.slow_page = Some((1, Duration::from_millis(1500)));
        let config = ExtractionConfig {
            page_timeout_secs: Some(1),
            ..Default::default()
        };

        let outcomes = scheduler(config, Some(GIB))
            .run(tasks(3, 0..3), Arc::new(runner))
            .await;

        assert_eq!(outcomes[1].source, PageSourceKind::TimedOut);
        assert_eq!(outcomes[1].text, "NATIVE_1");
        assert_eq!(outcomes[2].text, "PAGE_2");
    }

    #[test]
    fn test_assemble_joins_with_newlines() {
        let outcomes: Vec<PageOutcome> = (0..3)
            .map(|i| PageOutcome {
                index: i,
                text: format!("PAGE_{}", i),
                source: PageSourceKind::Native,
                words: 1,
            })
            .collect();
        assert_eq!(assemble(&outcomes), "PAGE_0\nPAGE_1\nPAGE_2");
    }
}

//! Search orchestration.
//!
//! A [`SearchCoordinator`] is built once per search. Construction does all
//! the setup that can fail (statistics, cutoffs, the linking strategy);
//! [`SearchCoordinator::run`] then scans the database with a fixed pool of
//! workers. Each worker pulls chunks of consecutive subjects from a shared
//! cursor and runs every subject through
//! scan → extend → reap → link → refine → rank on worker-local buffers.
//!
//! Shared state lives only for one run and is guarded separately: the chunk
//! cursor, the result ranker, the ambiguity rescoring pass, the progress
//! ticker and the warning list each have their own mutex.

pub mod cancel;
pub mod chunk;
pub mod diagnostics;
pub mod progress;
pub mod split;
mod subject;

pub use cancel::{CancelToken, StopSignal};
pub use chunk::ChunkCursor;
pub use diagnostics::{SearchCounters, SearchStats};
pub use progress::{NoProgress, ProgressSink, Ticker};

use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Mutex, PoisonError};
use std::time::Instant;

use log::{debug, info, warn};

use crate::config::SearchConfig;
use crate::error::{SearchError, SearchWarning};
use crate::extension::GappedAligner;
use crate::hsp::HspStore;
use crate::link::HspLinker;
use crate::lookup::LookupIndex;
use crate::ranker::{ResultHitlist, ResultRanker};
use crate::seed::DiagonalTracker;
use crate::sequence::{QuerySet, SequenceSource};
use crate::stats::{CutoffCalculator, LinkStrategy, StatisticalContext, StatsMode};
use crate::utils::matrix::Scorer;

/// Everything a search reads but does not own
pub struct SearchInputs<'a, L: ?Sized, D: ?Sized, S: ?Sized, A> {
    pub queries: &'a QuerySet,
    pub lookup: &'a L,
    pub source: &'a D,
    pub scorer: &'a S,
    pub aligner: &'a A,
    pub calculator: CutoffCalculator,
}

/// Ranked hits plus how the search ended
#[derive(Debug, Clone)]
pub struct SearchOutcome {
    /// Best first
    pub hits: Vec<ResultHitlist>,
    pub timed_out: bool,
    /// Stopped before every subject was scanned (timeout included)
    pub cancelled: bool,
    pub warnings: Vec<SearchWarning>,
    pub stats: SearchStats,
}

/// Shared state of one run
pub(crate) struct RunState {
    pub(crate) stop: StopSignal,
    pub(crate) cursor: ChunkCursor,
    pub(crate) ranker: Mutex<ResultRanker>,
    pub(crate) reevaluation: Mutex<()>,
    pub(crate) ticker: Ticker,
    pub(crate) warnings: Mutex<Vec<SearchWarning>>,
    pub(crate) positive_hits: AtomicUsize,
    pub(crate) counters: SearchCounters,
}

impl RunState {
    pub(crate) fn warn(&self, warning: SearchWarning) {
        warn!("{}", warning);
        self.warnings
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(warning);
    }
}

/// Buffers owned by one worker and reused across its subjects
pub(crate) struct WorkerLocal {
    pub(crate) tracker: DiagonalTracker,
    pub(crate) store: HspStore,
}

impl WorkerLocal {
    fn new(queries: &QuerySet, config: &SearchConfig) -> Self {
        Self {
            tracker: DiagonalTracker::new(
                queries.len(),
                queries.max_context_len(),
                config.seed.two_hit_window,
            ),
            store: HspStore::new(&config.store),
        }
    }
}

pub struct SearchCoordinator<'a, L: ?Sized, D: ?Sized, S: ?Sized, A> {
    queries: &'a QuerySet,
    lookup: &'a L,
    source: &'a D,
    scorer: &'a S,
    aligner: &'a A,
    calculator: CutoffCalculator,
    config: SearchConfig,
    ungapped: Vec<StatisticalContext>,
    gapped: Option<Vec<StatisticalContext>>,
    linker: HspLinker,
    cancel: CancelToken,
}

impl<'a, L, D, S, A> SearchCoordinator<'a, L, D, S, A>
where
    L: LookupIndex + ?Sized,
    D: SequenceSource + ?Sized,
    S: Scorer + ?Sized,
    A: GappedAligner,
{
    /// Validate the inputs and derive all per-search statistics
    pub fn new(config: SearchConfig, inputs: SearchInputs<'a, L, D, S, A>) -> Result<Self, SearchError> {
        config.validate()?;
        let SearchInputs {
            queries,
            lookup,
            source,
            scorer,
            aligner,
            calculator,
        } = inputs;

        if queries.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        let word_width = config.seed.word_width;
        if lookup.encoding().word_width != word_width {
            return Err(SearchError::InvalidConfig(format!(
                "word index built for width {}, search configured for {}",
                lookup.encoding().word_width,
                word_width
            )));
        }
        if let Some(short) = queries.contexts().iter().find(|c| c.len() < word_width) {
            return Err(SearchError::QueryTooShort {
                context: short.index,
                length: short.len(),
                word_width,
            });
        }

        let db_len = source.total_length();
        let num_seqs = source.num_sequences();
        let ungapped = calculator.build_contexts(StatsMode::Ungapped, queries, db_len, num_seqs, &config)?;
        let gapped = if config.extension.gapped {
            Some(calculator.build_contexts(StatsMode::Gapped, queries, db_len, num_seqs, &config)?)
        } else {
            None
        };
        let strategy = calculator.link_strategy(&ungapped, queries, db_len, num_seqs, &config.linking);
        info!(
            "{} query contexts against {} subjects ({} residues); linking {:?}",
            queries.len(),
            num_seqs,
            db_len,
            config.linking.mode
        );
        debug!("linking strategy: {:?}", strategy);

        Ok(Self {
            queries,
            lookup,
            source,
            scorer,
            aligner,
            calculator,
            config,
            ungapped,
            gapped,
            linker: HspLinker::new(strategy, config.linking),
            cancel: CancelToken::new(),
        })
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Ungapped statistics, one entry per query context
    pub fn contexts(&self) -> &[StatisticalContext] {
        &self.ungapped
    }

    pub fn link_strategy(&self) -> &LinkStrategy {
        self.linker.strategy()
    }

    /// Handle for stopping the search from another thread. A request stops
    /// the current (or next) run and is cleared when that run returns.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn run(&self) -> SearchOutcome {
        self.run_with_progress(&NoProgress)
    }

    pub fn run_with_progress<P: ProgressSink + ?Sized>(&self, sink: &P) -> SearchOutcome {
        let started = Instant::now();
        let engine = &self.config.engine;
        let num_subjects = self.source.num_sequences();
        let requested = engine.resolved_workers().clamp(1, num_subjects.max(1));
        let (pool, workers) = build_pool(requested);
        let chunk_size = engine.chunk.chunk_size(num_subjects, workers);

        let run = RunState {
            stop: StopSignal::new(self.cancel.clone(), engine.timeout),
            cursor: ChunkCursor::new(num_subjects, chunk_size),
            ranker: Mutex::new(ResultRanker::new(self.config.hitlist_size)),
            reevaluation: Mutex::new(()),
            ticker: Ticker::new(engine.progress_interval),
            warnings: Mutex::new(Vec::new()),
            positive_hits: AtomicUsize::new(0),
            counters: SearchCounters::default(),
        };
        if workers < requested {
            run.warn(SearchWarning::WorkerSpawn {
                requested,
                granted: workers,
            });
        }
        info!(
            "scanning {} subjects with {} workers, chunk size {}",
            num_subjects, workers, chunk_size
        );

        std::thread::scope(|scope| {
            let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
            if let Some(period) = engine.heartbeat {
                let ticker = &run.ticker;
                scope.spawn(move || progress::run_heartbeat(period, ticker, sink, stop_rx));
            }
            match &pool {
                Some(pool) => pool.scope(|s| {
                    for _ in 0..workers {
                        s.spawn(|_| self.worker_loop(&run, sink));
                    }
                }),
                None => self.worker_loop(&run, sink),
            }
            drop(stop_tx);
        });

        let positive_hits = run.positive_hits.load(AtomicOrdering::Relaxed);
        run.ticker.flush(sink, positive_hits);

        let timed_out = run.stop.timed_out();
        let cancelled = run.stop.is_stopped();
        self.cancel.reset();
        if timed_out {
            warn!(
                "time limit reached after {} of {} subjects; returning partial results",
                run.ticker.subjects_done(),
                num_subjects
            );
        }

        let stats = run.counters.snapshot();
        stats.log_summary();
        let hits = run
            .ranker
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .into_sorted();
        let warnings = run.warnings.into_inner().unwrap_or_else(PoisonError::into_inner);
        info!(
            "search finished in {:.2?}: {} subjects with hits, {} reported",
            started.elapsed(),
            positive_hits,
            hits.len()
        );

        SearchOutcome {
            hits,
            timed_out,
            cancelled,
            warnings,
            stats,
        }
    }

    fn worker_loop<P: ProgressSink + ?Sized>(&self, run: &RunState, sink: &P) {
        let mut local = WorkerLocal::new(self.queries, &self.config);
        while !run.stop.should_stop() {
            let Some(chunk) = run.cursor.next_chunk() else {
                break;
            };
            for oid in chunk {
                if run.stop.should_stop() {
                    return;
                }
                if let Some(result) = self.process_subject(oid, &mut local, run) {
                    run.positive_hits.fetch_add(1, AtomicOrdering::Relaxed);
                    run.ranker
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(result);
                }
                run.ticker
                    .subject_done(sink, run.positive_hits.load(AtomicOrdering::Relaxed));
            }
        }
    }
}

/// Build a pool of `requested` threads, halving on failure. `None` means
/// not even one thread could be started; the caller then works inline.
fn build_pool(requested: usize) -> (Option<rayon::ThreadPool>, usize) {
    let mut n = requested.max(1);
    loop {
        match rayon::ThreadPoolBuilder::new()
            .num_threads(n)
            .thread_name(|i| format!("seedlink-worker-{}", i))
            .build()
        {
            Ok(pool) => return (Some(pool), n),
            Err(e) if n > 1 => {
                warn!("failed to start {} worker threads ({}); retrying with {}", n, e, n / 2);
                n /= 2;
            }
            Err(e) => {
                warn!("failed to start a worker thread ({}); scanning on the calling thread", e);
                return (None, 1);
            }
        }
    }
}

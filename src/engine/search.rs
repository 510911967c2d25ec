//! Random search over candidate patches.
//!
//! A fixed number of workers repeatedly ask the run for a candidate and
//! evaluate it. Handing out candidates is the only step taken under the
//! run's lock; provisioning, building, and testing run fully in parallel.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use log::{debug, info};
use rand::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::environment::{Environment, EnvironmentError, EnvironmentProvider, Provisioned};
use crate::schema::{SearchConfig, SearchConfigError, SearchStats, StopReason};

use super::candidate::{Candidate, Patch, Problem, Transformation};
use super::observer::{LogObserver, Rejection, SearchObserver};
use super::pool::{CandidatePool, LocationSelector, UniformSelector};

type TransformationOf<P> = <P as Problem>::Transformation;
type LocationOf<P> = <TransformationOf<P> as Transformation>::Location;

/// A candidate that compiled and passed every test.
#[derive(Debug, Clone)]
pub struct Repair<T> {
    pub candidate: Candidate<T>,
    pub patch: Patch,
    /// Time from the start of the run until the candidate was accepted.
    pub found_after: Duration,
}

/// Outcome of a search run.
#[derive(Debug, Clone)]
pub struct SearchReport<T> {
    /// Accepted candidates, in the order they were found.
    pub repairs: Vec<Repair<T>>,
    pub stop_reason: StopReason,
    pub stats: SearchStats,
}

impl<T> SearchReport<T> {
    pub fn found_repair(&self) -> bool {
        !self.repairs.is_empty()
    }

    pub fn first_repair(&self) -> Option<&Repair<T>> {
        self.repairs.first()
    }
}

/// Errors that prevent a search from running at all.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Failed to start worker threads: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Randomized search that evaluates one candidate per worker at a time.
pub struct RandomSearch<P: Problem, E: EnvironmentProvider<P>> {
    provider: E,
    problem: P,
    num_threads: usize,
    terminate_early: bool,
    time_limit: Option<Duration>,
    selector: Box<dyn LocationSelector<LocationOf<P>>>,
    observer: Box<dyn SearchObserver<TransformationOf<P>>>,
}

impl<P: Problem, E: EnvironmentProvider<P>> RandomSearch<P, E> {
    /// Create a search over every transformation of `problem`.
    pub fn new(
        provider: E,
        problem: P,
        num_threads: usize,
        terminate_early: bool,
        time_limit: Option<Duration>,
    ) -> Result<Self, SearchConfigError> {
        if num_threads == 0 {
            return Err(SearchConfigError::NoThreads);
        }
        if time_limit == Some(Duration::ZERO) {
            return Err(SearchConfigError::ZeroTimeLimit);
        }

        Ok(Self {
            provider,
            problem,
            num_threads,
            terminate_early,
            time_limit,
            selector: Box::new(UniformSelector),
            observer: Box::new(LogObserver),
        })
    }

    /// Create a search from a validated configuration.
    pub fn from_config(
        provider: E,
        problem: P,
        config: &SearchConfig,
    ) -> Result<Self, SearchConfigError> {
        config.validate()?;
        Self::new(
            provider,
            problem,
            config.threads,
            config.terminate_early,
            config.time_limit(),
        )
    }

    /// Replace the default log-based observer.
    pub fn with_observer(
        mut self,
        observer: impl SearchObserver<TransformationOf<P>> + 'static,
    ) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Replace the default uniform location selection.
    pub fn with_selector(mut self, selector: impl LocationSelector<LocationOf<P>> + 'static) -> Self {
        self.selector = Box::new(selector);
        self
    }

    pub fn problem(&self) -> &P {
        &self.problem
    }

    pub fn num_threads(&self) -> usize {
        self.num_threads
    }

    pub fn terminate_early(&self) -> bool {
        self.terminate_early
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit
    }

    /// Run the search until it halts.
    ///
    /// With a seed, the order in which candidates are handed out is
    /// reproducible.
    pub fn run(&self, seed: Option<u64>) -> Result<SearchReport<TransformationOf<P>>, SearchError> {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let candidates = self
            .problem
            .transformations()
            .into_iter()
            .map(|t| (t.location(), Candidate::single(t)));
        let pool = CandidatePool::from_candidates(candidates, &mut rng);
        info!(
            "Searching {} candidates at {} locations with {} threads",
            pool.len(),
            pool.locations().len(),
            self.num_threads
        );

        let workers = ThreadPoolBuilder::new()
            .num_threads(self.num_threads)
            .thread_name(|i| format!("search-worker-{i}"))
            .build()?;

        let run = SearchRun::new(self, pool, rng);
        workers.scope(|scope| {
            for worker in 0..self.num_threads {
                let run = &run;
                scope.spawn(move |_| run.work(worker));
            }
        });

        Ok(run.into_report())
    }
}

/// Mutable state of one run, only touched under the run's lock.
struct RunState<L, T> {
    pool: CandidatePool<L, Candidate<T>>,
    rng: StdRng,
    stop_reason: Option<StopReason>,
    repairs: Vec<Repair<T>>,
}

/// A single execution of a [`RandomSearch`], shared by its workers.
struct SearchRun<'a, P: Problem, E: EnvironmentProvider<P>> {
    search: &'a RandomSearch<P, E>,
    started: Instant,
    /// Set once, under the lock, when `state.stop_reason` is set.
    halted: AtomicBool,
    state: Mutex<RunState<LocationOf<P>, TransformationOf<P>>>,
    candidates_evaluated: AtomicU64,
    tests_executed: AtomicU64,
}

impl<'a, P: Problem, E: EnvironmentProvider<P>> SearchRun<'a, P, E> {
    fn new(
        search: &'a RandomSearch<P, E>,
        pool: CandidatePool<LocationOf<P>, Candidate<TransformationOf<P>>>,
        rng: StdRng,
    ) -> Self {
        Self {
            search,
            started: Instant::now(),
            halted: AtomicBool::new(false),
            state: Mutex::new(RunState {
                pool,
                rng,
                stop_reason: None,
                repairs: Vec::new(),
            }),
            candidates_evaluated: AtomicU64::new(0),
            tests_executed: AtomicU64::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RunState<LocationOf<P>, TransformationOf<P>>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Hand out the next candidate, or `None` once the run has halted.
    fn next(&self) -> Option<Candidate<TransformationOf<P>>> {
        let mut state = self.lock();
        if state.stop_reason.is_some() {
            return None;
        }

        if let Some(limit) = self.search.time_limit
            && self.started.elapsed() > limit
        {
            self.halt(&mut state, StopReason::TimeLimit);
            return None;
        }

        let state = &mut *state;
        match state.pool.pop(self.search.selector.as_ref(), &mut state.rng) {
            Some(candidate) => Some(candidate),
            None => {
                self.halt(state, StopReason::Exhausted);
                None
            }
        }
    }

    /// Must be called with the lock held; the first reason wins.
    fn halt(
        &self,
        state: &mut RunState<LocationOf<P>, TransformationOf<P>>,
        reason: StopReason,
    ) {
        if state.stop_reason.is_some() {
            return;
        }
        self.search.observer.on_halt(&reason);
        state.stop_reason = Some(reason);
        self.halted.store(true, Ordering::Release);
    }

    /// Build and test one candidate in a fresh environment.
    ///
    /// Failing to build or pass a test is a rejection, not an error.
    fn evaluate(&self, candidate: &Candidate<TransformationOf<P>>) -> Result<(), EnvironmentError> {
        let search = self.search;
        self.candidates_evaluated.fetch_add(1, Ordering::Relaxed);
        search.observer.on_evaluate(candidate);

        let mut environment = Provisioned::acquire(&search.provider, &search.problem)?;
        let patch = search.problem.diff(candidate)?;
        environment.apply(&patch)?;

        let compiled = environment.compile()?;
        debug!("Built {} in {:.2?}", candidate, compiled.duration);
        if !compiled.successful {
            search.observer.on_reject(candidate, &Rejection::CompileFailed);
            return Ok(());
        }

        for test in search.problem.tests() {
            self.tests_executed.fetch_add(1, Ordering::Relaxed);
            let outcome = environment.execute(test)?;
            debug!("Ran {} against {} in {:.2?}", test, candidate, outcome.duration);
            if !outcome.passed {
                let rejection = Rejection::TestFailed {
                    test: test.to_string(),
                };
                search.observer.on_reject(candidate, &rejection);
                return Ok(());
            }
        }

        let repair = Repair {
            candidate: candidate.clone(),
            patch,
            found_after: self.started.elapsed(),
        };
        search.observer.on_accept(&repair);

        let mut state = self.lock();
        state.repairs.push(repair);
        if search.terminate_early {
            self.halt(&mut state, StopReason::RepairFound);
        }
        Ok(())
    }

    fn work(&self, worker: usize) {
        debug!("Worker {} started", worker);

        // Unlocked read: a worker may miss a concurrent halt and call `next`
        // once more, which then returns `None` under the lock.
        while !self.halted.load(Ordering::Acquire) {
            let Some(candidate) = self.next() else {
                break;
            };

            if let Err(err) = self.evaluate(&candidate) {
                self.search.observer.on_error(&candidate, &err);
                let mut state = self.lock();
                self.halt(&mut state, StopReason::Error(err.to_string()));
            }
        }

        debug!("Worker {} stopped", worker);
    }

    fn into_report(self) -> SearchReport<TransformationOf<P>> {
        let stats = SearchStats::new(
            self.candidates_evaluated.into_inner(),
            self.tests_executed.into_inner(),
            self.started.elapsed(),
        );
        let state = self.state.into_inner().unwrap_or_else(PoisonError::into_inner);
        let stop_reason = state.stop_reason.unwrap_or(StopReason::Exhausted);

        info!(
            "Search finished ({}): {} repairs, {} candidates and {} tests evaluated in {:.1}s",
            stop_reason,
            state.repairs.len(),
            stats.candidates_evaluated,
            stats.tests_executed,
            stats.elapsed_seconds
        );

        SearchReport {
            repairs: state.repairs,
            stop_reason,
            stats,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::{CompileOutcome, TestOutcome};
    use rand::RngCore;
    use std::collections::HashSet;
    use std::fmt;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[derive(Debug, Clone, PartialEq, Eq)]
    struct Edit {
        id: usize,
        line: u32,
    }

    impl fmt::Display for Edit {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "edit#{}@{}", self.id, self.line)
        }
    }

    impl Transformation for Edit {
        type Location = u32;

        fn location(&self) -> u32 {
            self.line
        }
    }

    struct MockProblem {
        edits: Vec<Edit>,
        tests: Vec<String>,
    }

    impl MockProblem {
        fn new(lines: &[u32], tests: &[&str]) -> Self {
            Self {
                edits: lines
                    .iter()
                    .enumerate()
                    .map(|(id, &line)| Edit { id, line })
                    .collect(),
                tests: tests.iter().map(|t| t.to_string()).collect(),
            }
        }
    }

    impl Problem for MockProblem {
        type Transformation = Edit;
        type Test = String;

        fn transformations(&self) -> Vec<Edit> {
            self.edits.clone()
        }

        fn tests(&self) -> &[String] {
            &self.tests
        }

        fn diff(&self, candidate: &Candidate<Edit>) -> Result<Patch, EnvironmentError> {
            Ok(Patch::new(candidate.transformations()[0].id.to_string()))
        }
    }

    /// How the mock environment treats each candidate id.
    #[derive(Default)]
    struct Behaviour {
        passing: HashSet<usize>,
        broken_builds: HashSet<usize>,
        unappliable: HashSet<usize>,
        compile_delay: Duration,
    }

    #[derive(Default)]
    struct Record {
        provisioned: AtomicUsize,
        destroyed: AtomicUsize,
        applied: Mutex<Vec<usize>>,
        executed: Mutex<Vec<(usize, String)>>,
    }

    impl Record {
        fn provisioned(&self) -> usize {
            self.provisioned.load(Ordering::SeqCst)
        }

        fn destroyed(&self) -> usize {
            self.destroyed.load(Ordering::SeqCst)
        }

        fn applied(&self) -> Vec<usize> {
            self.applied.lock().unwrap().clone()
        }

        fn executed(&self) -> Vec<(usize, String)> {
            self.executed.lock().unwrap().clone()
        }
    }

    struct MockProvider {
        behaviour: Arc<Behaviour>,
        record: Arc<Record>,
    }

    struct MockEnvironment {
        behaviour: Arc<Behaviour>,
        record: Arc<Record>,
        candidate: Option<usize>,
        destroyed: bool,
    }

    impl Environment for MockEnvironment {
        type Test = String;

        fn apply(&mut self, patch: &Patch) -> Result<(), EnvironmentError> {
            let id: usize = patch.as_str().parse().unwrap();
            if self.behaviour.unappliable.contains(&id) {
                return Err(EnvironmentError::Patch(format!("hunk failed for {id}")));
            }
            self.record.applied.lock().unwrap().push(id);
            self.candidate = Some(id);
            Ok(())
        }

        fn compile(&mut self) -> Result<CompileOutcome, EnvironmentError> {
            thread::sleep(self.behaviour.compile_delay);
            let id = self.candidate.unwrap();
            Ok(CompileOutcome {
                successful: !self.behaviour.broken_builds.contains(&id),
                duration: self.behaviour.compile_delay,
            })
        }

        fn execute(&mut self, test: &String) -> Result<TestOutcome, EnvironmentError> {
            let id = self.candidate.unwrap();
            self.record
                .executed
                .lock()
                .unwrap()
                .push((id, test.clone()));
            Ok(TestOutcome {
                passed: self.behaviour.passing.contains(&id),
                duration: Duration::ZERO,
            })
        }
    }

    impl EnvironmentProvider<MockProblem> for MockProvider {
        type Environment = MockEnvironment;

        fn provision(&self, _problem: &MockProblem) -> Result<MockEnvironment, EnvironmentError> {
            self.record.provisioned.fetch_add(1, Ordering::SeqCst);
            Ok(MockEnvironment {
                behaviour: Arc::clone(&self.behaviour),
                record: Arc::clone(&self.record),
                candidate: None,
                destroyed: false,
            })
        }

        fn destroy(&self, environment: &mut MockEnvironment) -> Result<(), EnvironmentError> {
            assert!(!environment.destroyed, "environment destroyed twice");
            environment.destroyed = true;
            self.record.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn mock_search(
        behaviour: Behaviour,
        problem: MockProblem,
        threads: usize,
        terminate_early: bool,
        time_limit: Option<Duration>,
    ) -> (RandomSearch<MockProblem, MockProvider>, Arc<Record>) {
        let record = Arc::new(Record::default());
        let provider = MockProvider {
            behaviour: Arc::new(behaviour),
            record: Arc::clone(&record),
        };
        let search =
            RandomSearch::new(provider, problem, threads, terminate_early, time_limit).unwrap();
        (search, record)
    }

    fn ids(set: &[usize]) -> HashSet<usize> {
        set.iter().copied().collect()
    }

    struct FirstSelector;

    impl<L> LocationSelector<L> for FirstSelector {
        fn select(&self, _locations: &[L], _rng: &mut dyn RngCore) -> usize {
            0
        }
    }

    #[derive(Default)]
    struct Counts {
        evaluated: AtomicUsize,
        rejected: Mutex<Vec<Rejection>>,
        accepted: AtomicUsize,
        errors: AtomicUsize,
        halts: Mutex<Vec<StopReason>>,
    }

    struct CountingObserver(Arc<Counts>);

    impl SearchObserver<Edit> for CountingObserver {
        fn on_evaluate(&self, _candidate: &Candidate<Edit>) {
            self.0.evaluated.fetch_add(1, Ordering::SeqCst);
        }

        fn on_reject(&self, _candidate: &Candidate<Edit>, rejection: &Rejection) {
            self.0.rejected.lock().unwrap().push(rejection.clone());
        }

        fn on_accept(&self, _repair: &Repair<Edit>) {
            self.0.accepted.fetch_add(1, Ordering::SeqCst);
        }

        fn on_error(&self, _candidate: &Candidate<Edit>, _error: &EnvironmentError) {
            self.0.errors.fetch_add(1, Ordering::SeqCst);
        }

        fn on_halt(&self, reason: &StopReason) {
            self.0.halts.lock().unwrap().push(reason.clone());
        }
    }

    #[test]
    fn test_rejects_zero_threads() {
        let record = Arc::new(Record::default());
        let provider = MockProvider {
            behaviour: Arc::new(Behaviour::default()),
            record,
        };
        let result = RandomSearch::new(provider, MockProblem::new(&[1], &["t"]), 0, true, None);
        assert!(matches!(result, Err(SearchConfigError::NoThreads)));
    }

    #[test]
    fn test_rejects_zero_time_limit() {
        let record = Arc::new(Record::default());
        let provider = MockProvider {
            behaviour: Arc::new(Behaviour::default()),
            record,
        };
        let result = RandomSearch::new(
            provider,
            MockProblem::new(&[1], &["t"]),
            1,
            true,
            Some(Duration::ZERO),
        );
        assert!(matches!(result, Err(SearchConfigError::ZeroTimeLimit)));
    }

    #[test]
    fn test_next_exhausts_pool_then_halts() {
        let (search, _) = mock_search(
            Behaviour::default(),
            MockProblem::new(&[], &["t"]),
            1,
            true,
            None,
        );
        let search = search.with_selector(FirstSelector);
        let edit = |id, line| Candidate::single(Edit { id, line });
        let pool = CandidatePool::from_stacks(vec![
            (5, vec![edit(1, 5), edit(2, 5)]),
            (9, vec![edit(3, 9)]),
        ]);
        let run = SearchRun::new(&search, pool, StdRng::seed_from_u64(0));

        let id = |candidate: Option<Candidate<Edit>>| candidate.map(|c| c.transformations()[0].id);
        assert_eq!(id(run.next()), Some(2));
        assert_eq!(id(run.next()), Some(1));
        assert_eq!(id(run.next()), Some(3));
        assert!(!run.halted.load(Ordering::Acquire));

        assert_eq!(id(run.next()), None);
        assert!(run.halted.load(Ordering::Acquire));
        assert_eq!(run.lock().stop_reason, Some(StopReason::Exhausted));
        assert_eq!(id(run.next()), None);
    }

    #[test]
    fn test_exhaustion_without_repair() {
        let (search, record) = mock_search(
            Behaviour::default(),
            MockProblem::new(&[1, 1, 2, 3], &["t1"]),
            1,
            true,
            None,
        );

        let report = search.run(Some(3)).unwrap();

        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert!(!report.found_repair());
        assert_eq!(report.stats.candidates_evaluated, 4);
        assert_eq!(record.provisioned(), 4);
        assert_eq!(record.destroyed(), 4);

        let mut applied = record.applied();
        applied.sort_unstable();
        assert_eq!(applied, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_empty_search_space() {
        let (search, record) = mock_search(
            Behaviour::default(),
            MockProblem::new(&[], &["t1"]),
            2,
            true,
            None,
        );

        let report = search.run(None).unwrap();

        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(report.stats.candidates_evaluated, 0);
        assert_eq!(record.provisioned(), 0);
    }

    #[test]
    fn test_terminates_early_on_repair() {
        let behaviour = Behaviour {
            passing: ids(&[2]),
            ..Default::default()
        };
        let (search, record) = mock_search(
            behaviour,
            MockProblem::new(&[1, 2, 3, 4, 5, 6], &["t1", "t2"]),
            1,
            true,
            None,
        );

        let report = search.run(Some(11)).unwrap();

        assert_eq!(report.stop_reason, StopReason::RepairFound);
        assert_eq!(report.repairs.len(), 1);
        let repair = report.first_repair().unwrap();
        assert_eq!(repair.candidate.transformations()[0].id, 2);
        assert_eq!(repair.patch.as_str(), "2");
        assert!(repair.found_after <= Duration::from_secs_f64(report.stats.elapsed_seconds));

        assert_eq!(*record.applied().last().unwrap(), 2);
        assert_eq!(record.provisioned(), record.destroyed());
    }

    #[test]
    fn test_early_termination_with_many_workers() {
        let behaviour = Behaviour {
            passing: (0..16).collect(),
            ..Default::default()
        };
        let (search, record) = mock_search(
            behaviour,
            MockProblem::new(&[1; 16], &["t1"]),
            2,
            true,
            None,
        );

        let report = search.run(None).unwrap();

        assert_eq!(report.stop_reason, StopReason::RepairFound);
        assert!(!report.repairs.is_empty());
        assert!(report.repairs.len() <= 2);
        assert_eq!(report.repairs.len() as u64, report.stats.candidates_evaluated);
        assert_eq!(record.provisioned(), record.destroyed());
    }

    #[test]
    fn test_collects_all_repairs_without_early_termination() {
        let behaviour = Behaviour {
            passing: ids(&[3, 17]),
            ..Default::default()
        };
        let lines: Vec<u32> = (0..20).map(|i| i % 6).collect();
        let (search, record) = mock_search(
            behaviour,
            MockProblem::new(&lines, &["t1", "t2"]),
            4,
            false,
            None,
        );

        let report = search.run(Some(5)).unwrap();

        assert_eq!(report.stop_reason, StopReason::Exhausted);
        let found: HashSet<usize> = report
            .repairs
            .iter()
            .map(|r| r.candidate.transformations()[0].id)
            .collect();
        assert_eq!(found, ids(&[3, 17]));
        assert_eq!(report.stats.candidates_evaluated, 20);
        assert_eq!(record.provisioned(), 20);
        assert_eq!(record.destroyed(), 20);
    }

    #[test]
    fn test_first_failing_test_short_circuits() {
        let (search, record) = mock_search(
            Behaviour::default(),
            MockProblem::new(&[1, 2, 3, 4], &["t1", "t2", "t3"]),
            2,
            true,
            None,
        );

        let report = search.run(None).unwrap();

        assert_eq!(report.stats.tests_executed, 4);
        assert!(record.executed().iter().all(|(_, test)| test == "t1"));
    }

    #[test]
    fn test_compile_failure_skips_tests() {
        let behaviour = Behaviour {
            broken_builds: ids(&[0, 1]),
            ..Default::default()
        };
        let counts = Arc::new(Counts::default());
        let (search, record) = mock_search(
            behaviour,
            MockProblem::new(&[1, 2, 3], &["t1"]),
            1,
            true,
            None,
        );
        let search = search.with_observer(CountingObserver(Arc::clone(&counts)));

        let report = search.run(None).unwrap();

        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(record.executed(), vec![(2, "t1".to_string())]);

        let rejected = counts.rejected.lock().unwrap().clone();
        assert_eq!(rejected.len(), 3);
        assert_eq!(
            rejected
                .iter()
                .filter(|r| **r == Rejection::CompileFailed)
                .count(),
            2
        );
        assert!(rejected.contains(&Rejection::TestFailed {
            test: "t1".to_string()
        }));
        assert_eq!(counts.evaluated.load(Ordering::SeqCst), 3);
        assert_eq!(*counts.halts.lock().unwrap(), vec![StopReason::Exhausted]);
    }

    #[test]
    fn test_environment_error_halts_and_releases() {
        let behaviour = Behaviour {
            unappliable: (0..5).collect(),
            ..Default::default()
        };
        let counts = Arc::new(Counts::default());
        let (search, record) = mock_search(
            behaviour,
            MockProblem::new(&[1, 2, 3, 4, 5], &["t1"]),
            1,
            true,
            None,
        );
        let search = search.with_observer(CountingObserver(Arc::clone(&counts)));

        let report = search.run(None).unwrap();

        assert!(matches!(report.stop_reason, StopReason::Error(_)));
        assert_eq!(report.stats.candidates_evaluated, 1);
        assert_eq!(record.provisioned(), 1);
        assert_eq!(record.destroyed(), 1);
        assert_eq!(counts.errors.load(Ordering::SeqCst), 1);
        assert_eq!(counts.halts.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_time_limit_stops_dispensing() {
        let behaviour = Behaviour {
            compile_delay: Duration::from_millis(20),
            ..Default::default()
        };
        let lines: Vec<u32> = (0..50).collect();
        let (search, record) = mock_search(
            behaviour,
            MockProblem::new(&lines, &["t1"]),
            1,
            true,
            Some(Duration::from_millis(30)),
        );

        let report = search.run(None).unwrap();

        assert_eq!(report.stop_reason, StopReason::TimeLimit);
        assert!(report.stats.candidates_evaluated < 50);
        assert_eq!(record.provisioned(), record.destroyed());
    }

    #[test]
    fn test_seeded_runs_are_reproducible() {
        let lines: Vec<u32> = (0..12).map(|i| i % 4).collect();
        let order = |seed| {
            let (search, record) = mock_search(
                Behaviour::default(),
                MockProblem::new(&lines, &["t1"]),
                1,
                true,
                None,
            );
            search.run(Some(seed)).unwrap();
            record.applied()
        };

        assert_eq!(order(21), order(21));
        assert_eq!(order(21).len(), 12);
    }

    #[test]
    fn test_from_config() {
        let record = Arc::new(Record::default());
        let provider = MockProvider {
            behaviour: Arc::new(Behaviour::default()),
            record,
        };
        let config = SearchConfig {
            threads: 3,
            terminate_early: false,
            time_limit: Some(60),
            seed: None,
        };

        let search =
            RandomSearch::from_config(provider, MockProblem::new(&[1], &["t"]), &config).unwrap();
        assert_eq!(search.num_threads(), 3);
        assert!(!search.terminate_early());
        assert_eq!(search.time_limit(), Some(Duration::from_secs(60)));
    }
}

use super::cancel::CancellationToken;
use super::config::DeParameter;
use super::error::EngineError;
use super::evolution::{EvolutionOutcome, evolve};
use super::genes::Individual;
use super::problem::FitProblem;
use super::progress::{Progress, ProgressCallback, ProgressReporter};
use super::state::EngineState;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::debug;

#[derive(Default)]
struct Shared {
    state: Mutex<EngineState>,
    best: Mutex<Option<Individual>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Runs one differential-evolution fit on a background thread.
pub struct FitWorker {
    handle: Option<JoinHandle<Result<EvolutionOutcome, EngineError>>>,
    cancel: CancellationToken,
    shared: Arc<Shared>,
    problem: Arc<FitProblem>,
}

impl FitWorker {
    pub fn start(
        problem: FitProblem,
        params: DeParameter,
        callback: Option<ProgressCallback<'static>>,
    ) -> Result<Self, EngineError> {
        params.validate()?;
        problem.gene_space().ensure_searchable()?;

        let problem = Arc::new(problem);
        let cancel = CancellationToken::new();
        let shared = Arc::new(Shared::default());

        let thread_problem = Arc::clone(&problem);
        let thread_cancel = cancel.clone();
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("ibafit-de".into())
            .spawn(move || {
                let observer = Arc::clone(&thread_shared);
                let reporter = ProgressReporter::with_callback(Box::new(move |event| {
                    match &event {
                        Progress::StateChanged(state) => *lock(&observer.state) = *state,
                        Progress::Generation(report) => {
                            *lock(&observer.best) = Some(report.best.clone())
                        }
                        _ => {}
                    }
                    if let Some(cb) = &callback {
                        cb(event);
                    }
                }));
                evolve(&thread_problem, &params, &thread_cancel, &reporter)
            })
            .map_err(|e| EngineError::Initialization(format!("cannot spawn fit worker: {e}")))?;
        debug!("Fit worker started.");

        Ok(Self {
            handle: Some(handle),
            cancel,
            shared,
            problem,
        })
    }

    /// Asks the worker to stop at the next generation boundary.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().is_none_or(JoinHandle::is_finished)
    }

    pub fn state(&self) -> EngineState {
        *lock(&self.shared.state)
    }

    /// Best Individual found so far, if the initial population has been evaluated.
    pub fn best(&self) -> Option<Individual> {
        lock(&self.shared.best).clone()
    }

    pub fn problem(&self) -> Arc<FitProblem> {
        Arc::clone(&self.problem)
    }

    /// Blocks until the run ends and returns its outcome.
    pub fn wait(mut self) -> Result<EvolutionOutcome, EngineError> {
        let handle = self
            .handle
            .take()
            .ok_or_else(|| EngineError::Internal("fit worker already joined".into()))?;
        let result = handle.join().map_err(|payload| {
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".into());
            EngineError::WorkerPanicked(message)
        })?;
        *lock(&self.shared.state) = EngineState::Idle;
        result
    }
}

impl Drop for FitWorker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.cancel.cancel();
            let _ = handle.join();
        }
    }
}

//! Test doubles shared by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Semaphore;
use ulid::Ulid;

use crate::domain::{ExecutionError, TaskId, TaskResult, TaskSpec, WorkflowResponse};
use crate::ports::{
    AuditError, AuditEvent, AuditEventDescriptor, Auditor, BrokerError, TaskBroker, TaskContext,
    WorkflowRunner,
};
use crate::queue::InMemoryTaskBroker;

/// Poll a condition (which may `.await`) until it holds; panic after 5s.
macro_rules! eventually {
    ($cond:expr) => {{
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
        loop {
            if $cond {
                break;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "condition not met in time: {}",
                stringify!($cond)
            );
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
    }};
}
pub(crate) use eventually;

/// Shared log of `complete` calls.
#[derive(Clone, Default)]
pub struct Completions(Arc<Mutex<Vec<(TaskId, TaskResult)>>>);

impl Completions {
    pub fn results(&self) -> Vec<(TaskId, TaskResult)> {
        self.0.lock().unwrap().clone()
    }
}

/// Order in which completions and audit finalizations happened.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<&'static str>>>);

impl Journal {
    pub fn entries(&self) -> Vec<&'static str> {
        self.0.lock().unwrap().clone()
    }

    fn push(journal: Option<&Journal>, entry: &'static str) {
        if let Some(journal) = journal {
            journal.0.lock().unwrap().push(entry);
        }
    }
}

/// A claimed task that records its completion.
pub struct TestTask {
    task_id: TaskId,
    spec: TaskSpec,
    completions: Completions,
    journal: Option<Journal>,
    superseded: bool,
}

impl TestTask {
    pub fn new(spec: TaskSpec) -> (Self, Completions) {
        let completions = Completions::default();
        (Self::with_log(spec, completions.clone()), completions)
    }

    pub fn with_log(spec: TaskSpec, completions: Completions) -> Self {
        Self {
            task_id: TaskId::from_ulid(Ulid::new()),
            spec,
            completions,
            journal: None,
            superseded: false,
        }
    }

    pub fn journaled(mut self, journal: &Journal) -> Self {
        self.journal = Some(journal.clone());
        self
    }

    /// `complete` fails with `StaleClaim`, as if recovery handed the task to someone else.
    pub fn superseded(mut self) -> Self {
        self.superseded = true;
        self
    }
}

#[async_trait]
impl TaskContext for TestTask {
    fn task_id(&self) -> TaskId {
        self.task_id
    }

    fn created_by(&self) -> Option<&str> {
        Some("user:default/tester")
    }

    fn spec(&self) -> &TaskSpec {
        &self.spec
    }

    async fn complete(self: Box<Self>, result: TaskResult) -> Result<(), BrokerError> {
        Journal::push(self.journal.as_ref(), "complete");
        if self.superseded {
            return Err(BrokerError::StaleClaim(self.task_id));
        }
        self.completions.0.lock().unwrap().push((self.task_id, result));
        Ok(())
    }
}

/// Runner driven by the task parameters:
/// `{"output": v}` succeeds with `v`, `{"fail": {"name", "message"}}` errors,
/// `{"panic": msg}` panics. With `holding`, every execution waits for a
/// permit on the returned semaphore before finishing.
#[derive(Default)]
pub struct ScriptedRunner {
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    hold: Option<Arc<Semaphore>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn holding() -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        let runner = Self {
            hold: Some(Arc::clone(&gate)),
            ..Self::default()
        };
        (runner, gate)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn running(&self) -> usize {
        self.running.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkflowRunner for ScriptedRunner {
    async fn execute(&self, task: &dyn TaskContext) -> Result<WorkflowResponse, ExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if let Some(hold) = &self.hold {
            hold.acquire().await.expect("hold semaphore closed").forget();
        }
        self.running.fetch_sub(1, Ordering::SeqCst);

        let params = &task.spec().parameters;
        if let Some(msg) = params.get("panic").and_then(|v| v.as_str()) {
            panic!("{}", msg.to_string());
        }
        if let Some(fail) = params.get("fail") {
            let name = fail["name"].as_str().unwrap_or("Error");
            let message = fail["message"].as_str().unwrap_or("");
            return Err(ExecutionError::new(name, message));
        }
        let output = params.get("output").cloned().unwrap_or_default();
        Ok(WorkflowResponse::new(output))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditOutcome {
    Success,
    Fail(String),
}

/// Auditor that keeps every descriptor and finalization.
#[derive(Default)]
pub struct RecordingAuditor {
    failing: bool,
    descriptors: Mutex<Vec<AuditEventDescriptor>>,
    outcomes: Arc<Mutex<Vec<AuditOutcome>>>,
    journal: Option<Journal>,
}

impl RecordingAuditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Auditor whose `create_event` always errors.
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn journaled(journal: &Journal) -> Self {
        Self {
            journal: Some(journal.clone()),
            ..Self::default()
        }
    }

    pub fn descriptors(&self) -> Vec<AuditEventDescriptor> {
        self.descriptors.lock().unwrap().clone()
    }

    pub fn outcomes(&self) -> Vec<AuditOutcome> {
        self.outcomes.lock().unwrap().clone()
    }
}

struct RecordedEvent {
    outcomes: Arc<Mutex<Vec<AuditOutcome>>>,
    journal: Option<Journal>,
}

#[async_trait]
impl AuditEvent for RecordedEvent {
    async fn success(self: Box<Self>) -> Result<(), AuditError> {
        Journal::push(self.journal.as_ref(), "audit success");
        self.outcomes.lock().unwrap().push(AuditOutcome::Success);
        Ok(())
    }

    async fn fail(self: Box<Self>, error: &ExecutionError) -> Result<(), AuditError> {
        Journal::push(self.journal.as_ref(), "audit fail");
        self.outcomes
            .lock()
            .unwrap()
            .push(AuditOutcome::Fail(error.to_string()));
        Ok(())
    }
}

#[async_trait]
impl Auditor for RecordingAuditor {
    async fn create_event(
        &self,
        descriptor: AuditEventDescriptor,
    ) -> Result<Box<dyn AuditEvent>, AuditError> {
        if self.failing {
            return Err(AuditError::Unavailable("test auditor".to_string()));
        }
        self.descriptors.lock().unwrap().push(descriptor);
        Ok(Box::new(RecordedEvent {
            outcomes: Arc::clone(&self.outcomes),
            journal: self.journal.clone(),
        }))
    }
}

/// In-memory broker whose first `claim_failures` claims error and whose
/// recovery always errors.
pub struct FlakyBroker {
    inner: InMemoryTaskBroker,
    claim_failures: AtomicUsize,
    recover_calls: AtomicUsize,
    recovery: bool,
}

impl FlakyBroker {
    pub fn new(claim_failures: usize) -> Self {
        Self {
            inner: InMemoryTaskBroker::new(),
            claim_failures: AtomicUsize::new(claim_failures),
            recover_calls: AtomicUsize::new(0),
            recovery: true,
        }
    }

    pub fn without_recovery(mut self) -> Self {
        self.recovery = false;
        self
    }

    pub fn inner(&self) -> &InMemoryTaskBroker {
        &self.inner
    }

    pub fn recover_calls(&self) -> usize {
        self.recover_calls.load(Ordering::SeqCst)
    }

    pub fn claim_failures_left(&self) -> usize {
        self.claim_failures.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TaskBroker for FlakyBroker {
    async fn claim(&self) -> Result<Box<dyn TaskContext>, BrokerError> {
        let failed = self
            .claim_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(BrokerError::Unavailable("connection reset".to_string()));
        }
        self.inner.claim().await
    }

    fn supports_recovery(&self) -> bool {
        self.recovery
    }

    async fn recover_tasks(&self) -> Result<(), BrokerError> {
        self.recover_calls.fetch_add(1, Ordering::SeqCst);
        Err(BrokerError::Other("recovery exploded".to_string()))
    }
}

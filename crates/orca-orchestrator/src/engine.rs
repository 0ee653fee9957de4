use crate::capability::AgentCapability;
use crate::config::OrchestratorConfig;
use crate::payload::TaskOutput;
use crate::registry::{AgentDescriptor, AgentRegistry};
use crate::task_queue::{QueueSnapshot, QueuedTask, TaskQueue};
use crate::types::{TaskError, TaskRecord, TaskStatus};
use chrono::{DateTime, Utc};
use orca_core::{OrcaError, OrcaResult, TaskErrorKind};
use orca_history::{ExecutionLogStore, ExecutionRecord};
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Everything the dispatch loop mutates, guarded by one lock.
struct DispatchState {
    tasks: HashMap<Uuid, TaskRecord>,
    queue: TaskQueue,
    registry: AgentRegistry,
    capabilities: HashMap<String, Arc<dyn AgentCapability>>,
}

/// A task claimed for execution, ready to be spawned outside the lock.
struct Launch {
    task: TaskRecord,
    agent: String,
    capability: Arc<dyn AgentCapability>,
}

/// Result of claiming a dequeued task.
enum Claim {
    Launch(Launch),
    /// The task failed before reaching an agent; only history remains to be written.
    Rejected { task: TaskRecord, agent: String },
}

/// How an invocation ended, before it is applied to the task record.
enum Outcome {
    Output(TaskOutput),
    Failed { error: TaskError, connectivity: bool },
}

struct Shared {
    state: Mutex<DispatchState>,
    history: Arc<dyn ExecutionLogStore>,
    config: OrchestratorConfig,
    runtime: Handle,
    /// Dispatched invocations whose history record is not written yet.
    in_flight: AtomicUsize,
    finished: Notify,
}

/// Bounded-concurrency dispatcher between the task queue and the agent registry.
///
/// Enqueue, dequeue and every status transition happen under a single
/// critical section, so the running count never exceeds
/// `max_concurrent` and a task is claimed by exactly one dispatch. Agent
/// capabilities run as Tokio tasks outside the lock. Cloning is cheap and
/// yields a handle to the same orchestrator.
#[derive(Clone)]
pub struct Orchestrator {
    shared: Arc<Shared>,
}

impl Orchestrator {
    /// Create an orchestrator bound to the current Tokio runtime.
    pub fn new(config: OrchestratorConfig, history: Arc<dyn ExecutionLogStore>) -> OrcaResult<Self> {
        config.validate()?;
        let runtime = Handle::try_current().map_err(|e| {
            OrcaError::Config(format!("orchestrator requires a Tokio runtime: {e}"))
        })?;

        Ok(Self {
            shared: Arc::new(Shared {
                state: Mutex::new(DispatchState {
                    tasks: HashMap::new(),
                    queue: TaskQueue::new(),
                    registry: AgentRegistry::new(config.failure_threshold)
                        .with_recovery_timeout(config.recovery_timeout()),
                    capabilities: HashMap::new(),
                }),
                history,
                config,
                runtime,
                in_flight: AtomicUsize::new(0),
                finished: Notify::new(),
            }),
        })
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.shared.config
    }

    /// Register (or replace) an agent together with the capability that serves it.
    pub fn register_agent(&self, descriptor: AgentDescriptor, capability: Arc<dyn AgentCapability>) {
        {
            let mut state = self.shared.state.lock();
            state
                .capabilities
                .insert(descriptor.name.clone(), capability);
            state.registry.register(descriptor);
        }
        self.pump();
    }

    /// Accept a queued task and trigger dispatch.
    pub fn submit(&self, task: TaskRecord) -> OrcaResult<Uuid> {
        let id = task.id;
        {
            let mut state = self.shared.state.lock();
            if let Some(cap) = self.shared.config.max_queue_length {
                if state.queue.len() >= cap {
                    warn!(queued = state.queue.len(), cap, "Rejecting task: queue is full");
                    return Err(OrcaError::CapacityExhausted(format!(
                        "{} tasks queued (cap {cap})",
                        state.queue.len()
                    )));
                }
            }
            state.queue.enqueue(&task)?;
            info!(
                task_id = %id,
                task_type = %task.task_type,
                priority = %task.priority,
                requested_by = %task.requested_by,
                "Task queued"
            );
            state.tasks.insert(id, task);
        }
        self.pump();
        Ok(id)
    }

    pub fn task(&self, id: Uuid) -> Option<TaskRecord> {
        self.shared.state.lock().tasks.get(&id).cloned()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        self.shared.state.lock().queue.snapshot()
    }

    pub fn running_count(&self) -> usize {
        self.shared.state.lock().queue.running_count()
    }

    /// `{name → active}` projection of the registry.
    pub fn agent_status(&self) -> BTreeMap<String, bool> {
        self.shared.state.lock().registry.status()
    }

    pub fn agents(&self) -> Vec<AgentDescriptor> {
        self.shared.state.lock().registry.descriptors()
    }

    /// Queue snapshot and agent roster read under one lock.
    pub fn observe(&self) -> (QueueSnapshot, Vec<AgentDescriptor>) {
        let state = self.shared.state.lock();
        (state.queue.snapshot(), state.registry.descriptors())
    }

    /// Mark an agent live again and dispatch anything it unblocks.
    pub fn mark_agent_active(&self, name: &str) -> bool {
        let found = self.shared.state.lock().registry.mark_active(name);
        if found {
            info!(agent = %name, "Agent marked active");
            self.pump();
        }
        found
    }

    pub fn mark_agent_inactive(&self, name: &str) -> bool {
        let found = self.shared.state.lock().registry.mark_inactive(name);
        if found {
            info!(agent = %name, "Agent marked inactive");
        }
        found
    }

    /// Cancel a task that has not been dispatched yet.
    ///
    /// Returns `Ok(None)` for unknown ids and `InvalidState` once the task
    /// is running or terminal.
    pub fn cancel(&self, id: Uuid) -> OrcaResult<Option<TaskRecord>> {
        let cancelled = {
            let mut state = self.shared.state.lock();
            let Some(task) = state.tasks.get_mut(&id) else {
                return Ok(None);
            };
            task.cancel()?;
            let record = task.clone();
            state.queue.remove(id);
            record
        };
        info!(task_id = %id, "Task cancelled");
        self.shared.finished.notify_waiters();
        Ok(Some(cancelled))
    }

    /// Drop terminal records that finished before `before`. Returns how many were removed.
    pub fn prune_terminal(&self, before: DateTime<Utc>) -> usize {
        let mut state = self.shared.state.lock();
        let initial = state.tasks.len();
        state.tasks.retain(|_, task| {
            !(task.is_terminal() && task.completed_at.is_some_and(|at| at < before))
        });
        let removed = initial - state.tasks.len();
        if removed > 0 {
            debug!(removed, "Pruned terminal task records");
        }
        removed
    }

    /// Resolve once the task is terminal. `None` if the id is unknown.
    pub async fn wait_for_terminal(&self, id: Uuid) -> Option<TaskRecord> {
        loop {
            let notified = self.shared.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.task(id) {
                None => return None,
                Some(task) if task.is_terminal() => return Some(task),
                Some(_) => {}
            }
            notified.await;
        }
    }

    /// Resolve once every dispatched invocation has finished and been recorded.
    pub async fn wait_for_in_flight(&self) {
        loop {
            let notified = self.shared.finished.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.shared.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Dispatch while there is capacity and an eligible task.
    fn pump(&self) {
        let claims = {
            let mut state = self.shared.state.lock();
            let mut claims = Vec::new();
            while state.queue.running_count() < self.shared.config.max_concurrent {
                let DispatchState {
                    queue, registry, ..
                } = &mut *state;
                let Some(next) = queue.dequeue_next(|t| registry.has_capable(t.task_type)) else {
                    break;
                };
                if let Some(claim) = state.claim(next) {
                    claims.push(claim);
                }
            }
            claims
        };

        self.shared
            .in_flight
            .fetch_add(claims.len(), Ordering::SeqCst);
        for claim in claims {
            let orchestrator = self.clone();
            match claim {
                Claim::Launch(launch) => {
                    self.shared
                        .runtime
                        .spawn(async move { orchestrator.run(launch).await });
                }
                Claim::Rejected { task, agent } => {
                    self.shared.runtime.spawn(async move {
                        orchestrator.record_history(&task, &agent, 0).await;
                        orchestrator.settle_in_flight();
                    });
                }
            }
        }
    }

    fn settle_in_flight(&self) {
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.shared.finished.notify_waiters();
    }

    /// Wait out the cool-down, then put recovered agents back in rotation.
    fn schedule_recovery(&self) {
        let Some(timeout) = self.shared.config.recovery_timeout() else {
            return;
        };
        let orchestrator = self.clone();
        self.shared.runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            let recovered = orchestrator
                .shared
                .state
                .lock()
                .registry
                .recover_due(Utc::now());
            if !recovered.is_empty() {
                orchestrator.pump();
            }
        });
    }

    async fn run(&self, launch: Launch) {
        let Launch {
            task,
            agent,
            capability,
        } = launch;
        let id = task.id;
        let started = Instant::now();

        let invocation_task = task.clone();
        let mut call = self
            .shared
            .runtime
            .spawn(async move { capability.invoke(&invocation_task).await });

        let joined = match self.shared.config.invocation_timeout() {
            Some(limit) => match tokio::time::timeout(limit, &mut call).await {
                Ok(joined) => Some(joined),
                Err(_) => {
                    call.abort();
                    None
                }
            },
            None => Some(call.await),
        };

        let outcome = match joined {
            Some(Ok(Ok(output))) => Outcome::Output(output),
            Some(Ok(Err(e))) => Outcome::Failed {
                error: TaskError::new(
                    if matches!(e, OrcaError::Timeout(_)) {
                        TaskErrorKind::Timeout
                    } else {
                        TaskErrorKind::AgentInvocation
                    },
                    e.to_string(),
                ),
                connectivity: e.is_connectivity(),
            },
            Some(Err(join_err)) => Outcome::Failed {
                error: TaskError::new(
                    TaskErrorKind::AgentInvocation,
                    format!("agent invocation aborted: {join_err}"),
                ),
                connectivity: false,
            },
            None => Outcome::Failed {
                error: TaskError::new(
                    TaskErrorKind::Timeout,
                    format!(
                        "no result after {}s",
                        self.shared.config.invocation_timeout_secs.unwrap_or_default()
                    ),
                ),
                connectivity: true,
            },
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        let (finished, deactivated) = self.finish(id, &agent, outcome);
        if deactivated {
            self.schedule_recovery();
        }
        self.pump();

        if let Some(record) = finished {
            self.record_history(&record, &agent, duration_ms).await;
        }
        self.settle_in_flight();
    }

    /// Apply the terminal transition and the registry bookkeeping.
    ///
    /// The flag reports whether this failure deactivated the agent.
    fn finish(&self, id: Uuid, agent: &str, outcome: Outcome) -> (Option<TaskRecord>, bool) {
        let mut state = self.shared.state.lock();
        state.queue.finish(id);

        let DispatchState {
            tasks, registry, ..
        } = &mut *state;
        let Some(task) = tasks.get_mut(&id) else {
            error!(task_id = %id, "Finished task has no record");
            return (None, false);
        };

        let mut deactivated = false;
        let applied = match outcome {
            Outcome::Output(output) => task.complete(output),
            Outcome::Failed {
                error,
                connectivity,
            } => {
                deactivated = registry.record_failure(agent, connectivity);
                task.fail(error)
            }
        };
        if let Err(e) = applied {
            error!(task_id = %id, error = %e, "Could not apply terminal transition");
            return (None, deactivated);
        }

        match task.status {
            TaskStatus::Completed => {
                registry.record_success(agent);
                info!(task_id = %id, agent = %agent, "Task completed");
            }
            _ => {
                let reason = task.error.as_ref().map(|e| e.message.as_str()).unwrap_or("");
                warn!(task_id = %id, agent = %agent, error = %reason, "Task failed");
            }
        }
        (Some(task.clone()), deactivated)
    }

    async fn record_history(&self, task: &TaskRecord, agent: &str, duration_ms: u64) {
        let entry = match &task.error {
            None => ExecutionRecord::success(task.id, agent, task.task_type, duration_ms),
            Some(err) => ExecutionRecord::failure(
                task.id,
                agent,
                task.task_type,
                err.kind,
                err.message.clone(),
                duration_ms,
            ),
        };
        if let Err(e) = self.shared.history.append(entry).await {
            warn!(task_id = %task.id, error = %e, "Failed to append execution history");
        }
    }
}

impl DispatchState {
    /// Assign a dequeued task to an agent and move it to `running`.
    fn claim(&mut self, next: QueuedTask) -> Option<Claim> {
        let id = next.id;
        let Some(agent) = self.registry.select_for(next.task_type) else {
            error!(task_id = %id, "Eligible task has no capable agent");
            self.queue.finish(id);
            return None;
        };
        let capability = self.capabilities.get(&agent).cloned();
        let Some(task) = self.tasks.get_mut(&id) else {
            error!(task_id = %id, "Dequeued task has no record");
            self.queue.finish(id);
            return None;
        };
        if let Err(e) = task.start(agent.clone()) {
            error!(task_id = %id, error = %e, "Could not start task");
            self.queue.finish(id);
            return None;
        }

        let Some(capability) = capability else {
            self.queue.finish(id);
            let reason = format!("agent '{agent}' has no capability registered");
            if let Err(e) = task.fail(TaskError::new(TaskErrorKind::AgentInvocation, &reason)) {
                error!(task_id = %id, error = %e, "Could not fail task");
                return None;
            }
            error!(task_id = %id, agent = %agent, "{reason}");
            return Some(Claim::Rejected {
                task: task.clone(),
                agent,
            });
        };

        info!(task_id = %id, agent = %agent, task_type = %next.task_type, "Task dispatched");
        Some(Claim::Launch(Launch {
            task: task.clone(),
            agent,
            capability,
        }))
    }
}

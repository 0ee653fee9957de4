use crate::types::{TaskRecord, TaskStatus};
use chrono::{DateTime, Utc};
use orca_core::{OrcaError, OrcaResult, Priority, TaskType};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// What the queue knows about a task: enough to order and filter it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTask {
    pub id: Uuid,
    pub task_type: TaskType,
    pub priority: Priority,
    pub created_at: DateTime<Utc>,
}

impl From<&TaskRecord> for QueuedTask {
    fn from(task: &TaskRecord) -> Self {
        Self {
            id: task.id,
            task_type: task.task_type,
            priority: task.priority,
            created_at: task.created_at,
        }
    }
}

/// Dispatch order: priority descending, then arrival ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueKey {
    priority: Reverse<Priority>,
    seq: u64,
}

impl Ord for QueueKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.priority
            .cmp(&other.priority)
            .then(self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for QueueKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Aggregate view of the non-terminal tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSnapshot {
    /// Tasks still waiting for dispatch.
    pub queue_length: usize,
    /// Tasks currently running.
    pub active_tasks: usize,
    /// Queued + running tasks per family.
    pub tasks_by_type: BTreeMap<TaskType, usize>,
    /// Queued + running tasks per priority band.
    pub tasks_by_priority: BTreeMap<Priority, usize>,
    /// Queued tasks per family.
    pub backlog_by_type: BTreeMap<TaskType, usize>,
}

/// Priority queue of tasks awaiting dispatch, plus the set of tasks that have
/// been handed out and not yet finished.
///
/// Not synchronised; the orchestrator holds it inside its critical section.
pub struct TaskQueue {
    pending: BTreeMap<QueueKey, QueuedTask>,
    keys: HashMap<Uuid, QueueKey>,
    running: HashMap<Uuid, QueuedTask>,
    next_seq: u64,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            pending: BTreeMap::new(),
            keys: HashMap::new(),
            running: HashMap::new(),
            next_seq: 0,
        }
    }

    /// Add a queued task.
    pub fn enqueue(&mut self, task: &TaskRecord) -> OrcaResult<()> {
        if task.status != TaskStatus::Queued {
            return Err(OrcaError::InvalidState(format!(
                "only queued tasks can be enqueued; task {} is {}",
                task.id, task.status
            )));
        }
        if self.contains(task.id) {
            return Err(OrcaError::InvalidState(format!(
                "task {} is already tracked by the queue",
                task.id
            )));
        }

        let key = QueueKey {
            priority: Reverse(task.priority),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.keys.insert(task.id, key);
        self.pending.insert(key, QueuedTask::from(task));
        Ok(())
    }

    /// Remove and return the highest-ordered task accepted by `eligible`.
    ///
    /// The task moves to the running set until [`TaskQueue::finish`] is called.
    pub fn dequeue_next<F>(&mut self, mut eligible: F) -> Option<QueuedTask>
    where
        F: FnMut(&QueuedTask) -> bool,
    {
        let key = self
            .pending
            .iter()
            .find(|(_, task)| eligible(task))
            .map(|(key, _)| *key)?;
        let task = self.pending.remove(&key)?;
        self.keys.remove(&task.id);
        self.running.insert(task.id, task.clone());
        Some(task)
    }

    /// Drop a task from the running set. Returns false if it was not running.
    pub fn finish(&mut self, id: Uuid) -> bool {
        self.running.remove(&id).is_some()
    }

    /// Remove a task that has not been dispatched yet.
    pub fn remove(&mut self, id: Uuid) -> Option<QueuedTask> {
        let key = self.keys.remove(&id)?;
        self.pending.remove(&key)
    }

    pub fn contains(&self, id: Uuid) -> bool {
        self.keys.contains_key(&id) || self.running.contains_key(&id)
    }

    /// Count of queued tasks.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Count of dispatched, unfinished tasks.
    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let mut snapshot = QueueSnapshot {
            queue_length: self.pending.len(),
            active_tasks: self.running.len(),
            ..QueueSnapshot::default()
        };
        for task in self.pending.values() {
            *snapshot.backlog_by_type.entry(task.task_type).or_default() += 1;
        }
        for task in self.pending.values().chain(self.running.values()) {
            *snapshot.tasks_by_type.entry(task.task_type).or_default() += 1;
            *snapshot.tasks_by_priority.entry(task.priority).or_default() += 1;
        }
        snapshot
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

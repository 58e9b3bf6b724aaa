//! In-memory task registry
//!
//! Holds every submitted task by id plus the set of image/index pairs that
//! were already upscaled. Both live behind one lock and are shared as
//! `Arc<TaskRegistry>` between the submission path, the poller and the
//! deliverer.

use crate::models::{Status, Task};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

/// How long records are kept. `Unbounded` never evicts anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetentionPolicy {
    #[default]
    Unbounded,
    Ttl(Duration),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub tasks_removed: usize,
    pub marks_removed: usize,
}

#[derive(Default)]
struct Inner {
    tasks: HashMap<String, Task>,
    operated: HashMap<String, DateTime<Utc>>,
}

#[derive(Default)]
pub struct TaskRegistry {
    inner: Mutex<Inner>,
    policy: RetentionPolicy,
}

impl TaskRegistry {
    pub fn new(policy: RetentionPolicy) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            policy,
        }
    }

    pub fn policy(&self) -> RetentionPolicy {
        self.policy
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Entries are plain data; a panic elsewhere cannot leave them half-written.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a freshly created task. Returns `false` if the id is taken.
    pub fn register(&self, task: Task) -> bool {
        let mut inner = self.lock();
        if inner.tasks.contains_key(&task.id) {
            warn!("[MJ] task already registered, task_id={}", task.id);
            return false;
        }
        inner.tasks.insert(task.id.clone(), task);
        true
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.lock().tasks.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().tasks.contains_key(id)
    }

    /// Mark a task finished and attach its result. Returns the updated record.
    pub fn complete(
        &self,
        id: &str,
        img_id: Option<String>,
        img_url: Option<String>,
    ) -> Option<Task> {
        let mut inner = self.lock();
        let task = inner.tasks.get_mut(id)?;
        task.status = Status::Finished;
        task.img_id = img_id;
        task.img_url = img_url;
        Some(task.clone())
    }

    /// Claim an image/index pair. Returns `false` if it was already claimed.
    pub fn mark_operated(&self, key: String) -> bool {
        let mut inner = self.lock();
        if inner.operated.contains_key(&key) {
            return false;
        }
        inner.operated.insert(key, Utc::now());
        true
    }

    /// Release a claim whose remote call failed, so the pair can be retried.
    pub fn unmark_operated(&self, key: &str) {
        self.lock().operated.remove(key);
    }

    pub fn is_operated(&self, key: &str) -> bool {
        self.lock().operated.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().tasks.is_empty()
    }

    /// Copy of every record, ordered by creation time.
    pub fn snapshot(&self) -> Vec<Task> {
        let mut tasks: Vec<Task> = self.lock().tasks.values().cloned().collect();
        tasks.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        tasks
    }

    pub fn log_state(&self) {
        for task in self.snapshot() {
            debug!("[MJ] current task: {}", task);
        }
    }

    /// Drop records older than the retention TTL. No-op when unbounded.
    /// Pending tasks are kept regardless of age, their poll job may still
    /// deliver a result.
    pub fn sweep(&self, now: DateTime<Utc>) -> SweepStats {
        let RetentionPolicy::Ttl(ttl) = self.policy else {
            return SweepStats::default();
        };
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return SweepStats::default();
        };
        let cutoff = now - ttl;

        let mut inner = self.lock();
        let tasks_before = inner.tasks.len();
        let marks_before = inner.operated.len();
        inner
            .tasks
            .retain(|_, task| task.status == Status::Pending || task.created_at >= cutoff);
        inner.operated.retain(|_, marked_at| *marked_at >= cutoff);

        let stats = SweepStats {
            tasks_removed: tasks_before - inner.tasks.len(),
            marks_removed: marks_before - inner.operated.len(),
        };
        if stats != SweepStats::default() {
            debug!(
                "[MJ] registry sweep removed {} tasks, {} operation marks",
                stats.tasks_removed, stats.marks_removed
            );
        }
        stats
    }
}

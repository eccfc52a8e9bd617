//! Session create/update/delete on top of the conflict engine.
//!
//! Every write that places a session in a slot runs `check_conflicts` first.
//! Under [`ConflictPolicy::Advisory`] conflicts are logged and the write goes
//! through; under [`ConflictPolicy::Strict`] the write is refused, and the
//! check and the write happen while holding a per-(day, room) lock so two
//! concurrent requests cannot both pass the check. The lock only covers this
//! process.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OwnedMutexGuard;
use uuid::Uuid;

use crate::config::ConflictPolicy;
use crate::conflicts::ConflictEngine;
use crate::error::{Result, ScheduleError};
use crate::models::{
    Candidate, Conflict, CreateSessionReq, ScheduledSession, Session, SessionFilter,
    UpdateSessionReq, Weekday,
};
use crate::store::SessionStore;

type SlotLocks = HashMap<(Weekday, String), Arc<tokio::sync::Mutex<()>>>;

/// Held across check+write. The map entry goes away with the last holder,
/// so the map only ever holds slots that are in use.
struct SlotGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: (Weekday, String),
    locks: Arc<Mutex<SlotLocks>>,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Waiters hold a clone of the Arc, so a count of one means nobody is queued.
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

#[derive(Clone)]
pub struct ScheduleService {
    store: Arc<dyn SessionStore>,
    engine: ConflictEngine,
    policy: ConflictPolicy,
    slot_locks: Arc<Mutex<SlotLocks>>,
}

impl ScheduleService {
    pub fn new(store: Arc<dyn SessionStore>, rooms: Vec<String>, policy: ConflictPolicy) -> Self {
        Self {
            engine: ConflictEngine::new(store.clone(), rooms),
            store,
            policy,
            slot_locks: Arc::default(),
        }
    }

    pub fn engine(&self) -> &ConflictEngine {
        &self.engine
    }

    async fn lock_slot(&self, day: Weekday, room: &str) -> Option<SlotGuard> {
        if self.policy != ConflictPolicy::Strict {
            return None;
        }
        let key = (day, room.to_owned());
        let lock = self
            .slot_locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .clone();
        let guard = lock.lock_owned().await;
        Some(SlotGuard {
            guard: Some(guard),
            key,
            locks: self.slot_locks.clone(),
        })
    }

    fn enforce(&self, candidate: &Candidate, conflicts: &[Conflict]) -> Result<()> {
        if conflicts.is_empty() {
            return Ok(());
        }
        match self.policy {
            ConflictPolicy::Advisory => {
                tracing::warn!(
                    count = conflicts.len(),
                    day = %candidate.day,
                    room = %candidate.room,
                    "writing session despite conflicts"
                );
                Ok(())
            }
            ConflictPolicy::Strict => Err(ScheduleError::Conflict {
                count: conflicts.len(),
            }),
        }
    }

    pub async fn create_session(&self, req: CreateSessionReq) -> Result<ScheduledSession> {
        let candidate = req.candidate();
        candidate.validate()?;
        if !self.store.course_exists(req.course_id).await? {
            return Err(ScheduleError::NotFound(format!("course {}", req.course_id)));
        }

        let _guard = self.lock_slot(candidate.day, &candidate.room).await;
        let conflicts = self.engine.check_conflicts(&candidate, None).await?;
        self.enforce(&candidate, &conflicts)?;
        let session = self.store.insert(&req).await?;

        tracing::info!(id = %session.id, course_id = %session.course_id, "session created");
        Ok(ScheduledSession { session, conflicts })
    }

    pub async fn get_session(&self, id: Uuid) -> Result<Session> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("session {id}")))
    }

    pub async fn list_sessions(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        self.store.list(filter).await
    }

    pub async fn update_session(&self, id: Uuid, patch: UpdateSessionReq) -> Result<ScheduledSession> {
        let existing = self.get_session(id).await?;
        let mut next = existing.clone();

        if let Some(day) = patch.day {
            next.day = day;
        }
        if let Some(start) = patch.start_time {
            next.start_time = start;
        }
        if let Some(end) = patch.end_time {
            next.end_time = end;
        }
        if let Some(room) = &patch.room {
            next.room = room.clone();
        }
        if let Some(building) = &patch.building {
            next.building = building.clone();
        }
        if let Some(session_type) = patch.session_type {
            next.session_type = session_type;
        }
        if let Some(capacity) = patch.capacity {
            next.capacity = Some(capacity);
        }
        if let Some(notes) = &patch.notes {
            next.notes = Some(notes.clone());
        }
        if let Some(status) = patch.status {
            if !existing.status.can_transition_to(status) {
                return Err(ScheduleError::validation(format!(
                    "cannot move session from {} to {}",
                    existing.status, status
                )));
            }
            next.status = status;
        }

        let candidate = Candidate {
            day: next.day,
            start_time: next.start_time,
            end_time: next.end_time,
            room: next.room.clone(),
            building: next.building.clone(),
        };
        candidate.validate()?;

        let (_guard, conflicts) = if patch.moves_slot() {
            let guard = self.lock_slot(candidate.day, &candidate.room).await;
            let conflicts = self.engine.check_conflicts(&candidate, Some(id)).await?;
            self.enforce(&candidate, &conflicts)?;
            (guard, conflicts)
        } else {
            (None, Vec::new())
        };

        let session = self
            .store
            .update(&next)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(format!("session {id}")))?;
        tracing::info!(id = %session.id, "session updated");
        Ok(ScheduledSession { session, conflicts })
    }

    pub async fn delete_session(&self, id: Uuid) -> Result<()> {
        if !self.store.delete(id).await? {
            return Err(ScheduleError::NotFound(format!("session {id}")));
        }
        tracing::info!(%id, "session deleted");
        Ok(())
    }

    /// Creates one at a time, so later items are checked against earlier ones.
    /// Stops at the first failure; items already created stay.
    pub async fn bulk_create(&self, reqs: Vec<CreateSessionReq>) -> Result<Vec<ScheduledSession>> {
        let mut created = Vec::with_capacity(reqs.len());
        for req in reqs {
            created.push(self.create_session(req).await?);
        }
        Ok(created)
    }
}

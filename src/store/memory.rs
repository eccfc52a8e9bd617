use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::error::{Result, ScheduleError};
use crate::models::{CreateSessionReq, Session, SessionFilter, SessionStatus, Weekday};
use crate::store::SessionStore;

/// Insertion-ordered store for tests. `fail` makes every call return a storage error.
#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<Vec<Session>>,
    courses: Mutex<HashMap<Uuid, Option<Uuid>>>,
    fail: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_course(&self, lecturer_id: Option<Uuid>) -> Uuid {
        let id = Uuid::new_v4();
        self.courses.lock().unwrap().insert(id, lecturer_id);
        id
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    fn check(&self) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ScheduleError::Storage(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn matching(&self, pred: impl Fn(&Session) -> bool) -> Vec<Session> {
        self.sessions
            .lock()
            .unwrap()
            .iter()
            .filter(|s| pred(s))
            .cloned()
            .collect()
    }
}

fn in_slot(s: &Session, day: Weekday, room: &str, building: Option<&str>) -> bool {
    s.day == day && s.room == room && building.map_or(true, |b| s.building.as_deref() == Some(b))
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn find(
        &self,
        day: Weekday,
        room: &str,
        building: Option<&str>,
        excluding: Option<Uuid>,
    ) -> Result<Vec<Session>> {
        self.check()?;
        // Yield so a concurrent writer can run between the check and the insert.
        tokio::task::yield_now().await;
        Ok(self.matching(|s| in_slot(s, day, room, building) && Some(s.id) != excluding))
    }

    async fn find_by_room_day(
        &self,
        room: &str,
        building: Option<&str>,
        day: Weekday,
    ) -> Result<Vec<Session>> {
        self.check()?;
        Ok(self.matching(|s| in_slot(s, day, room, building)))
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>> {
        self.check()?;
        Ok(self.matching(|s| s.id == id).into_iter().next())
    }

    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        self.check()?;
        let (limit, offset) = filter.page()?;
        let courses = self.courses.lock().unwrap().clone();
        let mut found = self.matching(|s| {
            filter.course_id.map_or(true, |c| s.course_id == c)
                && filter
                    .lecturer_id
                    .map_or(true, |l| courses.get(&s.course_id) == Some(&Some(l)))
                && filter.day.map_or(true, |d| s.day == d)
                && filter.room.as_ref().map_or(true, |r| &s.room == r)
                && filter
                    .building
                    .as_ref()
                    .map_or(true, |b| s.building.as_ref() == Some(b))
                && filter.session_type.map_or(true, |t| s.session_type == t)
                && filter.status.map_or(true, |st| s.status == st)
        });
        found.sort_by_key(|s| (s.day, s.start_time));
        Ok(found
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn insert(&self, req: &CreateSessionReq) -> Result<Session> {
        self.check()?;
        tokio::task::yield_now().await;
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            course_id: req.course_id,
            day: req.day,
            start_time: req.start_time,
            end_time: req.end_time,
            room: req.room.clone(),
            building: req.building.clone(),
            session_type: req.session_type,
            capacity: req.capacity,
            notes: req.notes.clone(),
            status: SessionStatus::Scheduled,
            created_at: now,
            updated_at: now,
        };
        self.sessions.lock().unwrap().push(session.clone());
        Ok(session)
    }

    async fn update(&self, session: &Session) -> Result<Option<Session>> {
        self.check()?;
        let mut sessions = self.sessions.lock().unwrap();
        let Some(slot) = sessions.iter_mut().find(|s| s.id == session.id) else {
            return Ok(None);
        };
        *slot = Session {
            id: slot.id,
            course_id: slot.course_id,
            created_at: slot.created_at,
            updated_at: Utc::now(),
            ..session.clone()
        };
        Ok(Some(slot.clone()))
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        self.check()?;
        let mut sessions = self.sessions.lock().unwrap();
        let before = sessions.len();
        sessions.retain(|s| s.id != id);
        Ok(sessions.len() != before)
    }

    async fn course_exists(&self, course_id: Uuid) -> Result<bool> {
        self.check()?;
        Ok(self.courses.lock().unwrap().contains_key(&course_id))
    }
}

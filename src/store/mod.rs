//! Session persistence.
//!
//! The conflict engine only needs the two lookups (`find`, `find_by_room_day`);
//! the schedule service uses the rest. Implementations must return rows in a
//! stable order for identical queries, because conflict reports keep store
//! order.

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{CreateSessionReq, Session, SessionFilter, Weekday};

#[cfg(test)]
pub mod memory;
pub mod postgres;

pub use postgres::PgSessionStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Sessions on `day` in `room` (and `building`, when given), minus `excluding`.
    async fn find(
        &self,
        day: Weekday,
        room: &str,
        building: Option<&str>,
        excluding: Option<Uuid>,
    ) -> Result<Vec<Session>>;

    async fn find_by_room_day(
        &self,
        room: &str,
        building: Option<&str>,
        day: Weekday,
    ) -> Result<Vec<Session>>;

    async fn get(&self, id: Uuid) -> Result<Option<Session>>;

    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>>;

    /// Persist a new session; the store assigns id, status and timestamps.
    async fn insert(&self, req: &CreateSessionReq) -> Result<Session>;

    /// Overwrite the mutable fields of an existing session.
    async fn update(&self, session: &Session) -> Result<Option<Session>>;

    async fn delete(&self, id: Uuid) -> Result<bool>;

    async fn course_exists(&self, course_id: Uuid) -> Result<bool>;
}

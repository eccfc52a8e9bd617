//! Room/time conflict detection.
//!
//! The engine holds no state of its own beyond the store handle and the room
//! catalog. Every operation is a read against the store followed by the
//! half-open overlap test from [`TimeRange::overlaps`]; nothing is written and
//! nothing is retried.
//!
//! `get_available_rooms` scans the whole catalog, one store lookup per room,
//! so its cost is O(rooms x sessions-per-room). The catalog is a handful of
//! lecture halls and labs, which keeps that acceptable.

use std::sync::Arc;

use chrono::NaiveTime;
use uuid::Uuid;

use crate::clock::TimeRange;
use crate::error::{Result, ScheduleError};
use crate::models::{
    Candidate, Conflict, ConflictKind, RoomAvailability, Session, Severity, SolutionKind,
    SuggestedSolution, Weekday,
};
use crate::store::SessionStore;

/// Namespace for deterministic solution ids (UUID v5), so repeating a check
/// yields byte-identical reports.
const SOLUTION_NAMESPACE: Uuid = Uuid::from_bytes([
    0x3c, 0x5e, 0x1a, 0x92, 0x4f, 0x0b, 0x4d, 0x7e, 0xa1, 0x66, 0x2b, 0x90, 0xd4, 0x17, 0xc8, 0x05,
]);

#[derive(Clone)]
pub struct ConflictEngine {
    store: Arc<dyn SessionStore>,
    rooms: Arc<[String]>,
}

impl ConflictEngine {
    pub fn new(store: Arc<dyn SessionStore>, rooms: Vec<String>) -> Self {
        Self {
            store,
            rooms: rooms.into(),
        }
    }

    pub fn rooms(&self) -> &[String] {
        &self.rooms
    }

    /// Room conflicts for `candidate`, in the order the store returns them.
    #[tracing::instrument(skip(self, candidate), fields(day = %candidate.day, room = %candidate.room))]
    pub async fn check_conflicts(
        &self,
        candidate: &Candidate,
        exclude_id: Option<Uuid>,
    ) -> Result<Vec<Conflict>> {
        let window = candidate.validate()?;
        let existing = self
            .store
            .find(
                candidate.day,
                &candidate.room,
                candidate.building.as_deref(),
                exclude_id,
            )
            .await?;

        let conflicts: Vec<Conflict> = existing
            .into_iter()
            .filter(|s| Some(s.id) != exclude_id && window.overlaps(&s.range()))
            .map(|s| room_conflict(candidate, s))
            .collect();

        if !conflicts.is_empty() {
            tracing::debug!(count = conflicts.len(), "room conflicts detected");
        }
        Ok(conflicts)
    }

    pub async fn check_room_availability(
        &self,
        room: &str,
        building: Option<&str>,
        day: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Result<RoomAvailability> {
        if room.trim().is_empty() {
            return Err(ScheduleError::validation("room is required"));
        }
        let window = TimeRange::new(start_time, end_time)?;
        let conflicting_sessions: Vec<Session> = self
            .store
            .find_by_room_day(room, building, day)
            .await?
            .into_iter()
            .filter(|s| window.overlaps(&s.range()))
            .collect();

        Ok(RoomAvailability {
            room: room.to_owned(),
            building: building.map(str::to_owned),
            is_available: conflicting_sessions.is_empty(),
            conflicting_sessions,
        })
    }

    /// Catalog rooms with nothing overlapping the window, in catalog order.
    pub async fn get_available_rooms(
        &self,
        day: Weekday,
        start_time: NaiveTime,
        end_time: NaiveTime,
        building: Option<&str>,
    ) -> Result<Vec<String>> {
        TimeRange::new(start_time, end_time)?;
        let mut available = Vec::new();
        for room in self.rooms.iter() {
            let availability = self
                .check_room_availability(room, building, day, start_time, end_time)
                .await?;
            if availability.is_available {
                available.push(room.clone());
            }
        }
        tracing::debug!(%day, free = available.len(), of = self.rooms.len(), "room scan");
        Ok(available)
    }

    /// Checks each candidate against what is already stored. Candidates are
    /// not checked against one another.
    pub async fn bulk_check(&self, candidates: &[Candidate]) -> Result<Vec<Vec<Conflict>>> {
        let mut reports = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            reports.push(self.check_conflicts(candidate, None).await?);
        }
        Ok(reports)
    }
}

fn room_conflict(candidate: &Candidate, existing: Session) -> Conflict {
    let solution = |kind: SolutionKind, description: &str, impact: Severity| {
        let name = format!(
            "{}:{}:{}-{}:{}:{:?}",
            existing.id,
            candidate.day,
            candidate.start_time,
            candidate.end_time,
            candidate.room,
            kind
        );
        SuggestedSolution {
            id: Uuid::new_v5(&SOLUTION_NAMESPACE, name.as_bytes()),
            kind,
            description: description.to_owned(),
            new_room: None,
            new_start_time: None,
            new_end_time: None,
            impact,
        }
    };
    let suggested_solutions = vec![
        solution(SolutionKind::ChangeRoom, "Move to available room", Severity::Low),
        solution(
            SolutionKind::ChangeTime,
            "Reschedule to avoid conflict",
            Severity::Medium,
        ),
    ];

    Conflict {
        kind: ConflictKind::Room,
        severity: Severity::High,
        conflicting_with: vec![existing],
        suggested_solutions,
    }
}

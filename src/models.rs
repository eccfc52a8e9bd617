use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use uuid::Uuid;

use crate::clock::{self, TimeRange};
use crate::error::{Result, ScheduleError};

// Text-backed enums: stored as TEXT columns, sent as the same strings on the wire.
macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            #[allow(dead_code)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ScheduleError;

            fn from_str(s: &str) -> Result<Self> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ScheduleError::validation(format!(
                        concat!("unknown ", stringify!($name), " {:?}"),
                        other
                    ))),
                }
            }
        }
    };
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

text_enum!(Weekday {
    Monday => "Monday",
    Tuesday => "Tuesday",
    Wednesday => "Wednesday",
    Thursday => "Thursday",
    Friday => "Friday",
    Saturday => "Saturday",
    Sunday => "Sunday",
});

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionType {
    Lecture,
    Practical,
    Tutorial,
    Exam,
}

text_enum!(SessionType {
    Lecture => "lecture",
    Practical => "practical",
    Tutorial => "tutorial",
    Exam => "exam",
});

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

text_enum!(SessionStatus {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// scheduled -> in_progress -> completed, or any live state -> cancelled.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        match (self, next) {
            (a, b) if *a == b => true,
            (Scheduled, InProgress) | (InProgress, Completed) => true,
            (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub course_id: Uuid,
    pub day: Weekday,
    #[serde(with = "clock::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "clock::hhmm")]
    pub end_time: NaiveTime,
    pub room: String,
    pub building: Option<String>,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    pub capacity: Option<i32>,
    pub notes: Option<String>,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn range(&self) -> TimeRange {
        TimeRange {
            start: self.start_time,
            end: self.end_time,
        }
    }
}

/// The slot a session would occupy; what the conflict engine looks at.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Candidate {
    pub day: Weekday,
    #[serde(with = "clock::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "clock::hhmm")]
    pub end_time: NaiveTime,
    pub room: String,
    #[serde(default)]
    pub building: Option<String>,
}

impl Candidate {
    pub fn validate(&self) -> Result<TimeRange> {
        if self.room.trim().is_empty() {
            return Err(ScheduleError::validation("room is required"));
        }
        TimeRange::new(self.start_time, self.end_time)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateSessionReq {
    pub course_id: Uuid,
    pub day: Weekday,
    #[serde(with = "clock::hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "clock::hhmm")]
    pub end_time: NaiveTime,
    pub room: String,
    #[serde(default)]
    pub building: Option<String>,
    #[serde(rename = "type")]
    pub session_type: SessionType,
    #[serde(default)]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CreateSessionReq {
    pub fn candidate(&self) -> Candidate {
        Candidate {
            day: self.day,
            start_time: self.start_time,
            end_time: self.end_time,
            room: self.room.clone(),
            building: self.building.clone(),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct UpdateSessionReq {
    #[serde(default)]
    pub day: Option<Weekday>,
    #[serde(default, with = "clock::hhmm::option")]
    pub start_time: Option<NaiveTime>,
    #[serde(default, with = "clock::hhmm::option")]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub room: Option<String>,
    /// Absent leaves the building alone; `null` clears it.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "::serde_with::rust::double_option"
    )]
    pub building: Option<Option<String>>,
    #[serde(default, rename = "type")]
    pub session_type: Option<SessionType>,
    #[serde(default)]
    pub status: Option<SessionStatus>,
    #[serde(default)]
    pub capacity: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl UpdateSessionReq {
    pub fn moves_slot(&self) -> bool {
        self.day.is_some()
            || self.start_time.is_some()
            || self.end_time.is_some()
            || self.room.is_some()
            || self.building.is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ConflictCheckReq {
    #[serde(flatten)]
    pub candidate: Candidate,
    #[serde(default)]
    pub exclude_id: Option<Uuid>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BulkCheckReq {
    pub candidates: Vec<Candidate>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BulkCreateReq {
    pub sessions: Vec<CreateSessionReq>,
}

/// Query-string form; times stay strings until the handler normalizes them.
#[derive(Deserialize, Debug, Clone)]
pub struct RoomAvailabilityQuery {
    pub room: String,
    pub building: Option<String>,
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct AvailableRoomsQuery {
    pub day: Weekday,
    pub start_time: String,
    pub end_time: String,
    pub building: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SessionFilter {
    pub course_id: Option<Uuid>,
    pub lecturer_id: Option<Uuid>,
    pub day: Option<Weekday>,
    pub room: Option<String>,
    pub building: Option<String>,
    #[serde(rename = "type")]
    pub session_type: Option<SessionType>,
    pub status: Option<SessionStatus>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl SessionFilter {
    pub const DEFAULT_LIMIT: i64 = 50;
    pub const MAX_LIMIT: i64 = 100;

    pub fn page(&self) -> Result<(i64, i64)> {
        let limit = self.limit.unwrap_or(Self::DEFAULT_LIMIT);
        let offset = self.offset.unwrap_or(0);
        if !(1..=Self::MAX_LIMIT).contains(&limit) {
            return Err(ScheduleError::validation(format!(
                "limit must be between 1 and {}",
                Self::MAX_LIMIT
            )));
        }
        if offset < 0 {
            return Err(ScheduleError::validation("offset must not be negative"));
        }
        Ok((limit, offset))
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConflictKind {
    Room,
    Lecturer,
    Time,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
    Low,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SolutionKind {
    ChangeRoom,
    ChangeTime,
}

#[skip_serializing_none]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SuggestedSolution {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: SolutionKind,
    pub description: String,
    pub new_room: Option<String>,
    #[serde(default, with = "clock::hhmm::option")]
    pub new_start_time: Option<NaiveTime>,
    #[serde(default, with = "clock::hhmm::option")]
    pub new_end_time: Option<NaiveTime>,
    pub impact: Severity,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Conflict {
    #[serde(rename = "type")]
    pub kind: ConflictKind,
    pub severity: Severity,
    pub conflicting_with: Vec<Session>,
    pub suggested_solutions: Vec<SuggestedSolution>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct RoomAvailability {
    pub room: String,
    pub building: Option<String>,
    pub is_available: bool,
    pub conflicting_sessions: Vec<Session>,
}

/// A stored session plus whatever the advisory check found when it was written.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ScheduledSession {
    #[serde(flatten)]
    pub session: Session,
    pub conflicts: Vec<Conflict>,
}

use http::StatusCode;

pub type Result<T, E = ScheduleError> = std::result::Result<T, E>;

#[derive(thiserror::Error, Debug)]
pub enum ScheduleError {
    #[error("validation error: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(String),
    #[error("session overlaps {count} existing session(s)")]
    Conflict { count: usize },
    #[error("storage error: {0}")]
    Storage(#[from] sqlx::Error),
    #[error("malformed row: {0}")]
    MalformedRow(String),
}

impl ScheduleError {
    pub fn validation<T: Into<String>>(msg: T) -> Self {
        Self::Validation(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Storage(_) | Self::MalformedRow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_variants_to_status_codes() {
        assert_eq!(ScheduleError::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(ScheduleError::NotFound("session".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(ScheduleError::Conflict { count: 2 }.status(), StatusCode::CONFLICT);
        assert_eq!(
            ScheduleError::MalformedRow("day".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn conflict_message_names_count() {
        let e = ScheduleError::Conflict { count: 3 };
        assert_eq!(e.to_string(), "session overlaps 3 existing session(s)");
    }
}

use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use crate::db::Db;
use crate::error::{Result, ScheduleError};
use crate::models::{CreateSessionReq, Session, SessionFilter, SessionStatus, SessionType, Weekday};
use crate::store::SessionStore;

const SESSION_COLUMNS: &str = "id, course_id, day, start_time, end_time, room, building, \
     session_type, capacity, notes, status, created_at, updated_at";

#[derive(sqlx::FromRow, Debug, Clone)]
struct SessionRow {
    id: Uuid,
    course_id: Uuid,
    day: String,
    start_time: NaiveTime,
    end_time: NaiveTime,
    room: String,
    building: Option<String>,
    session_type: String,
    capacity: Option<i32>,
    notes: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = ScheduleError;

    fn try_from(row: SessionRow) -> Result<Self> {
        let malformed = |field: &str, value: &str| {
            ScheduleError::MalformedRow(format!("session {} has {field} {value:?}", row.id))
        };
        Ok(Session {
            id: row.id,
            course_id: row.course_id,
            day: row.day.parse::<Weekday>().map_err(|_| malformed("day", &row.day))?,
            start_time: row.start_time,
            end_time: row.end_time,
            room: row.room.clone(),
            building: row.building.clone(),
            session_type: row
                .session_type
                .parse::<SessionType>()
                .map_err(|_| malformed("type", &row.session_type))?,
            capacity: row.capacity,
            notes: row.notes.clone(),
            status: row.status.parse::<SessionStatus>().map_err(|_| malformed("status", &row.status))?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_sessions(rows: Vec<SessionRow>) -> Result<Vec<Session>> {
    rows.into_iter().map(Session::try_from).collect()
}

#[derive(Clone)]
pub struct PgSessionStore {
    db: Db,
}

impl PgSessionStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    fn weekday_order() -> String {
        let days = Weekday::ALL
            .iter()
            .map(|d| format!("'{d}'"))
            .collect::<Vec<_>>()
            .join(",");
        format!("array_position(ARRAY[{days}]::text[], day)")
    }

    async fn slot_query(
        &self,
        day: Weekday,
        room: &str,
        building: Option<&str>,
        excluding: Option<Uuid>,
    ) -> Result<Vec<Session>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE day = "
        ));
        qb.push_bind(day.as_str()).push(" AND room = ").push_bind(room.to_owned());
        if let Some(building) = building {
            qb.push(" AND building = ").push_bind(building.to_owned());
        }
        if let Some(id) = excluding {
            qb.push(" AND id <> ").push_bind(id);
        }
        qb.push(" ORDER BY start_time, id");

        let rows: Vec<SessionRow> = qb.build_query_as::<SessionRow>().fetch_all(&self.db).await?;
        into_sessions(rows)
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn find(
        &self,
        day: Weekday,
        room: &str,
        building: Option<&str>,
        excluding: Option<Uuid>,
    ) -> Result<Vec<Session>> {
        self.slot_query(day, room, building, excluding).await
    }

    async fn find_by_room_day(
        &self,
        room: &str,
        building: Option<&str>,
        day: Weekday,
    ) -> Result<Vec<Session>> {
        self.slot_query(day, room, building, None).await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = $1");
        let row: Option<SessionRow> = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await?;
        row.map(Session::try_from).transpose()
    }

    async fn list(&self, filter: &SessionFilter) -> Result<Vec<Session>> {
        let (limit, offset) = filter.page()?;
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE TRUE"
        ));
        if let Some(course_id) = filter.course_id {
            qb.push(" AND course_id = ").push_bind(course_id);
        }
        if let Some(lecturer_id) = filter.lecturer_id {
            qb.push(" AND course_id IN (SELECT id FROM courses WHERE lecturer_id = ")
                .push_bind(lecturer_id)
                .push(")");
        }
        if let Some(day) = filter.day {
            qb.push(" AND day = ").push_bind(day.as_str());
        }
        if let Some(room) = &filter.room {
            qb.push(" AND room = ").push_bind(room.clone());
        }
        if let Some(building) = &filter.building {
            qb.push(" AND building = ").push_bind(building.clone());
        }
        if let Some(session_type) = filter.session_type {
            qb.push(" AND session_type = ").push_bind(session_type.as_str());
        }
        if let Some(status) = filter.status {
            qb.push(" AND status = ").push_bind(status.as_str());
        }
        qb.push(format!(" ORDER BY {}, start_time, id", Self::weekday_order()));
        qb.push(" LIMIT ").push_bind(limit);
        qb.push(" OFFSET ").push_bind(offset);

        let rows: Vec<SessionRow> = qb.build_query_as::<SessionRow>().fetch_all(&self.db).await?;
        into_sessions(rows)
    }

    async fn insert(&self, req: &CreateSessionReq) -> Result<Session> {
        let sql = format!(
            r#"
            INSERT INTO sessions
                (id, course_id, day, start_time, end_time, room, building, session_type, capacity, notes, status)
            VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11)
            RETURNING {SESSION_COLUMNS}
            "#
        );
        let row: SessionRow = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(req.course_id)
            .bind(req.day.as_str())
            .bind(req.start_time)
            .bind(req.end_time)
            .bind(&req.room)
            .bind(&req.building)
            .bind(req.session_type.as_str())
            .bind(req.capacity)
            .bind(&req.notes)
            .bind(SessionStatus::Scheduled.as_str())
            .fetch_one(&self.db)
            .await?;
        row.try_into()
    }

    async fn update(&self, session: &Session) -> Result<Option<Session>> {
        let sql = format!(
            r#"
            UPDATE sessions
            SET day=$2, start_time=$3, end_time=$4, room=$5, building=$6,
                session_type=$7, capacity=$8, notes=$9, status=$10, updated_at=now()
            WHERE id=$1
            RETURNING {SESSION_COLUMNS}
            "#
        );
        let row: Option<SessionRow> = sqlx::query_as::<_, SessionRow>(&sql)
            .bind(session.id)
            .bind(session.day.as_str())
            .bind(session.start_time)
            .bind(session.end_time)
            .bind(&session.room)
            .bind(&session.building)
            .bind(session.session_type.as_str())
            .bind(session.capacity)
            .bind(&session.notes)
            .bind(session.status.as_str())
            .fetch_optional(&self.db)
            .await?;
        row.map(Session::try_from).transpose()
    }

    async fn delete(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(done.rows_affected() > 0)
    }

    async fn course_exists(&self, course_id: Uuid) -> Result<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM courses WHERE id = $1)")
                .bind(course_id)
                .fetch_one(&self.db)
                .await?;
        Ok(exists)
    }
}

use std::env;
use std::str::FromStr;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_ROOMS: [&str; 5] = [
    "Amphitheater A",
    "Amphitheater B",
    "Lab A-205",
    "Lab B-205",
    "Room C-301",
];

/// What happens when a create/update overlaps existing sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Log a warning and write anyway.
    #[default]
    Advisory,
    /// Refuse the write; check+insert is serialized per (day, room).
    Strict,
}

impl FromStr for ConflictPolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advisory" => Ok(Self::Advisory),
            "strict" => Ok(Self::Strict),
            other => Err(anyhow!("unknown conflict policy {other:?} (expected advisory|strict)")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub rooms: Vec<String>,
    pub conflict_policy: ConflictPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let database_url = get("DATABASE_URL").context("DATABASE_URL not set")?;
        let port = match get("PORT") {
            Some(raw) => raw.parse::<u16>().with_context(|| format!("invalid PORT {raw:?}"))?,
            None => 8081,
        };
        let rooms = get("ROOM_CATALOG")
            .map(|raw| parse_rooms(&raw))
            .unwrap_or_else(|| DEFAULT_ROOMS.iter().map(|r| r.to_string()).collect());
        if rooms.is_empty() {
            return Err(anyhow!("ROOM_CATALOG lists no rooms"));
        }
        let conflict_policy = get("CONFLICT_POLICY")
            .map(|raw| raw.parse::<ConflictPolicy>())
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            database_url,
            port,
            rooms,
            conflict_policy,
        })
    }
}

fn parse_rooms(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_owned)
        .collect()
}

//! Database row types and write inputs. Row types carry the internal
//! `version` counter; the conversions into `musing-types` models drop it.

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::Row;
use rusqlite::types::Type;
use uuid::Uuid;

use musing_types::models::{Reaction, Thought, User};

pub struct UserRow {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl UserRow {
    pub(crate) const COLUMNS: &'static str = "id, username, email, version, created_at";

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_col(row, 0)?,
            username: row.get(1)?,
            email: row.get(2)?,
            version: row.get(3)?,
            created_at: ts_col(row, 4)?,
        })
    }

    pub fn into_user(self, thoughts: Vec<Uuid>, friends: Vec<Uuid>) -> User {
        User {
            id: self.id,
            username: self.username,
            email: self.email,
            thoughts,
            friends,
        }
    }
}

pub struct ThoughtRow {
    pub id: Uuid,
    pub thought_text: String,
    pub username: String,
    pub version: i64,
    pub created_at: DateTime<Utc>,
}

impl ThoughtRow {
    pub(crate) const COLUMNS: &'static str = "id, thought_text, username, version, created_at";

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: uuid_col(row, 0)?,
            thought_text: row.get(1)?,
            username: row.get(2)?,
            version: row.get(3)?,
            created_at: ts_col(row, 4)?,
        })
    }

    pub fn into_thought(self, reactions: Vec<Reaction>) -> Thought {
        Thought {
            id: self.id,
            thought_text: self.thought_text,
            username: self.username,
            created_at: self.created_at,
            reactions,
        }
    }
}

pub struct ReactionRow {
    pub thought_id: Uuid,
    pub reaction: Reaction,
}

impl ReactionRow {
    pub(crate) const COLUMNS: &'static str =
        "thought_id, reaction_id, reaction_body, username, created_at";

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            thought_id: uuid_col(row, 0)?,
            reaction: Reaction {
                reaction_id: uuid_col(row, 1)?,
                reaction_body: row.get(2)?,
                username: row.get(3)?,
                created_at: ts_col(row, 4)?,
            },
        })
    }
}

// -- Write inputs --

pub struct NewUser {
    pub username: String,
    pub email: String,
}

#[derive(Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
}

pub struct NewThought {
    pub thought_text: String,
    pub username: String,
}

#[derive(Default)]
pub struct ThoughtPatch {
    pub thought_text: Option<String>,
    pub username: Option<String>,
}

pub struct NewReaction {
    pub reaction_id: Option<Uuid>,
    pub reaction_body: String,
    pub username: String,
}

/// How a reference-array mutation locates its user. Thought deletion only
/// knows the author's name, so it goes through `Username`.
#[derive(Debug, Clone)]
pub enum UserKey {
    Id(Uuid),
    Username(String),
}

impl std::fmt::Display for UserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserKey::Id(id) => write!(f, "id {}", id),
            UserKey::Username(name) => write!(f, "username '{}'", name),
        }
    }
}

// -- Column helpers --

pub(crate) fn uuid_col(row: &Row, idx: usize) -> rusqlite::Result<Uuid> {
    let raw: String = row.get(idx)?;
    Uuid::parse_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn ts_col(row: &Row, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn ts_value(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

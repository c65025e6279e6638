use std::collections::HashMap;

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use musing_types::models::{Reaction, Thought};

use crate::models::{NewThought, ReactionRow, ThoughtPatch, ThoughtRow, ts_value};
use crate::{Database, Result, validate};

impl Database {
    /// All thoughts, newest first. Ids are UUID v7, so descending id order
    /// is descending creation order.
    pub fn list_thoughts(&self) -> Result<Vec<Thought>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM thoughts ORDER BY id DESC", ThoughtRow::COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], ThoughtRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            // One pass over reactions instead of a query per thought.
            let sql = format!(
                "SELECT {} FROM reactions ORDER BY thought_id, position",
                ReactionRow::COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut by_thought: HashMap<Uuid, Vec<Reaction>> = HashMap::new();
            for r in stmt.query_map([], ReactionRow::from_row)? {
                let r = r?;
                by_thought.entry(r.thought_id).or_default().push(r.reaction);
            }

            Ok(rows
                .into_iter()
                .map(|row| {
                    let reactions = by_thought.remove(&row.id).unwrap_or_default();
                    row.into_thought(reactions)
                })
                .collect())
        })
    }

    pub fn get_thought(&self, id: Uuid) -> Result<Option<Thought>> {
        self.with_conn(|conn| load_thought(conn, id))
    }

    pub fn create_thought(&self, new: NewThought) -> Result<Thought> {
        let thought_text = validate::text("thoughtText", &new.thought_text)?;
        let username = validate::username(&new.username)?;
        let id = Uuid::now_v7();

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO thoughts (id, thought_text, username, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), &thought_text, &username, ts_value(Utc::now())),
            )?;
            debug!("Created thought {}", id);
            require_thought(tx, id)
        })
    }

    /// Applies only the supplied fields. `None` when the thought is absent.
    pub fn update_thought(&self, id: Uuid, patch: ThoughtPatch) -> Result<Option<Thought>> {
        let thought_text = patch
            .thought_text
            .as_deref()
            .map(|t| validate::text("thoughtText", t))
            .transpose()?;
        let username = patch.username.as_deref().map(validate::username).transpose()?;

        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE thoughts
                 SET thought_text = COALESCE(?2, thought_text),
                     username = COALESCE(?3, username),
                     version = version + 1
                 WHERE id = ?1",
                (id.to_string(), thought_text, username),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            load_thought(tx, id)
        })
    }

    /// Removes the thought together with its reactions and returns the record
    /// as it was, so callers can still read its author.
    pub fn delete_thought(&self, id: Uuid) -> Result<Option<Thought>> {
        self.with_tx(|tx| {
            let Some(thought) = load_thought(tx, id)? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM thoughts WHERE id = ?1", [id.to_string()])?;
            debug!("Deleted thought {}", id);
            Ok(Some(thought))
        })
    }
}

pub(crate) fn load_thought(conn: &Connection, id: Uuid) -> Result<Option<Thought>> {
    let sql = format!("SELECT {} FROM thoughts WHERE id = ?1", ThoughtRow::COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], ThoughtRow::from_row)
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };

    let sql = format!(
        "SELECT {} FROM reactions WHERE thought_id = ?1 ORDER BY position",
        ReactionRow::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let reactions = stmt
        .query_map([id.to_string()], ReactionRow::from_row)?
        .map(|r| r.map(|r| r.reaction))
        .collect::<rusqlite::Result<Vec<_>>>()?;

    Ok(Some(row.into_thought(reactions)))
}

/// For reads right after an insert in the same transaction.
fn require_thought(conn: &Connection, id: Uuid) -> Result<Thought> {
    load_thought(conn, id)?.ok_or(crate::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
}

pub(crate) fn thought_exists(conn: &Connection, id: Uuid) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM thoughts WHERE id = ?1", [id.to_string()], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DbError;

    fn new_thought(text: &str) -> NewThought {
        NewThought {
            thought_text: text.into(),
            username: "ada".into(),
        }
    }

    #[test]
    fn list_is_newest_first() {
        let db = Database::open_in_memory().unwrap();
        let first = db.create_thought(new_thought("one")).unwrap();
        let second = db.create_thought(new_thought("two")).unwrap();
        let third = db.create_thought(new_thought("three")).unwrap();

        let ids: Vec<Uuid> = db.list_thoughts().unwrap().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![third.id, second.id, first.id]);
    }

    #[test]
    fn list_attaches_reactions_to_their_own_thought() {
        let db = Database::open_in_memory().unwrap();
        let a = db.create_thought(new_thought("a")).unwrap();
        let b = db.create_thought(new_thought("b")).unwrap();
        db.add_reaction(
            a.id,
            crate::NewReaction {
                reaction_id: None,
                reaction_body: "on a".into(),
                username: "bob".into(),
            },
        )
        .unwrap();

        let listed = db.list_thoughts().unwrap();
        let listed_a = listed.iter().find(|t| t.id == a.id).unwrap();
        let listed_b = listed.iter().find(|t| t.id == b.id).unwrap();
        assert_eq!(listed_a.reactions.len(), 1);
        assert!(listed_b.reactions.is_empty());
    }

    #[test]
    fn list_empty_store() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.list_thoughts().unwrap().is_empty());
    }

    #[test]
    fn create_then_get() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .create_thought(NewThought {
                thought_text: "hello".into(),
                username: "  ada  ".into(),
            })
            .unwrap();
        assert_eq!(created.username, "ada");
        assert!(created.reactions.is_empty());

        let fetched = db.get_thought(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn get_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_thought(Uuid::now_v7()).unwrap().is_none());
    }

    #[test]
    fn create_rejects_bad_text() {
        let db = Database::open_in_memory().unwrap();
        let err = db.create_thought(new_thought("")).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        let err = db.create_thought(new_thought(&"x".repeat(281))).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
        assert!(db.list_thoughts().unwrap().is_empty());
    }

    #[test]
    fn update_applies_only_supplied_fields() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_thought(new_thought("before")).unwrap();

        let updated = db
            .update_thought(
                created.id,
                ThoughtPatch {
                    thought_text: Some("after".into()),
                    username: None,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.thought_text, "after");
        assert_eq!(updated.username, "ada");
        assert_eq!(updated.created_at, created.created_at);
    }

    #[test]
    fn update_bumps_hidden_version() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_thought(new_thought("v")).unwrap();
        db.update_thought(created.id, ThoughtPatch::default()).unwrap().unwrap();

        let version: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row(
                    "SELECT version FROM thoughts WHERE id = ?1",
                    [created.id.to_string()],
                    |r| r.get(0),
                )?)
            })
            .unwrap();
        assert_eq!(version, 1);
    }

    #[test]
    fn update_missing_is_none() {
        let db = Database::open_in_memory().unwrap();
        let out = db
            .update_thought(Uuid::now_v7(), ThoughtPatch::default())
            .unwrap();
        assert!(out.is_none());
    }

    #[test]
    fn delete_returns_record_and_drops_reactions() {
        let db = Database::open_in_memory().unwrap();
        let created = db.create_thought(new_thought("bye")).unwrap();
        db.add_reaction(
            created.id,
            crate::NewReaction {
                reaction_id: None,
                reaction_body: "wave".into(),
                username: "bob".into(),
            },
        )
        .unwrap();

        let deleted = db.delete_thought(created.id).unwrap().unwrap();
        assert_eq!(deleted.id, created.id);
        assert_eq!(deleted.reactions.len(), 1);
        assert!(db.get_thought(created.id).unwrap().is_none());

        let orphans: i64 = db
            .with_conn(|conn| {
                Ok(conn.query_row("SELECT COUNT(*) FROM reactions", [], |r| r.get(0))?)
            })
            .unwrap();
        assert_eq!(orphans, 0);

        assert!(db.delete_thought(created.id).unwrap().is_none());
    }
}

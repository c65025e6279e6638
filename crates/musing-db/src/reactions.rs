use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use musing_types::models::Thought;

use crate::models::{NewReaction, ts_value};
use crate::thoughts::{load_thought, thought_exists};
use crate::{Database, Result, validate};

impl Database {
    /// Append a reaction to a thought's reaction list and return the whole
    /// updated thought. `None` when the thought does not exist.
    ///
    /// Fields are validated before the thought is looked up. A `reaction_id`
    /// already present on the thought is rejected as a validation failure.
    pub fn add_reaction(&self, thought_id: Uuid, new: NewReaction) -> Result<Option<Thought>> {
        let reaction_body = validate::text("reactionBody", &new.reaction_body)?;
        let username = validate::username(&new.username)?;
        let reaction_id = new.reaction_id.unwrap_or_else(Uuid::now_v7);

        self.with_tx(|tx| {
            if !thought_exists(tx, thought_id)? {
                return Ok(None);
            }

            tx.execute(
                "INSERT INTO reactions (thought_id, reaction_id, reaction_body, username, created_at, position)
                 VALUES (?1, ?2, ?3, ?4, ?5,
                         (SELECT COALESCE(MAX(position), -1) + 1 FROM reactions WHERE thought_id = ?1))",
                (
                    thought_id.to_string(),
                    reaction_id.to_string(),
                    &reaction_body,
                    &username,
                    ts_value(Utc::now()),
                ),
            )?;
            bump_version(tx, thought_id)?;
            debug!("Added reaction {} to thought {}", reaction_id, thought_id);

            load_thought(tx, thought_id)
        })
    }

    /// Remove the reaction with `reaction_id`. An unknown reaction id leaves
    /// the thought untouched and still returns it.
    pub fn remove_reaction(&self, thought_id: Uuid, reaction_id: Uuid) -> Result<Option<Thought>> {
        self.with_tx(|tx| {
            if !thought_exists(tx, thought_id)? {
                return Ok(None);
            }

            let removed = tx.execute(
                "DELETE FROM reactions WHERE thought_id = ?1 AND reaction_id = ?2",
                (thought_id.to_string(), reaction_id.to_string()),
            )?;
            if removed > 0 {
                bump_version(tx, thought_id)?;
                debug!("Removed reaction {} from thought {}", reaction_id, thought_id);
            }

            load_thought(tx, thought_id)
        })
    }
}

fn bump_version(conn: &rusqlite::Connection, thought_id: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE thoughts SET version = version + 1 WHERE id = ?1",
        [thought_id.to_string()],
    )?;
    Ok(())
}

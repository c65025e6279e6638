use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL UNIQUE,
                email       TEXT NOT NULL UNIQUE,
                version     INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL
            );

            CREATE TABLE thoughts (
                id            TEXT PRIMARY KEY,
                thought_text  TEXT NOT NULL,
                username      TEXT NOT NULL,
                version       INTEGER NOT NULL DEFAULT 0,
                created_at    TEXT NOT NULL
            );

            -- Owned by the thought: gone when the thought is.
            CREATE TABLE reactions (
                thought_id     TEXT NOT NULL REFERENCES thoughts(id) ON DELETE CASCADE,
                reaction_id    TEXT NOT NULL,
                reaction_body  TEXT NOT NULL,
                username       TEXT NOT NULL,
                created_at     TEXT NOT NULL,
                position       INTEGER NOT NULL,
                UNIQUE(thought_id, reaction_id)
            );

            CREATE INDEX idx_reactions_thought
                ON reactions(thought_id, position);

            -- Reference arrays. The referenced ids carry no foreign key and
            -- may dangle; only the owning user row cascades.
            CREATE TABLE user_thoughts (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                thought_id  TEXT NOT NULL,
                position    INTEGER NOT NULL,
                UNIQUE(user_id, thought_id)
            );

            CREATE TABLE user_friends (
                user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                friend_id   TEXT NOT NULL,
                position    INTEGER NOT NULL,
                UNIQUE(user_id, friend_id)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

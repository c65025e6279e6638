use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;
use uuid::Uuid;

use musing_types::models::User;

use crate::models::{NewUser, UserKey, UserPatch, UserRow, ts_value, uuid_col};
use crate::{Database, DbError, Result, validate};

impl Database {
    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users ORDER BY id", UserRow::COLUMNS);
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], UserRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            let mut users = Vec::with_capacity(rows.len());
            for row in rows {
                let thoughts = load_refs(conn, RefTable::Thoughts, row.id)?;
                let friends = load_refs(conn, RefTable::Friends, row.id)?;
                users.push(row.into_user(thoughts, friends));
            }
            Ok(users)
        })
    }

    pub fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_conn(|conn| load_user(conn, id))
    }

    /// Username and email uniqueness comes from the table constraints; a
    /// clash surfaces as [`DbError::Validation`].
    pub fn create_user(&self, new: NewUser) -> Result<User> {
        let username = validate::username(&new.username)?;
        let email = validate::email(&new.email)?;
        let id = Uuid::now_v7();

        self.with_tx(|tx| {
            tx.execute(
                "INSERT INTO users (id, username, email, created_at) VALUES (?1, ?2, ?3, ?4)",
                (id.to_string(), &username, &email, ts_value(Utc::now())),
            )?;
            debug!("Created user {} ({})", id, username);
            load_user(tx, id)?.ok_or(DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows))
        })
    }

    /// Renaming a user does not touch the `username` snapshot on thoughts
    /// it has already written.
    pub fn update_user(&self, id: Uuid, patch: UserPatch) -> Result<Option<User>> {
        let username = patch.username.as_deref().map(validate::username).transpose()?;
        let email = patch.email.as_deref().map(validate::email).transpose()?;

        self.with_tx(|tx| {
            let changed = tx.execute(
                "UPDATE users
                 SET username = COALESCE(?2, username),
                     email = COALESCE(?3, email),
                     version = version + 1
                 WHERE id = ?1",
                (id.to_string(), username, email),
            )?;
            if changed == 0 {
                return Ok(None);
            }
            load_user(tx, id)
        })
    }

    /// Deletes the user row and its own reference arrays. Thoughts it wrote
    /// and other users' friend lists are left alone.
    pub fn delete_user(&self, id: Uuid) -> Result<Option<User>> {
        self.with_tx(|tx| {
            let Some(user) = load_user(tx, id)? else {
                return Ok(None);
            };
            tx.execute("DELETE FROM users WHERE id = ?1", [id.to_string()])?;
            debug!("Deleted user {}", id);
            Ok(Some(user))
        })
    }

    /// Add `thought_id` to the end of the user's `thoughts`. Already present
    /// ids are not duplicated. `None` when the user does not exist.
    pub fn append_thought_ref(&self, user_id: Uuid, thought_id: Uuid) -> Result<Option<User>> {
        self.with_tx(|tx| {
            if !user_exists(tx, user_id)? {
                return Ok(None);
            }
            append_ref(tx, RefTable::Thoughts, user_id, thought_id)?;
            load_user(tx, user_id)
        })
    }

    /// Drop `thought_id` from the `thoughts` of the user found by `key`.
    /// Removing an id that is not there leaves the array as it was.
    pub fn remove_thought_ref(&self, key: &UserKey, thought_id: Uuid) -> Result<Option<User>> {
        self.with_tx(|tx| {
            let Some(user_id) = resolve_user(tx, key)? else {
                return Ok(None);
            };
            remove_ref(tx, RefTable::Thoughts, user_id, thought_id)?;
            load_user(tx, user_id)
        })
    }

    /// One-directional: only `user_id`'s list changes. Both users must exist.
    pub fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<Option<User>> {
        if user_id == friend_id {
            return Err(DbError::Validation("a user cannot befriend themselves".into()));
        }

        self.with_tx(|tx| {
            if !user_exists(tx, user_id)? || !user_exists(tx, friend_id)? {
                return Ok(None);
            }
            append_ref(tx, RefTable::Friends, user_id, friend_id)?;
            load_user(tx, user_id)
        })
    }

    pub fn remove_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<Option<User>> {
        self.with_tx(|tx| {
            if !user_exists(tx, user_id)? {
                return Ok(None);
            }
            remove_ref(tx, RefTable::Friends, user_id, friend_id)?;
            load_user(tx, user_id)
        })
    }
}

#[derive(Clone, Copy)]
enum RefTable {
    Thoughts,
    Friends,
}

impl RefTable {
    fn table(self) -> &'static str {
        match self {
            RefTable::Thoughts => "user_thoughts",
            RefTable::Friends => "user_friends",
        }
    }

    fn column(self) -> &'static str {
        match self {
            RefTable::Thoughts => "thought_id",
            RefTable::Friends => "friend_id",
        }
    }
}

fn load_user(conn: &Connection, id: Uuid) -> Result<Option<User>> {
    let sql = format!("SELECT {} FROM users WHERE id = ?1", UserRow::COLUMNS);
    let row = conn
        .query_row(&sql, [id.to_string()], UserRow::from_row)
        .optional()?;

    let Some(row) = row else {
        return Ok(None);
    };
    let thoughts = load_refs(conn, RefTable::Thoughts, id)?;
    let friends = load_refs(conn, RefTable::Friends, id)?;
    Ok(Some(row.into_user(thoughts, friends)))
}

fn load_refs(conn: &Connection, refs: RefTable, user_id: Uuid) -> Result<Vec<Uuid>> {
    let sql = format!(
        "SELECT {} FROM {} WHERE user_id = ?1 ORDER BY position",
        refs.column(),
        refs.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let ids = stmt
        .query_map([user_id.to_string()], |row| uuid_col(row, 0))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(ids)
}

fn append_ref(conn: &Connection, refs: RefTable, user_id: Uuid, target: Uuid) -> Result<()> {
    let sql = format!(
        "INSERT OR IGNORE INTO {table} (user_id, {col}, position)
         VALUES (?1, ?2, (SELECT COALESCE(MAX(position), -1) + 1 FROM {table} WHERE user_id = ?1))",
        table = refs.table(),
        col = refs.column()
    );
    let added = conn.execute(&sql, (user_id.to_string(), target.to_string()))?;
    if added > 0 {
        bump_version(conn, user_id)?;
    } else {
        debug!("{} already in {} of user {}", target, refs.table(), user_id);
    }
    Ok(())
}

fn remove_ref(conn: &Connection, refs: RefTable, user_id: Uuid, target: Uuid) -> Result<()> {
    let sql = format!(
        "DELETE FROM {} WHERE user_id = ?1 AND {} = ?2",
        refs.table(),
        refs.column()
    );
    let removed = conn.execute(&sql, (user_id.to_string(), target.to_string()))?;
    if removed > 0 {
        bump_version(conn, user_id)?;
    }
    Ok(())
}

fn bump_version(conn: &Connection, user_id: Uuid) -> Result<()> {
    conn.execute(
        "UPDATE users SET version = version + 1 WHERE id = ?1",
        [user_id.to_string()],
    )?;
    Ok(())
}

fn user_exists(conn: &Connection, id: Uuid) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id.to_string()], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn resolve_user(conn: &Connection, key: &UserKey) -> Result<Option<Uuid>> {
    let id = match key {
        UserKey::Id(id) => {
            return Ok(user_exists(conn, *id)?.then_some(*id));
        }
        UserKey::Username(name) => conn
            .query_row("SELECT id FROM users WHERE username = ?1", [name], |row| {
                uuid_col(row, 0)
            })
            .optional()?,
    };
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(name: &str) -> NewUser {
        NewUser {
            username: name.into(),
            email: format!("{}@example.com", name),
        }
    }

    #[test]
    fn create_and_get() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(new_user("ada")).unwrap();
        assert_eq!(user.username, "ada");
        assert!(user.thoughts.is_empty());
        assert_eq!(user.friend_count(), 0);

        assert_eq!(db.get_user(user.id).unwrap().unwrap(), user);
        assert!(db.get_user(Uuid::now_v7()).unwrap().is_none());
    }

    #[test]
    fn duplicate_username_or_email_is_validation_failure() {
        let db = Database::open_in_memory().unwrap();
        db.create_user(new_user("ada")).unwrap();

        let err = db
            .create_user(NewUser {
                username: " ada ".into(),
                email: "other@example.com".into(),
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(ref m) if m.contains("username")));

        let err = db
            .create_user(NewUser {
                username: "grace".into(),
                email: "ada@example.com".into(),
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(ref m) if m.contains("email")));

        assert_eq!(db.list_users().unwrap().len(), 1);
    }

    #[test]
    fn invalid_email_rejected() {
        let db = Database::open_in_memory().unwrap();
        let err = db
            .create_user(NewUser {
                username: "ada".into(),
                email: "not-an-email".into(),
            })
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }

    #[test]
    fn update_partial_fields() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(new_user("ada")).unwrap();

        let updated = db
            .update_user(
                user.id,
                UserPatch {
                    username: Some("lovelace".into()),
                    email: None,
                },
            )
            .unwrap()
            .unwrap();
        assert_eq!(updated.username, "lovelace");
        assert_eq!(updated.email, "ada@example.com");

        assert!(db.update_user(Uuid::now_v7(), UserPatch::default()).unwrap().is_none());
    }

    #[test]
    fn append_thought_ref_dedupes() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(new_user("ada")).unwrap();
        let t1 = Uuid::now_v7();
        let t2 = Uuid::now_v7();

        db.append_thought_ref(user.id, t1).unwrap().unwrap();
        db.append_thought_ref(user.id, t2).unwrap().unwrap();
        let after = db.append_thought_ref(user.id, t1).unwrap().unwrap();
        assert_eq!(after.thoughts, vec![t1, t2]);
    }

    #[test]
    fn append_to_missing_user_is_none() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.append_thought_ref(Uuid::now_v7(), Uuid::now_v7()).unwrap().is_none());
    }

    #[test]
    fn remove_thought_ref_by_id_or_username() {
        let db = Database::open_in_memory().unwrap();
        let user = db.create_user(new_user("ada")).unwrap();
        let t1 = Uuid::now_v7();
        let t2 = Uuid::now_v7();
        db.append_thought_ref(user.id, t1).unwrap();
        db.append_thought_ref(user.id, t2).unwrap();

        let after = db
            .remove_thought_ref(&UserKey::Username("ada".into()), t1)
            .unwrap()
            .unwrap();
        assert_eq!(after.thoughts, vec![t2]);

        let after = db.remove_thought_ref(&UserKey::Id(user.id), t2).unwrap().unwrap();
        assert!(after.thoughts.is_empty());

        // Already gone: still fine, still returns the user.
        let after = db.remove_thought_ref(&UserKey::Id(user.id), t2).unwrap().unwrap();
        assert!(after.thoughts.is_empty());

        assert!(
            db.remove_thought_ref(&UserKey::Username("nobody".into()), t1)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn friends_are_one_directional_sets() {
        let db = Database::open_in_memory().unwrap();
        let ada = db.create_user(new_user("ada")).unwrap();
        let bob = db.create_user(new_user("bob")).unwrap();

        db.add_friend(ada.id, bob.id).unwrap().unwrap();
        let ada_now = db.add_friend(ada.id, bob.id).unwrap().unwrap();
        assert_eq!(ada_now.friends, vec![bob.id]);
        assert_eq!(ada_now.friend_count(), 1);

        let bob_now = db.get_user(bob.id).unwrap().unwrap();
        assert!(bob_now.friends.is_empty());

        let ada_now = db.remove_friend(ada.id, bob.id).unwrap().unwrap();
        assert!(ada_now.friends.is_empty());
        let ada_now = db.remove_friend(ada.id, bob.id).unwrap().unwrap();
        assert!(ada_now.friends.is_empty());
    }

    #[test]
    fn add_friend_requires_both_users() {
        let db = Database::open_in_memory().unwrap();
        let ada = db.create_user(new_user("ada")).unwrap();
        assert!(db.add_friend(ada.id, Uuid::now_v7()).unwrap().is_none());
        assert!(db.add_friend(Uuid::now_v7(), ada.id).unwrap().is_none());
        assert!(matches!(
            db.add_friend(ada.id, ada.id),
            Err(DbError::Validation(_))
        ));
    }

    #[test]
    fn delete_user_keeps_dangling_friend_refs() {
        let db = Database::open_in_memory().unwrap();
        let ada = db.create_user(new_user("ada")).unwrap();
        let bob = db.create_user(new_user("bob")).unwrap();
        db.add_friend(ada.id, bob.id).unwrap();

        let deleted = db.delete_user(bob.id).unwrap().unwrap();
        assert_eq!(deleted.id, bob.id);
        assert!(db.get_user(bob.id).unwrap().is_none());
        assert!(db.delete_user(bob.id).unwrap().is_none());

        let ada_now = db.get_user(ada.id).unwrap().unwrap();
        assert_eq!(ada_now.friends, vec![bob.id]);
    }
}

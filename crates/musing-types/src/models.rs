use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user and its reference arrays.
///
/// `thoughts` and `friends` hold ids only. The user does not own the
/// thoughts it points at, and the ids may dangle after a partial failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "UserJson", from = "UserJson")]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub thoughts: Vec<Uuid>,
    pub friends: Vec<Uuid>,
}

impl User {
    /// Derived on read, never stored.
    pub fn friend_count(&self) -> usize {
        self.friends.len()
    }
}

/// Wire form of [`User`], carrying the derived `friendCount`.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UserJson {
    id: Uuid,
    username: String,
    email: String,
    thoughts: Vec<Uuid>,
    friends: Vec<Uuid>,
    #[serde(default)]
    friend_count: usize,
}

impl From<User> for UserJson {
    fn from(user: User) -> Self {
        let friend_count = user.friend_count();
        Self {
            id: user.id,
            username: user.username,
            email: user.email,
            thoughts: user.thoughts,
            friends: user.friends,
            friend_count,
        }
    }
}

impl From<UserJson> for User {
    fn from(json: UserJson) -> Self {
        Self {
            id: json.id,
            username: json.username,
            email: json.email,
            thoughts: json.thoughts,
            friends: json.friends,
        }
    }
}

/// A post. `username` is a snapshot of the author's name at creation time,
/// not a live link to the user record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "ThoughtJson", from = "ThoughtJson")]
pub struct Thought {
    pub id: Uuid,
    pub thought_text: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
    pub reactions: Vec<Reaction>,
}

impl Thought {
    pub fn reaction_count(&self) -> usize {
        self.reactions.len()
    }
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThoughtJson {
    id: Uuid,
    thought_text: String,
    username: String,
    created_at: DateTime<Utc>,
    reactions: Vec<Reaction>,
    #[serde(default)]
    reaction_count: usize,
}

impl From<Thought> for ThoughtJson {
    fn from(thought: Thought) -> Self {
        let reaction_count = thought.reaction_count();
        Self {
            id: thought.id,
            thought_text: thought.thought_text,
            username: thought.username,
            created_at: thought.created_at,
            reactions: thought.reactions,
            reaction_count,
        }
    }
}

impl From<ThoughtJson> for Thought {
    fn from(json: ThoughtJson) -> Self {
        Self {
            id: json.id,
            thought_text: json.thought_text,
            username: json.username,
            created_at: json.created_at,
            reactions: json.reactions,
        }
    }
}

/// Embedded in exactly one [`Thought`]; has no lifecycle of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub reaction_id: Uuid,
    pub reaction_body: String,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_json_carries_friend_count() {
        let user = User {
            id: Uuid::nil(),
            username: "ada".into(),
            email: "ada@example.com".into(),
            thoughts: vec![],
            friends: vec![Uuid::new_v4(), Uuid::new_v4()],
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["friendCount"], 2);
        assert_eq!(json["username"], "ada");
        assert!(json.get("friend_count").is_none());
    }

    #[test]
    fn thought_json_is_camel_case() {
        let thought = Thought {
            id: Uuid::nil(),
            thought_text: "hello".into(),
            username: "ada".into(),
            created_at: Utc::now(),
            reactions: vec![Reaction {
                reaction_id: Uuid::nil(),
                reaction_body: "nice".into(),
                username: "bob".into(),
                created_at: Utc::now(),
            }],
        };
        let json = serde_json::to_value(&thought).unwrap();
        assert_eq!(json["thoughtText"], "hello");
        assert_eq!(json["reactionCount"], 1);
        assert_eq!(json["reactions"][0]["reactionBody"], "nice");

        let back: Thought = serde_json::from_value(json).unwrap();
        assert_eq!(back, thought);
    }
}

//! Cross-entity sequencing between the user and thought stores.
//!
//! Each store call is atomic on its own record. The compound operations here
//! are two such calls in a row with nothing holding them together: once the
//! thought has been created or deleted that stays done, whatever happens to
//! the second step. A failed second step is reported, never rolled back and
//! never retried.

use std::sync::Arc;

use tracing::{debug, error, warn};
use uuid::Uuid;

use musing_db::{
    Database, NewReaction, NewThought, NewUser, ThoughtPatch, UserKey, UserPatch,
};
use musing_types::api::{
    AddReactionRequest, CreateThoughtRequest, CreateUserRequest, UpdateThoughtRequest,
    UpdateUserRequest,
};
use musing_types::models::{Thought, User};

use crate::error::ApiError;

/// Terminal state of create-thought-and-link.
#[derive(Debug)]
pub enum CreateOutcome {
    /// Thought created and its id appended to the user's `thoughts`.
    Linked { thought: Thought, user: User },
    /// Thought created, but `user_id` named no user. The thought stays.
    LinkFailed { thought: Thought, user_id: Uuid },
}

impl CreateOutcome {
    pub fn thought(&self) -> &Thought {
        match self {
            CreateOutcome::Linked { thought, .. } | CreateOutcome::LinkFailed { thought, .. } => {
                thought
            }
        }
    }

    /// The caller-facing result: the updated user, or NotFound for the user.
    pub fn into_user(self) -> Result<User, ApiError> {
        match self {
            CreateOutcome::Linked { user, .. } => Ok(user),
            CreateOutcome::LinkFailed { user_id, .. } => {
                Err(ApiError::NotFound(format!("No user found with id {}", user_id)))
            }
        }
    }
}

/// Terminal state of delete-thought-and-unlink once the thought was found.
/// A missing thought ends the operation earlier, as `ApiError::NotFound`.
#[derive(Debug)]
pub enum DeleteOutcome {
    /// Thought deleted and its id removed from the author's `thoughts`.
    Unlinked { thought: Thought, user: User },
    /// Thought deleted, but no user carries its recorded username.
    OwnerMissing { thought: Thought },
}

impl DeleteOutcome {
    pub fn into_user(self) -> Result<User, ApiError> {
        match self {
            DeleteOutcome::Unlinked { user, .. } => Ok(user),
            DeleteOutcome::OwnerMissing { thought } => Err(ApiError::NotFound(format!(
                "Thought {} deleted, but no user found with username '{}'",
                thought.id, thought.username
            ))),
        }
    }
}

/// Single entry point for every operation the HTTP layer exposes.
#[derive(Clone)]
pub struct Coordinator {
    db: Arc<Database>,
}

impl Coordinator {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Run one store call off the async runtime.
    async fn run<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> musing_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| {
                error!("spawn_blocking join error: {}", e);
                ApiError::Store(e.to_string())
            })?
            .map_err(ApiError::from)
    }

    // -- Thoughts --

    pub async fn list_thoughts(&self) -> Result<Vec<Thought>, ApiError> {
        self.run(|db| db.list_thoughts()).await
    }

    pub async fn get_thought(&self, id: Uuid) -> Result<Thought, ApiError> {
        self.run(move |db| db.get_thought(id))
            .await?
            .ok_or_else(|| thought_not_found(id))
    }

    /// Create the thought, then append its id to the user named by
    /// `req.user_id`.
    pub async fn create_thought(&self, req: CreateThoughtRequest) -> Result<CreateOutcome, ApiError> {
        let user_id = req.user_id;
        let new = NewThought {
            thought_text: req.thought_text,
            username: req.username,
        };

        let thought = self.run(move |db| db.create_thought(new)).await?;
        debug!("create-thought: thought {} created", thought.id);

        let thought_id = thought.id;
        let linked = self
            .run(move |db| db.append_thought_ref(user_id, thought_id))
            .await;

        match linked {
            Ok(Some(user)) => {
                debug!("create-thought: linked {} to user {}", thought_id, user.id);
                Ok(CreateOutcome::Linked { thought, user })
            }
            Ok(None) => {
                warn!(
                    "create-thought: user {} not found, thought {} left unlinked",
                    user_id, thought_id
                );
                Ok(CreateOutcome::LinkFailed { thought, user_id })
            }
            Err(e) => {
                warn!(
                    "create-thought: linking thought {} to user {} failed: {}",
                    thought_id, user_id, e
                );
                Err(e)
            }
        }
    }

    pub async fn update_thought(
        &self,
        id: Uuid,
        req: UpdateThoughtRequest,
    ) -> Result<Thought, ApiError> {
        let patch = ThoughtPatch {
            thought_text: req.thought_text,
            username: req.username,
        };
        self.run(move |db| db.update_thought(id, patch))
            .await?
            .ok_or_else(|| thought_not_found(id))
    }

    /// Delete the thought, then remove its id from the user whose username
    /// the thought recorded.
    pub async fn delete_thought(&self, id: Uuid) -> Result<DeleteOutcome, ApiError> {
        let thought = self
            .run(move |db| db.delete_thought(id))
            .await?
            .ok_or_else(|| thought_not_found(id))?;
        debug!("delete-thought: thought {} deleted", id);

        let owner = UserKey::Username(thought.username.clone());
        let unlinked = {
            let owner = owner.clone();
            self.run(move |db| db.remove_thought_ref(&owner, id)).await
        };

        match unlinked {
            Ok(Some(user)) => {
                debug!("delete-thought: unlinked {} from user {}", id, user.id);
                Ok(DeleteOutcome::Unlinked { thought, user })
            }
            Ok(None) => {
                warn!("delete-thought: owner {} not found for deleted thought {}", owner, id);
                Ok(DeleteOutcome::OwnerMissing { thought })
            }
            Err(e) => {
                warn!("delete-thought: unlinking thought {} from {} failed: {}", id, owner, e);
                Err(e)
            }
        }
    }

    // -- Reactions --

    pub async fn add_reaction(
        &self,
        thought_id: Uuid,
        req: AddReactionRequest,
    ) -> Result<Thought, ApiError> {
        let new = NewReaction {
            reaction_id: req.reaction_id,
            reaction_body: req.reaction_body,
            username: req.username,
        };
        self.run(move |db| db.add_reaction(thought_id, new))
            .await?
            .ok_or_else(|| thought_not_found(thought_id))
    }

    pub async fn remove_reaction(
        &self,
        thought_id: Uuid,
        reaction_id: Uuid,
    ) -> Result<Thought, ApiError> {
        self.run(move |db| db.remove_reaction(thought_id, reaction_id))
            .await?
            .ok_or_else(|| thought_not_found(thought_id))
    }

    // -- Users --

    pub async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        self.run(|db| db.list_users()).await
    }

    pub async fn get_user(&self, id: Uuid) -> Result<User, ApiError> {
        self.run(move |db| db.get_user(id))
            .await?
            .ok_or_else(|| user_not_found(id))
    }

    pub async fn create_user(&self, req: CreateUserRequest) -> Result<User, ApiError> {
        let new = NewUser {
            username: req.username,
            email: req.email,
        };
        self.run(move |db| db.create_user(new)).await
    }

    pub async fn update_user(&self, id: Uuid, req: UpdateUserRequest) -> Result<User, ApiError> {
        let patch = UserPatch {
            username: req.username,
            email: req.email,
        };
        self.run(move |db| db.update_user(id, patch))
            .await?
            .ok_or_else(|| user_not_found(id))
    }

    pub async fn delete_user(&self, id: Uuid) -> Result<User, ApiError> {
        self.run(move |db| db.delete_user(id))
            .await?
            .ok_or_else(|| user_not_found(id))
    }

    pub async fn add_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<User, ApiError> {
        self.run(move |db| db.add_friend(user_id, friend_id))
            .await?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "No user found with id {} or friend id {}",
                    user_id, friend_id
                ))
            })
    }

    pub async fn remove_friend(&self, user_id: Uuid, friend_id: Uuid) -> Result<User, ApiError> {
        self.run(move |db| db.remove_friend(user_id, friend_id))
            .await?
            .ok_or_else(|| user_not_found(user_id))
    }
}

fn thought_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("No thought found with id {}", id))
}

fn user_not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("No user found with id {}", id))
}

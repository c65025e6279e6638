use std::sync::Arc;

use musing_db::Database;

use crate::coordinator::Coordinator;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub coordinator: Coordinator,
}

impl AppStateInner {
    pub fn new(db: Database) -> AppState {
        Arc::new(Self {
            coordinator: Coordinator::new(Arc::new(db)),
        })
    }
}

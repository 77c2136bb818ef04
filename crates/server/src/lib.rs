use db::DBService;
use services::services::runner::SyncService;

pub mod error;
pub mod logging;
pub mod routes;

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    db: DBService,
    sync: SyncService,
}

impl AppState {
    pub fn new(db: DBService) -> Self {
        let sync = SyncService::new(db.clone());
        Self { db, sync }
    }

    pub fn db(&self) -> &DBService {
        &self.db
    }

    pub fn sync(&self) -> &SyncService {
        &self.sync
    }
}

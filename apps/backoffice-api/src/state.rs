//! Shared application state, handed to handlers as `State<Arc<AppState>>`.

use tradedesk_db::Database;

pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}

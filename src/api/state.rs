use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::core::AppConfig;
use crate::notify::Dispatcher;

pub struct AppState {
    pub db: Connection,
    pub config: AppConfig,
    /// Shared push dispatcher. Built once at startup so malformed key
    /// material fails the process instead of individual requests.
    pub dispatcher: Arc<Dispatcher>,
}

impl AppState {
    pub fn new(db: Connection, config: AppConfig, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            db,
            config,
            dispatcher,
        }
    }
}

use crate::auth::AdminSessions;
use crate::config::Config;
use crate::database::DatabaseManager;
use crate::notification::Notifier;
use crate::storage::ImageStore;
use std::sync::Arc;

/// 핸들러 공유 상태
#[derive(Clone)]
pub struct AppState {
    pub db_manager: Arc<DatabaseManager>,
    pub images: Arc<ImageStore>,
    pub notifier: Arc<dyn Notifier>,
    pub sessions: Arc<AdminSessions>,
    pub config: Arc<Config>,
}

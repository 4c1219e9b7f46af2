use std::sync::Arc;

use crate::fetch::LeaderboardClient;
use crate::scheduler::Scheduler;
use crate::storage::LeaderboardStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<LeaderboardStore>,
    pub client: LeaderboardClient,
    pub scheduler: Arc<Scheduler>,
    pub cors_origin: String,
}

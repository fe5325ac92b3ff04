//! Shared handler state: the store, scheduler, dispatcher, and config each
//! route needs.

use std::sync::Arc;

use review_engine::{Config, EventDispatcher, InMemoryStore, ReviewJobHandler, Scheduler};

pub type AppStore = InMemoryStore;
pub type AppJobHandler = ReviewJobHandler<AppStore>;
pub type AppScheduler = Scheduler<AppJobHandler>;
pub type AppDispatcher = EventDispatcher<AppStore, AppJobHandler>;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<AppStore>,
    pub scheduler: Arc<AppScheduler>,
    pub dispatcher: Arc<AppDispatcher>,
    pub config: Arc<Config>,
}

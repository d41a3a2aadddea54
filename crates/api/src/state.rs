use std::sync::Arc;

use studyx_config::Settings;
use studyx_db::RecordStore;
use studyx_services::{
    AuthService, ChangeFeed, DueDateNotifier, LocalStorage, ObjectStorage,
    dao::{
        Backend, ClassroomDao, ConversationDao, NotificationDao, TaskDao, UserDao,
    },
};

use crate::ws::storage::WsStorage;

#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub backend: Backend,
    pub auth: Arc<AuthService>,
    pub users: Arc<UserDao>,
    pub classrooms: Arc<ClassroomDao>,
    pub tasks: Arc<TaskDao>,
    pub notifications: Arc<NotificationDao>,
    pub conversations: Arc<ConversationDao>,
    pub notifier: Arc<DueDateNotifier>,
    pub storage: Arc<dyn ObjectStorage>,
    pub ws_storage: Arc<WsStorage>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecordStore>, settings: Settings) -> Self {
        let storage: Arc<dyn ObjectStorage> = Arc::new(LocalStorage::new(&settings.storage));
        Self::with_storage(store, storage, settings)
    }

    pub fn with_storage(
        store: Arc<dyn RecordStore>,
        storage: Arc<dyn ObjectStorage>,
        settings: Settings,
    ) -> Self {
        let feed = ChangeFeed::new(settings.notifications.feed_capacity);
        let backend = Backend::new(store, feed);

        Self {
            auth: Arc::new(AuthService::new(settings.jwt.clone())),
            users: Arc::new(UserDao::new(&backend)),
            classrooms: Arc::new(ClassroomDao::new(&backend)),
            tasks: Arc::new(TaskDao::new(&backend)),
            notifications: Arc::new(NotificationDao::new(&backend)),
            conversations: Arc::new(ConversationDao::new(&backend)),
            notifier: Arc::new(DueDateNotifier::new(&backend)),
            storage,
            ws_storage: Arc::new(WsStorage::new()),
            backend,
            settings,
        }
    }

    pub fn feed(&self) -> &ChangeFeed {
        &self.backend.feed
    }

    /// Calendar date used for due-date comparisons.
    pub fn today(&self) -> chrono::NaiveDate {
        chrono::Local::now().date_naive()
    }
}

use crate::services::database::Database;
use crate::services::history::HistoryService;
use crate::services::notification::NotificationService;
use crate::services::settings::SettingsService;
use crate::services::template::TemplateService;

/// Shared access point for services and resources that multiple app modules need.
pub struct AppContext {
    database: &'static Database,
    notification_service: NotificationService,
}

impl AppContext {
    pub fn new(database: &'static Database, notification_service: NotificationService) -> Self {
        Self {
            database,
            notification_service,
        }
    }

    pub fn database(&self) -> &'static Database {
        self.database
    }

    pub fn notification_service(&self) -> &NotificationService {
        &self.notification_service
    }

    pub fn notification_service_mut(&mut self) -> &mut NotificationService {
        &mut self.notification_service
    }

    pub fn settings_service(&self) -> SettingsService<'_> {
        SettingsService::new(self.database)
    }

    pub fn history_service(&self) -> HistoryService<'_> {
        HistoryService::new(self.database.connection())
    }

    pub fn template_service(&self) -> TemplateService<'_> {
        TemplateService::new(self.database.connection())
    }
}

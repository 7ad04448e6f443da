use std::sync::Arc;

use anyhow::Context;
use arc_swap::ArcSwapOption;
use axum::Router;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info};
use utoipa::OpenApi;

use crate::api::rest::openapi::UserManagementApiDoc;
use crate::api::rest::routes;
use crate::config::UserManagementConfig;
use crate::contract::client::UserManagementApi;
use crate::domain::activity::ActivityLogService;
use crate::domain::ports::LogSink;
use crate::domain::service::{ServiceConfig, UserService};
use crate::gateways::local::UserManagementLocalClient;
use crate::infra::activity::InMemoryLogSink;
use crate::infra::storage::migrations::Migrator;
use crate::infra::storage::seed::seed_sample_users;
use crate::infra::storage::SeaOrmUsersRepository;

/// The user_management module: owns its services once `init` has run.
#[derive(Default)]
pub struct UserManagement {
    // Read-mostly after init.
    users: ArcSwapOption<UserService>,
    activity: ArcSwapOption<ActivityLogService>,
}

impl UserManagement {
    /// Key of this module's section under `modules:` in the app config.
    pub const NAME: &'static str = "user_management";

    pub fn new() -> Self {
        Self::default()
    }

    pub async fn migrate(&self, conn: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running user_management database migrations");
        Migrator::up(conn, None)
            .await
            .context("user_management migrations failed")?;
        info!("User database migrations completed successfully");
        Ok(())
    }

    /// Wire storage, log sink and services. Seeds the sample roster when enabled.
    pub async fn init(
        &self,
        conn: DatabaseConnection,
        cfg: UserManagementConfig,
    ) -> anyhow::Result<()> {
        info!("Initializing user_management module");
        debug!(
            "Loaded user_management config: seed_sample_users={}, activity_log_capacity={:?}",
            cfg.seed_sample_users, cfg.activity_log_capacity
        );

        if cfg.seed_sample_users {
            seed_sample_users(&conn).await?;
        }

        let sink: Arc<dyn LogSink> =
            Arc::new(InMemoryLogSink::from_config(cfg.activity_log_capacity));
        let repo = SeaOrmUsersRepository::new(conn);

        self.users.store(Some(Arc::new(UserService::new(
            Arc::new(repo),
            ServiceConfig::default(),
        ))));
        self.activity
            .store(Some(Arc::new(ActivityLogService::new(sink))));
        Ok(())
    }

    fn services(&self) -> anyhow::Result<(Arc<UserService>, Arc<ActivityLogService>)> {
        let users = self
            .users
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))?;
        let activity = self
            .activity
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))?;
        Ok((users, activity))
    }

    pub fn register_rest(&self, router: Router) -> anyhow::Result<Router> {
        info!("Registering user_management REST routes");
        let (users, activity) = self.services()?;
        Ok(routes::register_routes(router, users, activity))
    }

    /// In-process client for other modules.
    pub fn client(&self) -> anyhow::Result<Arc<dyn UserManagementApi>> {
        let (users, activity) = self.services()?;
        Ok(Arc::new(UserManagementLocalClient::new(users, activity)))
    }

    pub fn openapi() -> utoipa::openapi::OpenApi {
        UserManagementApiDoc::openapi()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_require_init() {
        let module = UserManagement::new();
        let err = module.register_rest(Router::new()).unwrap_err();
        assert!(err.to_string().contains("not initialized"));
        assert!(module.client().is_err());
    }
}

use anyhow::Result;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod migrator;
pub mod repositories;

pub use crate::entities::catalog_entries::Model as CatalogEntry;
pub use repositories::user::User;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        // Sqlite needs the backing file to exist before connecting.
        if let Some(path_str) = db_url.strip_prefix("sqlite:") {
            if !path_str.starts_with(":memory:") {
                if let Some(parent) = Path::new(path_str).parent() {
                    tokio::fs::create_dir_all(parent).await.ok();
                }
                if !Path::new(path_str).exists() {
                    std::fs::File::create(path_str)?;
                }
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    /// Whether an error from a store call is a unique-key violation.
    #[must_use]
    pub fn is_unique_violation(err: &anyhow::Error) -> bool {
        err.downcast_ref::<sea_orm::DbErr>()
            .and_then(sea_orm::DbErr::sql_err)
            .is_some_and(|e| matches!(e, sea_orm::SqlErr::UniqueConstraintViolation(_)))
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn catalog_repo(&self) -> repositories::catalog::CatalogRepository {
        repositories::catalog::CatalogRepository::new(self.conn.clone())
    }

    pub async fn create_user(
        &self,
        login: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<User> {
        self.user_repo().create(login, password, display_name).await
    }

    pub async fn get_user_by_login(&self, login: &str) -> Result<Option<User>> {
        self.user_repo().get_by_login(login).await
    }

    pub async fn get_user_by_id(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn verify_user_credentials(
        &self,
        login: &str,
        password: &str,
    ) -> Result<Option<User>> {
        self.user_repo().verify_credentials(login, password).await
    }

    pub async fn verify_user_password_by_id(
        &self,
        id: i32,
        password: &str,
    ) -> Result<Option<bool>> {
        self.user_repo().verify_password_by_id(id, password).await
    }

    pub async fn set_user_password_by_id(&self, id: i32, new_password: &str) -> Result<bool> {
        self.user_repo().set_password_by_id(id, new_password).await
    }

    pub async fn set_user_password_by_login(
        &self,
        login: &str,
        new_password: &str,
    ) -> Result<bool> {
        self.user_repo()
            .set_password_by_login(login, new_password)
            .await
    }

    pub async fn upsert_catalog_entry(&self, part_code: &str, directory_path: &str) -> Result<()> {
        self.catalog_repo().upsert(part_code, directory_path).await
    }

    pub async fn get_catalog_entry(&self, part_code: &str) -> Result<Option<CatalogEntry>> {
        self.catalog_repo().get(part_code).await
    }

    pub async fn list_part_codes(&self) -> Result<Vec<String>> {
        self.catalog_repo().list_part_codes().await
    }
}

use async_trait::async_trait;
use db::DBService;
use services::services::{
    clients::ClientService, sales::SalesService, sales_import::SalesImporter,
};
use thiserror::Error;

pub mod config;

pub use config::DeploymentConfig;

#[derive(Debug, Error)]
pub enum DeploymentError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Everything a request handler needs: configuration plus the database.
#[async_trait]
pub trait Deployment: Clone + Send + Sync + 'static {
    async fn new() -> Result<Self, DeploymentError>;

    fn config(&self) -> &DeploymentConfig;

    fn db(&self) -> &DBService;

    fn client_service(&self) -> ClientService {
        ClientService::new(self.db().pool.clone())
    }

    fn sales_service(&self) -> SalesService {
        SalesService::new(self.db().pool.clone())
    }

    fn sales_importer(&self) -> SalesImporter {
        let config = self.config();
        SalesImporter::with_batch_sizes(
            self.db().pool.clone(),
            config.import_batch_size,
            config.client_batch_size,
        )
    }
}

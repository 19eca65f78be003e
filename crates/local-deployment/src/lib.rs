use std::sync::Arc;

use async_trait::async_trait;
use db::DBService;
use deployment::{Deployment, DeploymentConfig, DeploymentError};
use tracing::info;

/// Single-process deployment backed by a local SQLite file
#[derive(Clone)]
pub struct LocalDeployment {
    config: Arc<DeploymentConfig>,
    db: DBService,
}

impl LocalDeployment {
    pub fn from_parts(config: DeploymentConfig, db: DBService) -> Self {
        Self {
            config: Arc::new(config),
            db,
        }
    }

    pub async fn with_config(config: DeploymentConfig) -> Result<Self, DeploymentError> {
        let db = DBService::new(&config.database_url).await?;
        info!(
            bind = %config.bind_address(),
            import_batch_size = config.import_batch_size,
            "Local deployment initialised"
        );
        Ok(Self::from_parts(config, db))
    }
}

#[async_trait]
impl Deployment for LocalDeployment {
    async fn new() -> Result<Self, DeploymentError> {
        Self::with_config(DeploymentConfig::from_env()).await
    }

    fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    fn db(&self) -> &DBService {
        &self.db
    }
}

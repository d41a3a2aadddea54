use std::sync::Arc;

use mongodb::{options::ClientOptions, Client};
use studyx_config::{DatabaseBackend, Settings};
use tracing::info;

use crate::indexes::ensure_indexes;
use crate::store::{MemoryStore, MongoStore, RecordStore, StoreResult};

/// Opens the configured backend. For MongoDB this verifies the connection
/// and ensures indexes before returning.
pub async fn connect(settings: &Settings) -> StoreResult<Arc<dyn RecordStore>> {
    match settings.database.backend {
        DatabaseBackend::Memory => {
            info!("Using in-memory record store");
            Ok(Arc::new(MemoryStore::new()))
        }
        DatabaseBackend::Mongo => {
            let mut client_options = ClientOptions::parse(&settings.database.url).await?;

            if let Some(max_pool) = settings.database.max_pool_size {
                client_options.max_pool_size = Some(max_pool);
            }
            if let Some(min_pool) = settings.database.min_pool_size {
                client_options.min_pool_size = Some(min_pool);
            }

            let client = Client::with_options(client_options)?;

            client
                .database("admin")
                .run_command(bson::doc! { "ping": 1 })
                .await?;

            info!(db = %settings.database.name, "Connected to MongoDB");

            let db = client.database(&settings.database.name);
            ensure_indexes(&db).await?;
            Ok(Arc::new(MongoStore::new(db)))
        }
    }
}

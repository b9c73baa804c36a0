use crate::config::AppConfig;
use crate::storage::{LocalStorage, PhotoStorage};
use crate::store::{seed, JsonFileStore, RecordStore};
use std::sync::Arc;
use tracing::info;

pub const UPLOAD_URL_PREFIX: &str = "/images/uploads";

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn RecordStore>,
    pub photos: Arc<dyn PhotoStorage>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store = Arc::new(JsonFileStore::new(config.data_dir.clone())) as Arc<dyn RecordStore>;
        let photos = Arc::new(LocalStorage::new(config.upload_dir(), UPLOAD_URL_PREFIX).await?)
            as Arc<dyn PhotoStorage>;

        if config.seed_data {
            seed::ensure_seed_data(&*store, config.password_scheme).await?;
        }
        info!(
            data_dir = %config.data_dir.display(),
            upload_dir = %config.upload_dir().display(),
            "state initialised"
        );

        Ok(Self::from_parts(config, store, photos))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn RecordStore>,
        photos: Arc<dyn PhotoStorage>,
    ) -> Self {
        Self {
            config,
            store,
            photos,
        }
    }

    /// In-memory state for router tests, seeded with the fixture records.
    #[cfg(test)]
    pub async fn fake() -> Self {
        use crate::auth::password::PasswordScheme;
        use crate::config::SessionConfig;
        use crate::storage::fake::MemoryPhotos;
        use crate::store::memory::MemoryStore;

        let config = Arc::new(AppConfig {
            data_dir: "test-data".into(),
            public_dir: "test-public".into(),
            session: SessionConfig {
                secret: "test".into(),
                issuer: "test".into(),
                audience: "test".into(),
                ttl_minutes: 5,
                cookie_name: "session".into(),
                secure_cookie: false,
            },
            password_scheme: PasswordScheme::Sha256,
            max_upload_bytes: 64 * 1024,
            cors_origin: None,
            seed_data: true,
        });

        let store = Arc::new(MemoryStore::default()) as Arc<dyn RecordStore>;
        seed::ensure_seed_data(&*store, config.password_scheme)
            .await
            .expect("seed memory store");
        let photos = Arc::new(MemoryPhotos::default()) as Arc<dyn PhotoStorage>;

        Self::from_parts(config, store, photos)
    }
}

use std::path::PathBuf;
use std::sync::Arc;

use crate::app::error::{GatorError, Result};
use crate::config::Config;
use crate::domain::User;
use crate::fetcher::http_fetcher::HttpFetcher;
use crate::fetcher::Fetcher;
use crate::ingest::Aggregator;
use crate::normalizer::Normalizer;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

pub struct AppContext {
    pub config: Config,
    pub store: Arc<SqliteStore>,
    pub fetcher: Arc<dyn Fetcher + Send + Sync>,
    pub normalizer: Normalizer,
}

impl AppContext {
    pub fn new(config: Config) -> Result<Self> {
        let db_path = match &config.db_path {
            Some(p) => p.clone(),
            None => Self::default_db_path()?,
        };

        let store = Arc::new(SqliteStore::new(&db_path)?);
        Self::with_store(config, store)
    }

    pub fn in_memory(config: Config) -> Result<Self> {
        let store = Arc::new(SqliteStore::in_memory()?);
        Self::with_store(config, store)
    }

    fn with_store(config: Config, store: Arc<SqliteStore>) -> Result<Self> {
        config.validate()?;
        let fetcher: Arc<dyn Fetcher + Send + Sync> = Arc::new(HttpFetcher::with_options(
            config.aggregator.request_timeout(),
            &config.aggregator.user_agent,
        )?);
        let normalizer = Normalizer::with_layouts(config.aggregator.date_layouts.clone());

        Ok(Self {
            config,
            store,
            fetcher,
            normalizer,
        })
    }

    pub fn aggregator(&self) -> Aggregator<SqliteStore> {
        Aggregator::new(
            self.store.clone(),
            self.fetcher.clone(),
            self.normalizer.clone(),
        )
    }

    /// The logged-in user from the configuration.
    pub fn current_user(&self) -> Result<User> {
        let name = self
            .config
            .current_user_name
            .as_deref()
            .ok_or(GatorError::NotLoggedIn)?;

        self.store
            .get_user(name)?
            .ok_or_else(|| GatorError::UserNotFound(name.to_string()))
    }

    fn default_db_path() -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| GatorError::Config("Could not find data directory".into()))?;
        let gator_dir = data_dir.join("gator");
        std::fs::create_dir_all(&gator_dir)?;
        Ok(gator_dir.join("gator.db"))
    }
}

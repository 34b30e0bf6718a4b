use std::sync::Arc;

use crate::auth::password::hash_password;
use crate::auth::{AuthError, TokenService};
use crate::config::AppConfig;
use crate::database::store::DocumentStore;
use crate::filter::QueryTranslator;
use crate::services::geocoder::Geocoder;
use crate::services::mailer::Mailer;
use crate::services::photos::PhotoStore;

/// Shared handles passed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn DocumentStore>,
    pub tokens: TokenService,
    pub geocoder: Arc<dyn Geocoder>,
    pub mailer: Arc<dyn Mailer>,
    pub photos: PhotoStore,
    /// Verified against when a login names no known account
    pub decoy_hash: Arc<str>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        geocoder: Arc<dyn Geocoder>,
        mailer: Arc<dyn Mailer>,
    ) -> Result<Self, AuthError> {
        let tokens = TokenService::from_config(&config.security)?;
        let photos = PhotoStore::from_config(&config.uploads);
        let decoy_hash = hash_password("no account has this password")?.into();
        Ok(Self {
            config: Arc::new(config),
            store,
            tokens,
            geocoder,
            mailer,
            photos,
            decoy_hash,
        })
    }

    /// Translator bound to a resource's allow-list and the configured limit cap
    pub fn translator<'a>(&self, allowed_fields: &'a [&'a str]) -> QueryTranslator<'a> {
        QueryTranslator::new(allowed_fields).with_max_limit(self.config.filter.max_limit)
    }
}

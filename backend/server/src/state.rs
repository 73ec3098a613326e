use std::sync::Arc;

use super::{
    backend::{Backend, init_backend},
    config::Config,
    error::ConfigError,
    verify::{PaymentVerifier, init_verifier},
};

pub struct AppState {
    pub config: Config,
    pub backend: Arc<dyn Backend>,
    pub verifier: Arc<dyn PaymentVerifier>,
}

impl AppState {
    pub async fn new() -> Result<Arc<Self>, ConfigError> {
        let config = Config::load()?;

        let backend = init_backend(&config)?;
        let verifier = init_verifier(&config)?;

        Ok(Arc::new(Self {
            config,
            backend,
            verifier,
        }))
    }
}

//! Application state for the HTTP server.

use std::sync::Arc;

use crate::clients::{
    AnthropicTranslator, HttpObjectStorage, HttpSessionVerifier, InMemoryObjectStorage,
    MockPaymentGateway, MockTranslator, ObjectStorage, PaymentGateway, SessionVerifier,
    StaticSessionVerifier, StripeGateway, Translator,
};
use crate::config::{AppConfig, AuthProvider, PaymentProvider, StorageProvider, TranslatorProvider};
use crate::db::repository::FullRepository;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Repository instance for database operations
    pub repository: Arc<dyn FullRepository>,
    pub payments: Arc<dyn PaymentGateway>,
    pub storage: Arc<dyn ObjectStorage>,
    pub translator: Arc<dyn Translator>,
    pub verifier: Arc<dyn SessionVerifier>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// State with in-memory collaborators; the payment gateway is a mock and
    /// no admin token is accepted until one is configured.
    pub fn new(repository: Arc<dyn FullRepository>) -> Self {
        let config = AppConfig::default();
        Self {
            repository,
            payments: Arc::new(MockPaymentGateway::new()),
            storage: Arc::new(InMemoryObjectStorage::new(&config.server.public_base_url)),
            translator: Arc::new(MockTranslator),
            verifier: Arc::new(StaticSessionVerifier::default()),
            config: Arc::new(config),
        }
    }

    /// Build every client from the configured providers.
    pub fn from_config(repository: Arc<dyn FullRepository>, config: AppConfig) -> Self {
        let payments: Arc<dyn PaymentGateway> = match config.payment.provider {
            PaymentProvider::Stripe => match &config.payment.api_base {
                Some(base) => Arc::new(StripeGateway::with_base_url(
                    config.payment.secret_key.clone(),
                    base.clone(),
                )),
                None => Arc::new(StripeGateway::new(config.payment.secret_key.clone())),
            },
            PaymentProvider::Mock => {
                log::warn!("Using the mock payment gateway");
                Arc::new(MockPaymentGateway::new())
            }
        };
        let storage: Arc<dyn ObjectStorage> = match config.storage.provider {
            StorageProvider::Http => Arc::new(HttpObjectStorage::new(
                config.storage.url.clone(),
                config.storage.bucket.clone(),
                config.storage.service_key.clone(),
            )),
            StorageProvider::Memory => {
                Arc::new(InMemoryObjectStorage::new(&config.server.public_base_url))
            }
        };
        let translator: Arc<dyn Translator> = match config.translator.provider {
            TranslatorProvider::Anthropic => Arc::new(AnthropicTranslator::new(
                config.translator.api_key.clone(),
                config.translator.model.clone(),
            )),
            TranslatorProvider::Mock => Arc::new(MockTranslator),
        };
        let verifier: Arc<dyn SessionVerifier> = match config.auth.provider {
            AuthProvider::Http => Arc::new(HttpSessionVerifier::new(
                config.auth.url.clone(),
                config.auth.api_key.clone(),
            )),
            AuthProvider::Static => Arc::new(StaticSessionVerifier::new(
                config.auth.static_tokens.clone(),
            )),
        };

        Self {
            repository,
            payments,
            storage,
            translator,
            verifier,
            config: Arc::new(config),
        }
    }

    pub fn with_payments(mut self, payments: Arc<dyn PaymentGateway>) -> Self {
        self.payments = payments;
        self
    }

    pub fn with_storage(mut self, storage: Arc<dyn ObjectStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SessionVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Arc::new(config);
        self
    }
}

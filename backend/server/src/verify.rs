//! # Payment Verification
//!
//! Arriving at the success page with a `session_id` is not proof of payment,
//! anyone can post an id. When a Stripe secret key is configured we ask
//! Stripe for the checkout session before counting it.
//!
//! - `paid`, `no_payment_required`: counted
//! - `unpaid` or unknown session (404): rejected
//! - anything else from Stripe: verification unavailable, not counted
//!
//! Without a key the redirect is trusted as-is.
use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use tracing::info;

use crate::{config::Config, error::VerifyError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Paid,
    Unpaid,
}

#[async_trait]
pub trait PaymentVerifier: Send + Sync {
    async fn verify(&self, session_id: &str) -> Result<Verdict, VerifyError>;
}

/// Accepts every session, the redirect itself is taken as proof.
pub struct TrustRedirect;

#[async_trait]
impl PaymentVerifier for TrustRedirect {
    async fn verify(&self, _session_id: &str) -> Result<Verdict, VerifyError> {
        Ok(Verdict::Paid)
    }
}

#[derive(Deserialize)]
struct CheckoutSession {
    payment_status: String,
}

pub struct StripeVerifier {
    client: Client,
    api_base: Url,
    secret_key: String,
}

impl StripeVerifier {
    pub fn new(api_base: &str, secret_key: &str, timeout: Duration) -> Result<Self, VerifyError> {
        let api_base =
            Url::parse(api_base).map_err(|_| VerifyError::InvalidUrl(api_base.to_string()))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            api_base,
            secret_key: secret_key.to_string(),
        })
    }

    fn session_url(&self, session_id: &str) -> Result<Url, VerifyError> {
        let mut url = self.api_base.clone();
        url.path_segments_mut()
            .map_err(|_| VerifyError::InvalidUrl(self.api_base.to_string()))?
            .pop_if_empty()
            .extend(["v1", "checkout", "sessions", session_id]);

        Ok(url)
    }
}

#[async_trait]
impl PaymentVerifier for StripeVerifier {
    async fn verify(&self, session_id: &str) -> Result<Verdict, VerifyError> {
        let response = self
            .client
            .get(self.session_url(session_id)?)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Ok(Verdict::Unpaid),
            status if !status.is_success() => return Err(VerifyError::Status(status.as_u16())),
            _ => {}
        }

        let session: CheckoutSession = response.json().await?;

        match session.payment_status.as_str() {
            "paid" | "no_payment_required" => Ok(Verdict::Paid),
            _ => Ok(Verdict::Unpaid),
        }
    }
}

pub fn init_verifier(config: &Config) -> Result<Arc<dyn PaymentVerifier>, VerifyError> {
    let Some(secret_key) = &config.stripe_secret_key else {
        info!("No Stripe key set, trusting payment redirects");
        return Ok(Arc::new(TrustRedirect));
    };

    let verifier =
        StripeVerifier::new(&config.stripe_api_base, secret_key, config.backend_timeout)?;
    info!("Verifying payments against {}", config.stripe_api_base);

    Ok(Arc::new(verifier))
}

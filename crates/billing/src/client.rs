//! Minimal read-only Stripe API client.
//!
//! Used by the webhook processor when a payload does not carry everything
//! needed locally (a `checkout.session.completed` event references its
//! subscription by id but does not embed the price). Only the endpoints the
//! processor reads are implemented.

use std::time::Duration;

use crate::event::StripeSubscription;

const API_BASE: &str = "https://api.stripe.com/v1";

/// HTTP request timeout for a single API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Error type for Stripe API reads.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Stripe returned HTTP {0}")]
    HttpStatus(u16),
}

/// Read-only Stripe API client authenticated with the secret key.
pub struct BillingClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl BillingClient {
    pub fn new(api_key: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            http,
            api_key,
            base_url: API_BASE.to_string(),
        }
    }

    /// Point the client at a different base URL. Used by tests to target a
    /// local stub server.
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Fetch a subscription by id (`GET /v1/subscriptions/{id}`).
    pub async fn fetch_subscription(
        &self,
        subscription_id: &str,
    ) -> Result<StripeSubscription, ClientError> {
        let url = format!("{}/subscriptions/{subscription_id}", self.base_url);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::HttpStatus(response.status().as_u16()));
        }

        Ok(response.json().await?)
    }
}

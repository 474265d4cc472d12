pub mod watcher;

#[cfg(test)]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use backoff::{Error as BackoffError, ExponentialBackoff, future::retry};
use mockall::automock;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;
pub use watcher::{PaymentTracker, PaymentWatcher, PendingPayment};

/// Errors returned by the payment gateway.
#[derive(Debug, Error)]
pub enum PaymentError {
    /// The request could not be sent or the response could not be read.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    /// The gateway answered with a non-success status.
    #[error("Payment API returned {status}: {body}")]
    Api {
        /// HTTP status of the response.
        status: StatusCode,
        /// Response body.
        body: String,
    },
    /// A created payment came back without a redirect URL.
    #[error("Payment {0} has no confirmation URL")]
    MissingConfirmation(String),
}

type Result<T> = std::result::Result<T, PaymentError>;

/// A payment waiting for the user to confirm it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedPayment {
    /// Gateway payment id.
    pub id: String,
    /// Page where the user pays.
    pub confirmation_url: String,
}

/// Payment state reported by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Created, waiting for the user.
    Pending,
    /// Paid, waiting for the shop to capture it.
    WaitingForCapture,
    /// Paid and captured.
    Succeeded,
    /// Cancelled or expired.
    Canceled,
}

/// Creates payments and reports their status.
#[automock]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Creates a payment of `amount` rubles.
    async fn create_payment(&self, amount: i64, description: &str) -> Result<CreatedPayment>;

    /// Current status of a payment.
    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus>;
}

#[derive(Debug, Serialize)]
struct Amount {
    value: String,
    currency: &'static str,
}

impl Amount {
    fn rubles(amount: i64) -> Self {
        Self { value: format!("{amount}.00"), currency: "RUB" }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ConfirmationRequest<'a> {
    Redirect { return_url: &'a str },
}

#[derive(Debug, Serialize)]
struct CreatePaymentRequest<'a> {
    amount: Amount,
    confirmation: ConfirmationRequest<'a>,
    capture: bool,
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: String,
    status: PaymentStatus,
    confirmation: Option<ConfirmationResponse>,
}

#[derive(Debug, Deserialize)]
struct ConfirmationResponse {
    confirmation_url: Option<String>,
}

impl PaymentResponse {
    fn into_created(self) -> Result<CreatedPayment> {
        match self.confirmation.and_then(|c| c.confirmation_url) {
            Some(confirmation_url) => Ok(CreatedPayment { id: self.id, confirmation_url }),
            None => Err(PaymentError::MissingConfirmation(self.id)),
        }
    }
}

/// YooKassa REST API client.
#[derive(Clone)]
pub struct YooKassaClient {
    client: Client,
    api_url: String,
    shop_id: String,
    secret_key: String,
    return_url: String,
}

impl YooKassaClient {
    /// Builds a client for the shop. `api_url` has no trailing slash.
    pub fn new(api_url: &str, shop_id: &str, secret_key: &str, return_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        debug!("YooKassa HTTP client built successfully.");

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            shop_id: shop_id.to_string(),
            secret_key: secret_key.to_string(),
            return_url: return_url.to_string(),
        })
    }

    fn backoff_config() -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: Duration::from_secs(1),
            max_interval: Duration::from_secs(10),
            max_elapsed_time: Some(Duration::from_secs(30)),
            multiplier: 2.0,
            ..Default::default()
        }
    }

    async fn post_payment(
        &self,
        request: &CreatePaymentRequest<'_>,
        idempotence_key: &str,
    ) -> Result<CreatedPayment> {
        let resp = self
            .client
            .post(format!("{}/payments", self.api_url))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .header("Idempotence-Key", idempotence_key)
            .json(request)
            .send()
            .await?;
        let payment: PaymentResponse = Self::check_status(resp).await?.json().await?;
        payment.into_created()
    }

    async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }
        let body = resp.text().await.unwrap_or_default();
        Err(PaymentError::Api { status, body })
    }
}

fn is_transient(err: &PaymentError) -> bool {
    match err {
        PaymentError::Http(_) => true,
        PaymentError::Api { status, .. } => {
            status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
        }
        PaymentError::MissingConfirmation(_) => false,
    }
}

#[async_trait]
impl PaymentGateway for YooKassaClient {
    async fn create_payment(&self, amount: i64, description: &str) -> Result<CreatedPayment> {
        // Reused by every retry of this payment.
        let idempotence_key = Uuid::new_v4().to_string();
        let request = CreatePaymentRequest {
            amount: Amount::rubles(amount),
            confirmation: ConfirmationRequest::Redirect { return_url: &self.return_url },
            capture: true,
            description,
        };

        let operation = || async {
            self.post_payment(&request, &idempotence_key).await.map_err(|e| {
                if is_transient(&e) {
                    warn!("Transient error creating payment: {e}. Retrying...");
                    BackoffError::transient(e)
                } else {
                    BackoffError::permanent(e)
                }
            })
        };

        let payment = retry(Self::backoff_config(), operation).await?;
        debug!("Created payment {}", payment.id);
        Ok(payment)
    }

    async fn payment_status(&self, payment_id: &str) -> Result<PaymentStatus> {
        let resp = self
            .client
            .get(format!("{}/payments/{payment_id}", self.api_url))
            .basic_auth(&self.shop_id, Some(&self.secret_key))
            .send()
            .await?;
        let payment: PaymentResponse = Self::check_status(resp).await?.json().await?;
        Ok(payment.status)
    }
}

//! Status endpoint client.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;

use crate::domain::foundation::MovieId;
use crate::domain::purchase::{ReportedStatus, TxRef};

use super::ClientError;

/// Asks the server what happened to a purchase.
#[async_trait]
pub trait PaymentStatusClient: Send + Sync {
    /// One request, no retries. Any non-2xx answer is an error.
    async fn fetch_status(
        &self,
        movie_id: &MovieId,
        tx_ref: &TxRef,
    ) -> Result<ReportedStatus, ClientError>;
}

#[derive(Debug, Deserialize)]
struct StatusBody {
    status: ReportedStatus,
}

/// `GET {base}/api/payment/status?movieId=&tx_ref=` with a bearer token.
pub struct HttpPaymentStatusClient {
    http: reqwest::Client,
    base_url: String,
    token: SecretString,
}

impl HttpPaymentStatusClient {
    pub fn new(
        base_url: impl Into<String>,
        token: SecretString,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    fn status_url(&self) -> String {
        format!("{}/api/payment/status", self.base_url)
    }
}

#[async_trait]
impl PaymentStatusClient for HttpPaymentStatusClient {
    async fn fetch_status(
        &self,
        movie_id: &MovieId,
        tx_ref: &TxRef,
    ) -> Result<ReportedStatus, ClientError> {
        let response = self
            .http
            .get(self.status_url())
            .bearer_auth(self.token.expose_secret())
            .query(&[
                ("movieId", movie_id.to_string()),
                ("tx_ref", tx_ref.to_string()),
            ])
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body: StatusBody = response
            .json()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))?;
        Ok(body.status)
    }
}

impl std::fmt::Debug for HttpPaymentStatusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPaymentStatusClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_trimmed() {
        let client = HttpPaymentStatusClient::new(
            "https://cinegate.test/",
            SecretString::new("t".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(client.status_url(), "https://cinegate.test/api/payment/status");
    }

    #[test]
    fn debug_hides_token() {
        let client = HttpPaymentStatusClient::new(
            "https://cinegate.test",
            SecretString::new("super-secret-token".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!format!("{:?}", client).contains("super-secret-token"));
    }

    #[test]
    fn status_body_parses_reported_words() {
        let body: StatusBody = serde_json::from_str(r#"{"status":"refunded"}"#).unwrap();
        assert_eq!(body.status, ReportedStatus::Refunded);
        assert!(serde_json::from_str::<StatusBody>(r#"{"status":"weird"}"#).is_err());
    }
}

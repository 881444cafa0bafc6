use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{
    Client, Url,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use serde::{Deserialize, Serialize};

use crate::oracle::{
    error::{self, CommunicationError},
    ports::OracleClient,
    types::VerificationOutcome,
};

const UNKNOWN_REASON: &str = "unknown";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HttpOracleConfig {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

pub struct HttpOracleClient {
    client: Client,
    headers: HeaderMap,
}

impl HttpOracleClient {
    pub fn new(config: &HttpOracleConfig) -> Result<Self> {
        let client = Client::builder()
            .build()
            .context("failed to build oracle http client")?;
        Ok(Self {
            client,
            headers: build_headers(&config.headers)?,
        })
    }
}

#[async_trait]
impl OracleClient for HttpOracleClient {
    async fn verify(&self, endpoint: &str) -> Result<VerificationOutcome, CommunicationError> {
        let url = match Url::parse(endpoint) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => url,
            Ok(url) => {
                return Err(error::unreachable(format!(
                    "unsupported verification endpoint scheme '{}'",
                    url.scheme()
                ))
                .with_endpoint(endpoint));
            }
            Err(err) => {
                return Err(
                    error::unreachable(format!("invalid verification endpoint: {err}"))
                        .with_endpoint(endpoint),
                );
            }
        };

        tracing::debug!(target: "oracle", endpoint = %endpoint, "oracle_request_sent");
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|err| {
                let mapped = if err.is_timeout() {
                    error::timeout(format!("oracle request timed out: {err}"))
                } else {
                    error::unreachable(format!("failed to reach oracle: {err}"))
                };
                mapped.with_endpoint(endpoint)
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(error::unexpected_status(format!(
                "oracle responded with http status {}",
                status.as_u16()
            ))
            .with_endpoint(endpoint));
        }

        let body = response.text().await.map_err(|err| {
            error::unreachable(format!("failed to read oracle response: {err}"))
                .with_endpoint(endpoint)
        })?;

        parse_verification_body(&body).map_err(|err| err.with_endpoint(endpoint))
    }
}

#[derive(Debug, Deserialize)]
struct WireVerification {
    status: WireStatus,
    #[serde(default)]
    approved: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum WireStatus {
    Completed,
    Pending,
    NotFound,
}

pub fn parse_verification_body(body: &str) -> Result<VerificationOutcome, CommunicationError> {
    let wire: WireVerification = serde_json::from_str(body)
        .map_err(|err| error::invalid_response(format!("malformed oracle response: {err}")))?;

    let reason = wire
        .reason
        .filter(|reason| !reason.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_REASON.to_string());

    let outcome = match wire.status {
        WireStatus::Completed => VerificationOutcome::Completed {
            approved: wire.approved,
        },
        WireStatus::Pending => VerificationOutcome::Pending { reason },
        WireStatus::NotFound => VerificationOutcome::NotFound { reason },
    };
    Ok(outcome)
}

fn build_headers(raw: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut headers = HeaderMap::new();
    for (name, value) in raw {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|_| anyhow!("invalid oracle header name '{name}'"))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|_| anyhow!("invalid value for oracle header '{name}'"))?;
        headers.insert(header_name, header_value);
    }
    Ok(headers)
}

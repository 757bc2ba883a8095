// Request layer
// The transport capability used by the auth gateway, plus a GraphQL-over-HTTP client

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;

use crate::error::TransportError;

const LOGIN_MUTATION: &str = r#"
mutation LoginMutation($email: String!, $password: String!) {
    login(email: $email, password: $password) {
        token
        tokenExpiry
        success
        firstName
        lastName
        email
        country
        region
        dateExpires
        accountType
        dateCreated
        numRowsGenerated
        profileImage
    }
}"#;

const LOGOUT_MUTATION: &str = r#"
mutation Logout {
    logout {
        success
    }
}"#;

const REFRESH_TOKEN_MUTATION: &str = r#"
mutation RefreshToken {
    refreshToken {
        token
        tokenExpiry
        success
        firstName
        lastName
        email
        country
        region
        dateExpires
        accountType
        dateCreated
        numRowsGenerated
        profileImage
    }
}"#;

/// Remote operations the session lifecycle needs
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Login { email: String, password: String },
    Logout,
    RefreshToken,
}

impl Operation {
    /// GraphQL operation name
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Login { .. } => "LoginMutation",
            Operation::Logout => "Logout",
            Operation::RefreshToken => "RefreshToken",
        }
    }

    /// Field of `data` holding this operation's result
    pub fn root_field(&self) -> &'static str {
        match self {
            Operation::Login { .. } => "login",
            Operation::Logout => "logout",
            Operation::RefreshToken => "refreshToken",
        }
    }

    pub fn document(&self) -> &'static str {
        match self {
            Operation::Login { .. } => LOGIN_MUTATION,
            Operation::Logout => LOGOUT_MUTATION,
            Operation::RefreshToken => REFRESH_TOKEN_MUTATION,
        }
    }

    pub fn variables(&self) -> Value {
        match self {
            Operation::Login { email, password } => json!({
                "email": email,
                "password": password,
            }),
            Operation::Logout | Operation::RefreshToken => json!({}),
        }
    }
}

/// Request-dispatch capability
///
/// Implementations return the operation's result object (the value under
/// `data.<root_field>`).
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, operation: Operation) -> Result<Value, TransportError>;
}

/// GraphQL client over HTTP with retry logic
pub struct GraphQlClient {
    /// Shared HTTP client; the cookie store carries the server's refresh cookie
    client: Client,

    endpoint: String,

    /// Maximum number of retries
    max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    base_delay_ms: u64,
}

impl GraphQlClient {
    /// Create a new GraphQL client
    pub fn new(
        endpoint: impl Into<String>,
        connect_timeout: u64,
        request_timeout: u64,
        max_retries: u32,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .cookie_store(true)
            .connect_timeout(Duration::from_secs(connect_timeout))
            .timeout(Duration::from_secs(request_timeout))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_retries,
            base_delay_ms: 500,
        })
    }

    /// Override the backoff base delay
    pub fn with_base_delay(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send_once(&self, operation: &Operation) -> Result<Value, TransportError> {
        let body = json!({
            "operationName": operation.name(),
            "query": operation.document(),
            "variables": operation.variables(),
        });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| TransportError::Network {
                kind: classify(&e),
                message: e.to_string(),
            })?;

        let status = response.status();
        tracing::debug!(status = %status, operation = operation.name(), "Received GraphQL response");

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let payload: Value = response.json().await.map_err(|e| {
            TransportError::Decode(format!("Failed to parse GraphQL response: {}", e))
        })?;

        extract_result(operation, payload)
    }

    /// Calculate exponential backoff delay
    fn calculate_backoff_delay(&self, attempt: u32) -> u64 {
        self.base_delay_ms * 2_u64.pow(attempt)
    }
}

#[async_trait]
impl Transport for GraphQlClient {
    async fn execute(&self, operation: Operation) -> Result<Value, TransportError> {
        let mut attempt = 0;

        tracing::debug!(
            operation = operation.name(),
            endpoint = %self.endpoint,
            "Sending GraphQL request"
        );

        loop {
            match self.send_once(&operation).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = self.calculate_backoff_delay(attempt);
                    tracing::warn!(
                        "{} failed: {}, retrying after {}ms (attempt {}/{})",
                        operation.name(),
                        e,
                        delay,
                        attempt + 1,
                        self.max_retries
                    );
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                    attempt += 1;
                }
                Err(e) => {
                    tracing::error!(
                        operation = operation.name(),
                        error = %e,
                        total_attempts = attempt + 1,
                        "GraphQL request failed"
                    );
                    return Err(e);
                }
            }
        }
    }
}

/// Pull `data.<root_field>` out of a GraphQL response body
fn extract_result(operation: &Operation, mut payload: Value) -> Result<Value, TransportError> {
    if let Some(errors) = payload.get("errors").and_then(|v| v.as_array()) {
        if !errors.is_empty() {
            let messages: Vec<&str> = errors
                .iter()
                .filter_map(|e| e.get("message").and_then(|m| m.as_str()))
                .collect();
            return Err(TransportError::GraphQl(messages.join("; ")));
        }
    }

    payload
        .get_mut("data")
        .and_then(|data| data.get_mut(operation.root_field()))
        .map(Value::take)
        .filter(|v| !v.is_null())
        .ok_or_else(|| {
            TransportError::Decode(format!(
                "Response has no data.{} field",
                operation.root_field()
            ))
        })
}

/// Categorize a reqwest error for logging
fn classify(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connection_failed"
    } else if e.is_request() {
        "request_error"
    } else if e.is_body() {
        "body_error"
    } else if e.is_decode() {
        "decode_error"
    } else {
        "unknown"
    }
}

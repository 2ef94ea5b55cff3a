//! HTTP client for the external remediator.

use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::domain::models::TaskEnvelope;
use crate::domain::ports::{RemediationOutcome, Remediator};

const USER_AGENT: &str = concat!("warden/", env!("CARGO_PKG_VERSION"));

/// Wire request delivered to the remediator endpoint.
#[derive(Debug, Serialize)]
struct RemediatorRequest<'a> {
    task_id: &'a str,
    action_id: i64,
    target: &'a str,
    action: &'a str,
    severity: &'a str,
    params: &'a Map<String, Value>,
    attempt: u32,
}

/// Expected 200 response body.
#[derive(Debug, Deserialize)]
struct RemediatorResponse {
    status: String,
    #[serde(default)]
    detail: Option<String>,
}

/// Production remediator driver.
///
/// Connection pooling comes from the shared `reqwest::Client`; the request
/// timeout equals the worker execution timeout so a hung endpoint cannot
/// stall a worker past its task bound.
pub struct HttpRemediator {
    http_client: ReqwestClient,
    url: String,
}

impl HttpRemediator {
    pub fn new(url: impl Into<String>, request_timeout: Duration) -> anyhow::Result<Self> {
        let http_client = ReqwestClient::builder()
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }

    async fn send(&self, envelope: &TaskEnvelope) -> RemediationOutcome {
        let request = RemediatorRequest {
            task_id: &envelope.task_id,
            action_id: envelope.action_id,
            target: &envelope.target,
            action: envelope.action.as_str(),
            severity: envelope.severity.as_str(),
            params: &envelope.params,
            attempt: envelope.attempt,
        };

        let response = self
            .http_client
            .post(&self.url)
            .header("Idempotency-Key", envelope.idempotency_key())
            .json(&request)
            .send()
            .await;

        let response = match response {
            Ok(response) => response,
            Err(err) => {
                return RemediationOutcome::Transient {
                    reason: format!("request failed: {err}"),
                };
            }
        };

        let status = response.status();
        if status.is_success() {
            return match response.json::<RemediatorResponse>().await {
                Ok(body) if body.status == "success" => RemediationOutcome::Success {
                    detail: body.detail,
                },
                Ok(body) => RemediationOutcome::Permanent {
                    reason: body
                        .detail
                        .unwrap_or_else(|| format!("remediator reported `{}`", body.status)),
                },
                Err(err) => RemediationOutcome::Permanent {
                    reason: format!("unparseable remediator response: {err}"),
                },
            };
        }

        classify_error_status(status)
    }
}

/// Map a non-2xx status onto the retry taxonomy: overload and server-side
/// hiccups are transient, everything the caller can never fix is permanent.
fn classify_error_status(status: StatusCode) -> RemediationOutcome {
    let retryable = matches!(
        status,
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_EARLY | StatusCode::TOO_MANY_REQUESTS
    ) || (status.is_server_error() && status != StatusCode::NOT_IMPLEMENTED);

    if retryable {
        RemediationOutcome::Transient {
            reason: format!("remediator returned {status}"),
        }
    } else {
        RemediationOutcome::Permanent {
            reason: format!("remediator returned {status}"),
        }
    }
}

#[async_trait]
impl Remediator for HttpRemediator {
    async fn dispatch(&self, envelope: &TaskEnvelope) -> RemediationOutcome {
        let outcome = self.send(envelope).await;
        debug!(
            task_id = %envelope.task_id,
            target = %envelope.target,
            attempt = envelope.attempt,
            success = outcome.is_success(),
            "remediator dispatch finished"
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overload_statuses_are_transient() {
        for code in [408, 425, 429, 500, 502, 503, 504] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(
                matches!(
                    classify_error_status(status),
                    RemediationOutcome::Transient { .. }
                ),
                "{code} should be transient"
            );
        }
    }

    #[test]
    fn client_errors_and_not_implemented_are_permanent() {
        for code in [400, 403, 404, 409, 422, 501] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(
                matches!(
                    classify_error_status(status),
                    RemediationOutcome::Permanent { .. }
                ),
                "{code} should be permanent"
            );
        }
    }
}

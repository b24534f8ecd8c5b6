//! Long-running operation completion.
//!
//! Resource Manager answers slow writes with `201 Created` or `202 Accepted`
//! and a status URL in `Azure-AsyncOperation` or `Location`. A call is only
//! complete once that URL reports a terminal state, so the operations in this
//! crate poll it before returning.

use reqwest::header::{HeaderMap, LOCATION, RETRY_AFTER};
use reqwest::{Method, Response, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};
use url::Url;

use super::models::OperationStatus;
use super::ArmClient;
use crate::error::{Error, Result};

const AZURE_ASYNC_OPERATION: &str = "azure-asyncoperation";

/// How a pending operation reports progress.
#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusSource {
    /// `Azure-AsyncOperation`: a status document, optionally with a
    /// `Location` that holds the final result.
    AsyncOperation { status: Url, result: Option<Url> },
    /// `Location`: returns 202 until done, then the result.
    Location(Url),
}

impl StatusSource {
    /// `Location` only signals a pending operation on 201 and 202;
    /// `Azure-AsyncOperation` does so on any success status.
    fn from_response(status: StatusCode, headers: &HeaderMap) -> Result<Option<Self>> {
        let async_op = header_url(headers, AZURE_ASYNC_OPERATION)?;
        let location = if is_accepted(status) {
            header_url(headers, LOCATION.as_str())?
        } else {
            None
        };

        Ok(match (async_op, location) {
            (Some(status), result) => Some(Self::AsyncOperation { status, result }),
            (None, Some(location)) => Some(Self::Location(location)),
            (None, None) => None,
        })
    }
}

fn is_accepted(status: StatusCode) -> bool {
    status == StatusCode::CREATED || status == StatusCode::ACCEPTED
}

/// Whether `response` starts an operation that [`complete`] will poll.
pub(crate) fn is_pending(response: &Response) -> bool {
    let headers = response.headers();
    response.status().is_success()
        && (headers.contains_key(AZURE_ASYNC_OPERATION)
            || (is_accepted(response.status()) && headers.contains_key(LOCATION)))
}

fn header_url(headers: &HeaderMap, name: &str) -> Result<Option<Url>> {
    match headers.get(name).and_then(|v| v.to_str().ok()) {
        Some(value) if !value.is_empty() => Ok(Some(Url::parse(value)?)),
        _ => Ok(None),
    }
}

/// `Retry-After` in seconds, if the service sent one.
fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Read a response body as JSON, treating an empty body as `None`.
async fn optional_json(response: Response, operation: &str) -> Result<Option<Value>> {
    let body = response.text().await?;
    if body.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&body)
        .map(Some)
        .map_err(|e| Error::unexpected(operation, e.to_string()))
}

/// Wait for the operation started by `response` to finish.
///
/// Returns the final response body, if the service produced one.
pub(crate) async fn complete(
    client: &ArmClient,
    response: Response,
    operation: &str,
) -> Result<Option<Value>> {
    let source = if response.status().is_success() {
        StatusSource::from_response(response.status(), response.headers())?
    } else {
        None
    };

    let Some(source) = source else {
        return optional_json(response, operation).await;
    };

    let mut delay = retry_after(response.headers()).unwrap_or(client.poll_interval());
    let initial = optional_json(response, operation).await?;
    // No deadline when the timeout does not fit in an Instant.
    let deadline = Instant::now().checked_add(client.operation_timeout());

    debug!(operation, ?source, "Waiting for long-running operation");

    loop {
        let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
        if remaining.is_some_and(|remaining| delay > remaining) {
            return Err(Error::OperationFailed {
                operation: operation.to_string(),
                status: "TimedOut".to_string(),
            });
        }
        tokio::time::sleep(delay).await;

        match &source {
            StatusSource::AsyncOperation { status, result } => {
                let response = client
                    .send::<()>(Method::GET, status.clone(), None, operation)
                    .await?;
                let next_delay = retry_after(response.headers());
                let body: OperationStatus = super::parse_json(response, operation).await?;

                match body.status.to_ascii_lowercase().as_str() {
                    "succeeded" => {
                        info!(operation, "Long-running operation succeeded");
                        return match result {
                            Some(url) => fetch_result(client, url.clone(), operation).await,
                            None => Ok(initial),
                        };
                    }
                    "failed" | "canceled" | "cancelled" => {
                        let status = match body.error {
                            Some(err) if !err.message.is_empty() => {
                                format!("{}: {}: {}", body.status, err.code, err.message)
                            }
                            _ => body.status,
                        };
                        return Err(Error::OperationFailed {
                            operation: operation.to_string(),
                            status,
                        });
                    }
                    other => {
                        debug!(operation, status = other, "Operation still running");
                        delay = next_delay.unwrap_or(client.poll_interval());
                    }
                }
            }
            StatusSource::Location(url) => {
                let response = client
                    .send::<()>(Method::GET, url.clone(), None, operation)
                    .await?;
                if response.status() == StatusCode::ACCEPTED {
                    delay = retry_after(response.headers()).unwrap_or(client.poll_interval());
                    continue;
                }
                info!(operation, "Long-running operation completed");
                return optional_json(response, operation).await;
            }
        }
    }
}

async fn fetch_result(client: &ArmClient, url: Url, operation: &str) -> Result<Option<Value>> {
    let response = client.send::<()>(Method::GET, url, None, operation).await?;
    optional_json(response, operation).await
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use consultas_app::{CellValue, FormValues, QueryId, QueryResult};
use reqwest::StatusCode;
use reqwest::blocking::Client as HttpClient;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

const QUERY_PATH: &str = "api/consulta";
const HEALTH_PATH: &str = "health";
const MAX_BODY_IN_MESSAGE: usize = 200;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("cannot reach {base_url} -- check that the query server is running ({source})")]
    Connection {
        base_url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP error {status} {status_text}{}", detail_suffix(.body))]
    Http {
        status: u16,
        status_text: String,
        body: String,
    },
    #[error("malformed response: {0}")]
    Schema(String),
}

impl DispatchError {
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Connection { .. } => "connection",
            Self::Http { .. } => "http",
            Self::Schema(_) => "schema",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    timeout: Option<Duration>,
    http: HttpClient,
}

impl Client {
    /// `timeout` of `None` waits on the server indefinitely.
    pub fn new(base_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let base_url = validate_base_url(base_url)?;
        let http = HttpClient::builder()
            .timeout(timeout)
            .build()
            .context("build HTTP client")?;

        Ok(Self {
            base_url,
            timeout,
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn query_url(&self, query_id: QueryId) -> String {
        format!("{}/{QUERY_PATH}/{query_id}", self.base_url)
    }

    pub fn dispatch(
        &self,
        query_id: QueryId,
        params: &FormValues,
    ) -> Result<QueryResult, DispatchError> {
        let url = self.query_url(query_id);
        debug!(%url, fields = params.len(), "sending query");

        let response = self
            .http
            .post(&url)
            .json(params)
            .send()
            .map_err(|source| DispatchError::Connection {
                base_url: self.base_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(%url, status = status.as_u16(), "query server returned an error status");
            return Err(http_error(status, body));
        }

        let body = response
            .text()
            .map_err(|error| DispatchError::Schema(format!("read response body: {error}")))?;
        let result = parse_result(&body)?;
        debug!(%url, rows = result.row_count(), "query returned");
        Ok(result)
    }

    pub fn ping(&self) -> Result<()> {
        let url = format!("{}/{HEALTH_PATH}", self.base_url);
        let response = self.http.get(&url).send().map_err(|source| {
            anyhow!(DispatchError::Connection {
                base_url: self.base_url.clone(),
                source,
            })
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!(
                "health check at {url} failed: {}",
                http_error(status, body)
            );
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawResult {
    columns: Option<Vec<String>>,
    rows: Option<Vec<Vec<CellValue>>>,
}

#[derive(Debug, Deserialize)]
struct DetailEnvelope {
    detail: String,
}

/// Decodes a success body into a result, rejecting anything but a JSON
/// object, objects without `columns` or `rows`, and rows that disagree with
/// the column count.
pub fn parse_result(body: &str) -> Result<QueryResult, DispatchError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|error| DispatchError::Schema(format!("response is not JSON: {error}")))?;
    if !value.is_object() {
        return Err(DispatchError::Schema(format!(
            "response is not a result object (got {})",
            json_kind(&value)
        )));
    }
    let raw: RawResult = serde_json::from_value(value)
        .map_err(|error| DispatchError::Schema(format!("response is not a result object: {error}")))?;
    let columns = raw
        .columns
        .ok_or_else(|| DispatchError::Schema("response has no 'columns' field".to_owned()))?;
    let rows = raw
        .rows
        .ok_or_else(|| DispatchError::Schema("response has no 'rows' field".to_owned()))?;
    QueryResult::new(columns, rows).map_err(|error| DispatchError::Schema(error.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn http_error(status: StatusCode, body: String) -> DispatchError {
    DispatchError::Http {
        status: status.as_u16(),
        status_text: status.canonical_reason().unwrap_or_default().to_owned(),
        body,
    }
}

fn detail_suffix(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<DetailEnvelope>(body)
        && !envelope.detail.trim().is_empty()
    {
        return format!(": {}", envelope.detail.trim());
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.chars().count() > MAX_BODY_IN_MESSAGE {
        let head = trimmed.chars().take(MAX_BODY_IN_MESSAGE).collect::<String>();
        return format!(": {head}...");
    }
    format!(": {trimmed}")
}

fn validate_base_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        bail!("server.base_url must not be empty");
    }
    let parsed = Url::parse(trimmed)
        .with_context(|| format!("server.base_url {trimmed:?} is not a valid URL"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!(
            "server.base_url {trimmed:?} must use http or https, got {:?}",
            parsed.scheme()
        );
    }
    Ok(trimmed.to_owned())
}

// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow};
use consultas_app::{CellValue, QueryResult};
use serde_json::json;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tiny_http::{Header, Response, Server};

const IDLE_TIMEOUT: Duration = Duration::from_secs(5);

const STUDENT_NAMES: [&str; 12] = [
    "Zhang", "Shankar", "Brandt", "Chavez", "Peltier", "Levy", "Williams", "Sanchez", "Snow",
    "Brown", "Aoi", "Bourikas",
];

const DEPARTMENTS: [&str; 5] = ["Comp. Sci.", "Physics", "Elec. Eng.", "History", "Finance"];

/// `count` rows of `[id, name, department, credits]`.
pub fn student_rows(count: usize) -> Vec<Vec<CellValue>> {
    (0..count)
        .map(|index| {
            vec![
                CellValue::Text(format!("{:05}", 10_000 + index)),
                CellValue::from(STUDENT_NAMES[index % STUDENT_NAMES.len()]),
                CellValue::from(DEPARTMENTS[index % DEPARTMENTS.len()]),
                CellValue::Integer(90 + (index as i64 % 40)),
            ]
        })
        .collect()
}

pub fn student_columns() -> Vec<String> {
    ["ID", "Nombre", "Departamento", "Créditos"]
        .into_iter()
        .map(str::to_owned)
        .collect()
}

pub fn student_result(count: usize) -> QueryResult {
    match QueryResult::new(student_columns(), student_rows(count)) {
        Ok(result) => result,
        Err(error) => unreachable!("student fixture rows match columns: {error}"),
    }
}

pub fn result_body(columns: &[&str], rows: &[Vec<CellValue>]) -> String {
    json!({ "columns": columns, "rows": rows }).to_string()
}

pub fn detail_body(detail: &str) -> String {
    json!({ "detail": detail }).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
    pub content_type: &'static str,
}

impl CannedResponse {
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: "application/json",
        }
    }

    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            content_type: "text/plain",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub url: String,
    pub content_type: Option<String>,
    pub body: String,
}

/// Serves the canned responses in order, one per request, on a background
/// thread. Stops early once no request arrives for a few seconds.
pub struct MockQueryServer {
    base_url: String,
    handle: JoinHandle<Result<Vec<RecordedRequest>>>,
}

impl MockQueryServer {
    pub fn start(responses: Vec<CannedResponse>) -> Result<Self> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let base_url = format!("http://{}", server.server_addr());

        let handle = thread::spawn(move || serve(&server, responses));
        Ok(Self { base_url, handle })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn finish(self) -> Result<Vec<RecordedRequest>> {
        self.handle
            .join()
            .map_err(|_| anyhow!("mock server thread panicked"))?
    }
}

fn serve(server: &Server, responses: Vec<CannedResponse>) -> Result<Vec<RecordedRequest>> {
    let mut recorded = Vec::new();
    for canned in responses {
        let Some(mut request) = server
            .recv_timeout(IDLE_TIMEOUT)
            .context("receive mock request")?
        else {
            break;
        };

        let mut body = String::new();
        request
            .as_reader()
            .read_to_string(&mut body)
            .context("read mock request body")?;
        let content_type = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Content-Type"))
            .map(|header| header.value.as_str().to_owned());
        recorded.push(RecordedRequest {
            method: request.method().to_string(),
            url: request.url().to_owned(),
            content_type,
            body,
        });

        let header = Header::from_bytes("Content-Type", canned.content_type)
            .map_err(|()| anyhow!("invalid content type {:?}", canned.content_type))?;
        let response = Response::from_string(canned.body)
            .with_status_code(canned.status)
            .with_header(header);
        request.respond(response).context("send mock response")?;
    }
    Ok(recorded)
}

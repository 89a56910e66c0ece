// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, anyhow};
use consultas_app::{FormValues, QueryId, QueryResult, Submission};
use consultas_client::Client;
use consultas_tui::{AppRuntime, InternalEvent};
use std::sync::mpsc::Sender;
use std::thread;
use tracing::{debug, warn};

pub struct HttpRuntime {
    client: Client,
}

impl HttpRuntime {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl AppRuntime for HttpRuntime {
    fn run_query(&mut self, query_id: QueryId, params: &FormValues) -> Result<QueryResult> {
        Ok(self.client.dispatch(query_id, params)?)
    }

    fn spawn_query(&mut self, submission: Submission, tx: Sender<InternalEvent>) -> Result<()> {
        let client = self.client.clone();
        thread::Builder::new()
            .name(format!("query-{}", submission.query_id))
            .spawn(move || {
                let outcome = client
                    .dispatch(submission.query_id, &submission.params)
                    .map_err(|error| {
                        warn!(
                            query = %submission.query_id,
                            kind = error.kind(),
                            %error,
                            "query dispatch failed"
                        );
                        error.to_string()
                    });
                let event = InternalEvent::Dispatch {
                    generation: submission.generation,
                    outcome,
                };
                if tx.send(event).is_err() {
                    debug!("ui closed before query finished");
                }
            })
            .map_err(|error| anyhow!("spawn query worker: {error}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::HttpRuntime;
    use anyhow::Result;
    use consultas_app::{FormValues, QueryId, RequestGeneration, Submission};
    use consultas_client::Client;
    use consultas_testkit::{CannedResponse, MockQueryServer, result_body, student_rows};
    use consultas_tui::{AppRuntime, InternalEvent};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn run_query_returns_decoded_rows() -> Result<()> {
        let server = MockQueryServer::start(vec![CannedResponse::json(
            200,
            result_body(&["ID", "Nombre", "Departamento", "Créditos"], &student_rows(3)),
        )])?;
        let mut runtime = HttpRuntime::new(Client::new(server.base_url(), None)?);

        let result = runtime.run_query(
            QueryId::new(5),
            &FormValues::from_iter([("studentName", "Zhang")]),
        )?;
        assert_eq!(result.row_count(), 3);
        server.finish()?;
        Ok(())
    }

    #[test]
    fn spawned_query_reports_outcome_with_its_generation() -> Result<()> {
        let server = MockQueryServer::start(vec![CannedResponse::text(500, "boom")])?;
        let mut runtime = HttpRuntime::new(Client::new(server.base_url(), None)?);
        let (tx, rx) = mpsc::channel();
        let generation = RequestGeneration::new(7);

        runtime.spawn_query(
            Submission {
                generation,
                query_id: QueryId::new(9),
                params: FormValues::new(),
            },
            tx,
        )?;

        let event = rx.recv_timeout(Duration::from_secs(5))?;
        match event {
            InternalEvent::Dispatch {
                generation: reported,
                outcome,
            } => {
                assert_eq!(reported, generation);
                let message = outcome.expect_err("500 should fail");
                assert!(message.contains("HTTP error 500"), "{message}");
            }
            other => panic!("expected dispatch outcome, got {other:?}"),
        }
        server.finish()?;
        Ok(())
    }
}

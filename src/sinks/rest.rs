//! Batched statement submission to a remote ingestion endpoint.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use log::{debug, info};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::{json, Value};

use crate::constants::REST_BATCH_SIZE;
use crate::models::{EdgeKind, OutputEdge};

use super::OutputSink;

/// Transport seam under the batching logic.
pub trait RestTransport: Send {
    /// Submits one serialized batch and returns the endpoint's raw
    /// response body.
    fn submit(&mut self, body: &Value) -> Result<String>;
}

/// Synchronous HTTP transport with basic-auth credentials.
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    url: String,
    username: String,
    password: String,
}

impl HttpTransport {
    pub fn new(url: &str, username: &str, password: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(HttpTransport {
            client,
            url: url.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        })
    }
}

impl RestTransport for HttpTransport {
    fn submit(&mut self, body: &Value) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json; charset=UTF-8")
            .json(body)
            .send()
            .with_context(|| format!("Failed to submit statement batch to {}", self.url))?;

        let status = response.status();
        let text = response
            .text()
            .context("Failed to read endpoint response")?;
        if !status.is_success() {
            return Err(anyhow!("Endpoint returned {}: {}", status, text));
        }
        Ok(text)
    }
}

/// Accumulates statements keyed by edge kind and submits full batches of
/// [`REST_BATCH_SIZE`]. `finish` always performs one final submission of
/// the remainder, empty or not, and surfaces the endpoint's raw response.
/// Submission failures are fatal; there is no retry.
pub struct RestSink {
    transport: Box<dyn RestTransport>,
    statements: BTreeMap<EdgeKind, Vec<Value>>,
    pending: usize,
}

impl RestSink {
    pub fn new(transport: Box<dyn RestTransport>) -> Self {
        RestSink {
            transport,
            statements: BTreeMap::new(),
            pending: 0,
        }
    }

    pub fn connect(url: &str, username: &str, password: &str) -> Result<Self> {
        Ok(RestSink::new(Box::new(HttpTransport::new(
            url, username, password,
        )?)))
    }

    fn submit_batch(&mut self) -> Result<String> {
        let statements: Vec<Value> = std::mem::take(&mut self.statements)
            .into_iter()
            .map(|(kind, params)| {
                json!({
                    "type": kind.type_tag(),
                    "params": params,
                })
            })
            .collect();
        let count = self.pending;
        self.pending = 0;

        let body = json!({ "statements": statements });
        let response = self.transport.submit(&body)?;
        debug!("Submitted batch of {} statements", count);
        Ok(response)
    }
}

impl OutputSink for RestSink {
    fn receive(&mut self, edge: OutputEdge) -> Result<()> {
        let kind = edge.kind();
        for params in edge.statement_params() {
            if self.pending == REST_BATCH_SIZE {
                self.submit_batch()?;
            }
            self.statements.entry(kind).or_default().push(params);
            self.pending += 1;
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        let response = self.submit_batch()?;
        info!("Endpoint response: {}", response);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::models::{SessionEdge, TrustDirection, TrustKind};

    #[derive(Clone, Default)]
    struct RecordingTransport {
        bodies: Arc<Mutex<Vec<Value>>>,
    }

    impl RestTransport for RecordingTransport {
        fn submit(&mut self, body: &Value) -> Result<String> {
            self.bodies.lock().unwrap().push(body.clone());
            Ok(r#"{"results":[]}"#.to_string())
        }
    }

    struct FailingTransport;

    impl RestTransport for FailingTransport {
        fn submit(&mut self, _body: &Value) -> Result<String> {
            Err(anyhow!("connection refused"))
        }
    }

    fn session_edge(n: usize) -> OutputEdge {
        OutputEdge::Session(SessionEdge {
            user_name: format!("USER{}@TESTLAB.LOCAL", n),
            computer_name: "ws01.testlab.local".to_string(),
            weight: 2,
        })
    }

    fn statement_count(body: &Value) -> usize {
        body["statements"]
            .as_array()
            .expect("statements array")
            .iter()
            .map(|s| s["params"].as_array().expect("params array").len())
            .sum()
    }

    fn run_sink(edges: usize) -> Vec<Value> {
        let transport = RecordingTransport::default();
        let bodies = transport.bodies.clone();
        let mut sink = RestSink::new(Box::new(transport));
        for n in 0..edges {
            sink.receive(session_edge(n)).expect("receive");
        }
        sink.finish().expect("finish");
        let bodies = bodies.lock().unwrap();
        bodies.clone()
    }

    #[test]
    fn test_zero_records_submit_one_empty_batch() {
        let bodies = run_sink(0);
        assert_eq!(bodies.len(), 1);
        assert_eq!(statement_count(&bodies[0]), 0);
        assert!(bodies[0]["statements"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_submission_count_is_batch_ceiling() {
        for (records, expected_submissions, expected_last) in [
            (1, 1, 1),
            (499, 1, 499),
            (500, 1, 500),
            (501, 2, 1),
            (1000, 2, 500),
            (1203, 3, 203),
        ] {
            let bodies = run_sink(records);
            assert_eq!(bodies.len(), expected_submissions, "records {}", records);
            assert_eq!(
                statement_count(bodies.last().expect("at least one submission")),
                expected_last,
                "records {}",
                records
            );
            for body in &bodies[..bodies.len() - 1] {
                assert_eq!(statement_count(body), REST_BATCH_SIZE);
            }
        }
    }

    #[test]
    fn test_statements_group_by_kind_with_type_tags() {
        let transport = RecordingTransport::default();
        let bodies = transport.bodies.clone();
        let mut sink = RestSink::new(Box::new(transport));

        sink.receive(session_edge(0)).expect("receive");
        sink.receive(session_edge(1)).expect("receive");
        sink.receive(OutputEdge::DomainTrust(crate::models::DomainTrustEdge {
            source_domain: "TESTLAB.LOCAL".to_string(),
            target_domain: "EXTERNAL.LOCAL".to_string(),
            direction: TrustDirection::Bidirectional,
            kind: TrustKind::External,
            transitive: true,
        }))
        .expect("receive");
        sink.finish().expect("finish");

        let bodies = bodies.lock().unwrap();
        assert_eq!(bodies.len(), 1);
        let statements = bodies[0]["statements"].as_array().unwrap();
        assert_eq!(statements.len(), 2);

        let tags: Vec<&str> = statements
            .iter()
            .map(|s| s["type"].as_str().unwrap())
            .collect();
        assert!(tags.contains(&"session"));
        assert!(tags.contains(&"domain_trust"));

        // The bidirectional trust contributes a statement per direction.
        let trust = statements
            .iter()
            .find(|s| s["type"] == "domain_trust")
            .unwrap();
        assert_eq!(trust["params"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_submission_failure_is_fatal() {
        let mut sink = RestSink::new(Box::new(FailingTransport));
        for n in 0..REST_BATCH_SIZE {
            sink.receive(session_edge(n)).expect("receive under threshold");
        }
        // The next statement would overflow the batch and forces a submit.
        assert!(sink.receive(session_edge(REST_BATCH_SIZE)).is_err());

        let mut sink = RestSink::new(Box::new(FailingTransport));
        assert!(sink.finish().is_err());
    }
}

//! Common test utilities for integration tests
//!
//! - An in-memory [`FakeGateway`] with scripted responses and a call log
//! - Router construction against the fake
//! - Session token generation
//! - A request helper that returns status and JSON body

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use regnum_api::app::{build_router, AppState};
use regnum_api::config::Config;
use regnum_shared::auth::jwt::SessionIdentity;
use regnum_shared::db::gateway::{
    DataGateway, DbError, QueryDescriptor, Record, StatementOutcome,
};
use regnum_shared::models::user::Role;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "integration-test-secret-at-least-32-chars";

/// A statement the fake gateway received
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Query(QueryDescriptor),
    Transaction(Vec<QueryDescriptor>),
}

enum Scripted {
    Rows(Vec<Record>),
    Outcomes(Vec<StatementOutcome>),
    Error(DbError),
}

/// In-memory [`DataGateway`]
///
/// Responses are consumed in order. With nothing scripted, queries return no
/// rows and transactions return one empty outcome per statement.
#[derive(Default)]
pub struct FakeGateway {
    script: Mutex<VecDeque<Scripted>>,
    calls: Mutex<Vec<Call>>,
    unreachable: bool,
}

impl FakeGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A gateway whose ping fails
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            unreachable: true,
            ..Self::default()
        })
    }

    pub fn push_rows(&self, rows: Vec<Value>) {
        let rows = rows.into_iter().map(record).collect();
        self.script.lock().unwrap().push_back(Scripted::Rows(rows));
    }

    pub fn push_outcomes(&self, outcomes: Vec<StatementOutcome>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Outcomes(outcomes));
    }

    pub fn push_error(&self, error: DbError) {
        self.script.lock().unwrap().push_back(Scripted::Error(error));
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    fn next(&self) -> Option<Scripted> {
        self.script.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl DataGateway for FakeGateway {
    async fn query(&self, descriptor: &QueryDescriptor) -> Result<Vec<Record>, DbError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Query(descriptor.clone()));

        match self.next() {
            None => Ok(Vec::new()),
            Some(Scripted::Rows(rows)) => Ok(rows),
            Some(Scripted::Outcomes(mut outcomes)) => {
                Ok(outcomes.pop().map(|o| o.rows).unwrap_or_default())
            }
            Some(Scripted::Error(e)) => Err(e),
        }
    }

    async fn transaction(
        &self,
        statements: &[QueryDescriptor],
    ) -> Result<Vec<StatementOutcome>, DbError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Transaction(statements.to_vec()));

        match self.next() {
            None => Ok(vec![StatementOutcome::default(); statements.len()]),
            Some(Scripted::Outcomes(outcomes)) => Ok(outcomes),
            Some(Scripted::Rows(rows)) => Ok(vec![StatementOutcome {
                rows,
                rows_affected: 1,
            }]),
            Some(Scripted::Error(e)) => Err(e),
        }
    }

    async fn ping(&self) -> Result<(), DbError> {
        if self.unreachable {
            Err(DbError::Sqlx(sqlx::Error::PoolTimedOut))
        } else {
            Ok(())
        }
    }
}

/// Converts a JSON object literal into a gateway record
pub fn record(value: Value) -> Record {
    value
        .as_object()
        .cloned()
        .expect("record literals must be JSON objects")
}

/// Outcome holding `rows`
pub fn outcome(rows: Vec<Value>) -> StatementOutcome {
    StatementOutcome {
        rows_affected: rows.len() as u64,
        rows: rows.into_iter().map(record).collect(),
    }
}

pub fn test_config() -> Config {
    let vars = [
        ("DB_HOST", "localhost"),
        ("DB_USER", "regnum"),
        ("DB_NAME", "regnum_test"),
        ("JWT_SECRET", TEST_JWT_SECRET),
        ("JWT_EXPIRES_IN", "1h"),
    ];
    Config::from_lookup(|name| {
        vars.iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.to_string())
    })
    .expect("test configuration must be valid")
}

/// Test context: router, state and the fake behind them
pub struct TestContext {
    pub app: Router,
    pub state: AppState,
    pub db: Arc<FakeGateway>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_gateway(FakeGateway::new())
    }

    pub fn with_gateway(db: Arc<FakeGateway>) -> Self {
        let state = AppState::new(db.clone(), test_config());
        Self {
            app: build_router(state.clone()),
            state,
            db,
        }
    }

    /// Signed token for a session with `role` and `organization_id`
    pub fn token(&self, user_id: i64, role: Role, organization_id: Option<i64>) -> String {
        self.state
            .tokens
            .issue(&SessionIdentity {
                user_id,
                email: format!("user{user_id}@example.com"),
                role,
                organization_id,
            })
            .expect("token issuance must succeed")
    }

    /// Sends a request and returns its status and JSON body (`Null` if empty)
    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string())),
            None => builder.body(Body::empty()),
        }
        .unwrap();

        self.send_request(request).await
    }

    pub async fn send_request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, body)
    }
}

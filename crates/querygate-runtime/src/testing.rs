//! In-memory [`ConnectionPool`] for tests.
//!
//! Statements are answered by a handler closure. The pool counts checkouts
//! and releases so tests can assert the one-acquire/one-release discipline,
//! and can inject execution latency or acquisition failures.

use crate::pool::{ConnectionPool, PoolError, PooledConnection, RawResult};
use async_trait::async_trait;
use querygate_core::{Record, Scalar};
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Handler = Arc<dyn Fn(&str, &[Scalar]) -> Result<RawResult, PoolError> + Send + Sync>;

/// Snapshot of the pool's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub acquisitions: usize,
    pub releases: usize,
    pub executions: usize,
    pub run_one_calls: usize,
}

#[derive(Default)]
struct Counters {
    acquisitions: AtomicUsize,
    releases: AtomicUsize,
    executions: AtomicUsize,
    run_one_calls: AtomicUsize,
}

/// A row of the fake `users` table.
#[derive(Debug, Clone)]
pub struct StoredUser {
    pub username: String,
    pub password: String,
    pub role: String,
}

impl StoredUser {
    pub fn new(username: &str, password: &str, role: &str) -> Self {
        Self {
            username: username.to_string(),
            password: password.to_string(),
            role: role.to_string(),
        }
    }
}

pub struct FakePool {
    handler: Handler,
    counters: Arc<Counters>,
    latency: Option<Duration>,
    acquire_error: Option<String>,
    executed: Arc<Mutex<Vec<(String, Vec<Scalar>)>>>,
}

impl FakePool {
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, &[Scalar]) -> Result<RawResult, PoolError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(handler),
            counters: Arc::new(Counters::default()),
            latency: None,
            acquire_error: None,
            executed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Every statement succeeds with no rows.
    pub fn empty() -> Self {
        Self::new(|statement, _| Ok(no_rows(statement)))
    }

    /// Answers the authenticator's user-table queries from `users`; anything
    /// else succeeds with no rows.
    pub fn with_users(users: Vec<StoredUser>) -> Self {
        Self::new(move |statement, params| Ok(answer_users_query(&users, statement, params)))
    }

    /// Sleep this long inside every execution.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Make every `acquire`/`run_one` fail as if the pool were exhausted.
    pub fn failing_acquire(mut self, message: &str) -> Self {
        self.acquire_error = Some(message.to_string());
        self
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            acquisitions: self.counters.acquisitions.load(Ordering::SeqCst),
            releases: self.counters.releases.load(Ordering::SeqCst),
            executions: self.counters.executions.load(Ordering::SeqCst),
            run_one_calls: self.counters.run_one_calls.load(Ordering::SeqCst),
        }
    }

    /// Statements seen so far, with their parameters.
    pub fn executed(&self) -> Vec<(String, Vec<Scalar>)> {
        self.executed.lock().map(|v| v.clone()).unwrap_or_default()
    }

    async fn run(&self, statement: &str, parameters: &[Scalar]) -> Result<RawResult, PoolError> {
        run_handler(
            &self.handler,
            &self.counters,
            &self.executed,
            self.latency,
            statement,
            parameters,
        )
        .await
    }
}

#[async_trait]
impl ConnectionPool for FakePool {
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>, PoolError> {
        if let Some(message) = &self.acquire_error {
            return Err(PoolError::Unavailable(message.clone()));
        }
        self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeConnection {
            handler: self.handler.clone(),
            counters: self.counters.clone(),
            executed: self.executed.clone(),
            latency: self.latency,
        }))
    }

    async fn run_one(
        &self,
        statement: &str,
        parameters: &[Scalar],
    ) -> Result<RawResult, PoolError> {
        if let Some(message) = &self.acquire_error {
            return Err(PoolError::Unavailable(message.clone()));
        }
        self.counters.run_one_calls.fetch_add(1, Ordering::SeqCst);
        self.run(statement, parameters).await
    }
}

struct FakeConnection {
    handler: Handler,
    counters: Arc<Counters>,
    executed: Arc<Mutex<Vec<(String, Vec<Scalar>)>>>,
    latency: Option<Duration>,
}

#[async_trait]
impl PooledConnection for FakeConnection {
    async fn execute(
        &mut self,
        statement: &str,
        parameters: &[Scalar],
    ) -> Result<RawResult, PoolError> {
        run_handler(
            &self.handler,
            &self.counters,
            &self.executed,
            self.latency,
            statement,
            parameters,
        )
        .await
    }

    fn release(self: Box<Self>) {
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

async fn run_handler(
    handler: &Handler,
    counters: &Counters,
    executed: &Mutex<Vec<(String, Vec<Scalar>)>>,
    latency: Option<Duration>,
    statement: &str,
    parameters: &[Scalar],
) -> Result<RawResult, PoolError> {
    counters.executions.fetch_add(1, Ordering::SeqCst);
    if let Ok(mut seen) = executed.lock() {
        seen.push((statement.to_string(), parameters.to_vec()));
    }
    if let Some(latency) = latency {
        tokio::time::sleep(latency).await;
    }
    handler(statement, parameters)
}

/// Build a record from column/value pairs.
pub fn record(pairs: &[(&str, Value)]) -> Record {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

/// Successful result with the given rows, reported as a SELECT.
pub fn select_result(rows: Vec<Record>) -> RawResult {
    RawResult {
        command: "SELECT".to_string(),
        row_count: rows.len() as u64,
        rows,
    }
}

fn no_rows(statement: &str) -> RawResult {
    RawResult {
        command: statement
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_uppercase(),
        row_count: 0,
        rows: Vec::new(),
    }
}

fn text_param(params: &[Scalar], index: usize) -> Option<&str> {
    match params.get(index) {
        Some(Scalar::Text(s)) => Some(s.as_str()),
        _ => None,
    }
}

fn answer_users_query(users: &[StoredUser], statement: &str, params: &[Scalar]) -> RawResult {
    let summary = |u: &StoredUser| {
        record(&[
            ("username", Value::from(u.username.clone())),
            ("role", Value::from(u.role.clone())),
        ])
    };

    if statement.contains("WHERE username = $1 AND password = $2") {
        let (Some(name), Some(password)) = (text_param(params, 0), text_param(params, 1)) else {
            return select_result(Vec::new());
        };
        let rows = users
            .iter()
            .filter(|u| u.username == name && u.password == password)
            .map(summary)
            .collect();
        return select_result(rows);
    }

    if statement.contains("WHERE username = $1") {
        let Some(name) = text_param(params, 0) else {
            return select_result(Vec::new());
        };
        let rows = users
            .iter()
            .filter(|u| u.username == name)
            .map(|u| {
                record(&[
                    ("username", Value::from(u.username.clone())),
                    ("password", Value::from(u.password.clone())),
                    ("role", Value::from(u.role.clone())),
                ])
            })
            .collect();
        return select_result(rows);
    }

    if statement.contains("ORDER BY role, username") {
        let mut sorted: Vec<&StoredUser> = users.iter().collect();
        sorted.sort_by(|a, b| (&a.role, &a.username).cmp(&(&b.role, &b.username)));
        return select_result(sorted.into_iter().map(summary).collect());
    }

    no_rows(statement)
}

//! Connection pool contract.
//!
//! The gateway never owns connections itself. A [`ConnectionPool`] hands out
//! [`PooledConnection`]s, and every checkout made by the dispatcher goes
//! through [`ScopedConnection`], which guarantees the matching release on
//! every exit path (success, error, or the caller's future being dropped).

use async_trait::async_trait;
use querygate_core::{Record, Scalar};
use thiserror::Error;

/// What the backend reported for one statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawResult {
    /// Command the backend says it ran, e.g. "SELECT".
    pub command: String,
    /// Rows returned (queries) or affected (DML).
    pub row_count: u64,
    pub rows: Vec<Record>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No connection could be obtained (exhaustion, timeout, connectivity).
    #[error("connection unavailable: {0}")]
    Unavailable(String),

    /// The backend rejected or failed the statement.
    #[error("{0}")]
    Execution(String),
}

impl PoolError {
    pub fn message(&self) -> &str {
        match self {
            PoolError::Unavailable(message) | PoolError::Execution(message) => message,
        }
    }
}

/// A bounded set of live connections, safe for concurrent use.
#[async_trait]
pub trait ConnectionPool: Send + Sync {
    /// Check out a connection. May wait, bounded by the pool's own timeout.
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>, PoolError>;

    /// Run one statement without manual connection lifecycle.
    async fn run_one(&self, statement: &str, parameters: &[Scalar])
    -> Result<RawResult, PoolError>;
}

/// A checked-out connection.
#[async_trait]
pub trait PooledConnection: Send {
    /// Execute `statement` with positional `parameters` ($1, $2, ...).
    async fn execute(
        &mut self,
        statement: &str,
        parameters: &[Scalar],
    ) -> Result<RawResult, PoolError>;

    /// Return the connection to its pool. Must be called exactly once.
    fn release(self: Box<Self>);
}

/// Checked-out connection that is released exactly once.
///
/// Release happens either through [`release`](Self::release) or, failing
/// that, on drop.
pub struct ScopedConnection {
    conn: Option<Box<dyn PooledConnection>>,
}

impl ScopedConnection {
    pub async fn acquire(pool: &dyn ConnectionPool) -> Result<Self, PoolError> {
        let conn = pool.acquire().await?;
        Ok(Self { conn: Some(conn) })
    }

    pub async fn execute(
        &mut self,
        statement: &str,
        parameters: &[Scalar],
    ) -> Result<RawResult, PoolError> {
        match self.conn.as_mut() {
            Some(conn) => conn.execute(statement, parameters).await,
            None => Err(PoolError::Unavailable(
                "connection already released".to_string(),
            )),
        }
    }

    pub fn release(mut self) {
        self.release_inner();
    }

    fn release_inner(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.release();
        }
    }
}

impl Drop for ScopedConnection {
    fn drop(&mut self) {
        self.release_inner();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePool;

    #[tokio::test]
    async fn test_explicit_release_is_not_repeated_on_drop() {
        let pool = FakePool::empty();
        let scoped = ScopedConnection::acquire(&pool).await.unwrap();
        scoped.release();
        assert_eq!(pool.stats().acquisitions, 1);
        assert_eq!(pool.stats().releases, 1);
    }

    #[tokio::test]
    async fn test_drop_releases() {
        let pool = FakePool::empty();
        {
            let mut scoped = ScopedConnection::acquire(&pool).await.unwrap();
            let _ = scoped.execute("SELECT 1", &[]).await;
        }
        assert_eq!(pool.stats().releases, 1);
    }

    #[tokio::test]
    async fn test_failed_acquire_has_nothing_to_release() {
        let pool = FakePool::empty().failing_acquire("pool timed out");
        assert!(ScopedConnection::acquire(&pool).await.is_err());
        assert_eq!(pool.stats().acquisitions, 0);
        assert_eq!(pool.stats().releases, 0);
    }
}

use async_trait::async_trait;
use futures::TryStreamExt;
use querygate_core::{Record, Scalar, UpstreamConfig};
use querygate_runtime::{ConnectionPool, PoolError, PooledConnection, RawResult};
use sqlx::pool::PoolConnection;
use sqlx::encode::IsNull;
use sqlx::error::BoxDynError;
use sqlx::postgres::types::Oid;
use sqlx::postgres::{PgArgumentBuffer, PgArguments, PgPoolOptions, PgTypeInfo};
use sqlx::{Arguments, Either, Executor, PgPool, Postgres};
use std::time::Duration;

pub mod decode;

fn args_add<T>(args: &mut PgArguments, v: T) -> Result<(), PoolError>
where
    T: Send + Sync + 'static,
    for<'q> T: sqlx::Encode<'q, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    args.add(v)
        .map_err(|e| PoolError::Execution(format!("could not bind parameter: {}", e)))
}

/// A NULL parameter sent with type OID 0, so the server infers the type
/// from the statement. A typed NULL would be rejected when assigned to a
/// column of another type.
#[derive(Debug, Clone, Copy)]
struct UntypedNull;

impl sqlx::Type<Postgres> for UntypedNull {
    fn type_info() -> PgTypeInfo {
        PgTypeInfo::with_oid(Oid(0))
    }
}

impl sqlx::Encode<'_, Postgres> for UntypedNull {
    fn encode_by_ref(&self, _buf: &mut PgArgumentBuffer) -> Result<IsNull, BoxDynError> {
        Ok(IsNull::Yes)
    }
}

/// Bind scalars positionally.
///
/// sqlx only sends parameters in binary format, so a non-null value must
/// carry a concrete type: integers go as INT8 and floats as FLOAT8. Postgres
/// has assignment casts and cross-type comparison operators from both to the
/// other numeric types. NULL carries no type at all.
pub fn bind_parameters(parameters: &[Scalar]) -> Result<PgArguments, PoolError> {
    let mut args = PgArguments::default();
    for param in parameters {
        match param {
            Scalar::Null => args_add(&mut args, UntypedNull)?,
            Scalar::Bool(v) => args_add(&mut args, *v)?,
            Scalar::Int(v) => args_add(&mut args, *v)?,
            Scalar::Float(v) => args_add(&mut args, *v)?,
            Scalar::Text(v) => args_add(&mut args, v.clone())?,
        }
    }
    Ok(args)
}

/// [`ConnectionPool`] over a sqlx `PgPool`.
#[derive(Clone)]
pub struct PostgresPool {
    pool: PgPool,
}

impl PostgresPool {
    /// Connect eagerly; fails fast when the database is unreachable.
    pub async fn connect(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let pool = pool_options(config)
            .connect(&config.connection_string())
            .await?;
        Ok(Self { pool })
    }

    /// Build the pool without opening a connection yet.
    pub fn connect_lazy(config: &UpstreamConfig) -> anyhow::Result<Self> {
        let pool = pool_options(config).connect_lazy(&config.connection_string())?;
        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn inner(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn pool_options(config: &UpstreamConfig) -> PgPoolOptions {
    let pool = config.pool_config();
    PgPoolOptions::new()
        .max_connections(pool.max_connections)
        .min_connections(pool.min_connections)
        .acquire_timeout(Duration::from_secs(u64::from(pool.acquire_timeout_seconds)))
        .idle_timeout(Duration::from_secs(u64::from(pool.idle_timeout_seconds)))
}

#[async_trait]
impl ConnectionPool for PostgresPool {
    async fn acquire(&self) -> Result<Box<dyn PooledConnection>, PoolError> {
        let conn = self.pool.acquire().await.map_err(map_sqlx_error)?;
        tracing::debug!(
            size = self.pool.size(),
            idle = self.pool.num_idle(),
            "connection checked out"
        );
        Ok(Box::new(PostgresConnection { conn }))
    }

    async fn run_one(
        &self,
        statement: &str,
        parameters: &[Scalar],
    ) -> Result<RawResult, PoolError> {
        run_statement(&self.pool, statement, parameters).await
    }
}

/// A checked-out Postgres connection. Dropping it returns it to the pool.
pub struct PostgresConnection {
    conn: PoolConnection<Postgres>,
}

#[async_trait]
impl PooledConnection for PostgresConnection {
    async fn execute(
        &mut self,
        statement: &str,
        parameters: &[Scalar],
    ) -> Result<RawResult, PoolError> {
        run_statement(&mut *self.conn, statement, parameters).await
    }

    fn release(self: Box<Self>) {
        drop(self.conn);
        tracing::debug!("connection released");
    }
}

async fn run_statement<'c, E>(
    executor: E,
    statement: &str,
    parameters: &[Scalar],
) -> Result<RawResult, PoolError>
where
    E: Executor<'c, Database = Postgres>,
{
    let args = bind_parameters(parameters)?;
    // Statements are caller-supplied and DDL can run between two of them on
    // the same connection, so nothing is kept as a named prepared statement.
    let query = sqlx::query_with(statement, args).persistent(false);

    let mut row_count = 0u64;
    let mut rows: Vec<Record> = Vec::new();
    let mut stream = executor.fetch_many(query);
    while let Some(item) = stream.try_next().await.map_err(map_sqlx_error)? {
        match item {
            Either::Left(done) => row_count += done.rows_affected(),
            Either::Right(row) => rows.push(decode::row_to_record(&row)),
        }
    }

    Ok(RawResult {
        command: command_of(statement),
        row_count,
        rows,
    })
}

/// sqlx does not expose the CommandComplete tag, so report the statement's
/// leading keyword instead.
fn command_of(statement: &str) -> String {
    statement
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .to_uppercase()
}

fn map_sqlx_error(err: sqlx::Error) -> PoolError {
    match err {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => PoolError::Unavailable(err.to_string()),
        sqlx::Error::Database(db) => PoolError::Execution(db.message().to_string()),
        other => PoolError::Execution(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_counts_every_parameter() {
        let args = bind_parameters(&[
            Scalar::Null,
            Scalar::Bool(true),
            Scalar::Int(-3),
            Scalar::Float(2.5),
            Scalar::Text("x".to_string()),
        ])
        .unwrap();
        assert_eq!(args.len(), 5);
    }

    #[test]
    fn test_null_is_bound_without_a_type() {
        assert_eq!(
            <UntypedNull as sqlx::Type<Postgres>>::type_info(),
            PgTypeInfo::with_oid(Oid(0))
        );

        let mut buf = PgArgumentBuffer::default();
        let encoded =
            <UntypedNull as sqlx::Encode<'_, Postgres>>::encode_by_ref(&UntypedNull, &mut buf);
        assert!(matches!(encoded, Ok(IsNull::Yes)));
    }

    #[test]
    fn test_command_of() {
        assert_eq!(command_of("  select 1"), "SELECT");
        assert_eq!(command_of("create table t (id int)"), "CREATE");
        assert_eq!(command_of(""), "");
    }

    #[test]
    fn test_pool_errors_are_unavailable() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            PoolError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            PoolError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            PoolError::Execution(_)
        ));
    }

    #[tokio::test]
    async fn test_lazy_pool_does_not_connect() {
        let config = UpstreamConfig {
            host: "127.0.0.1".to_string(),
            port: 1,
            ..Default::default()
        };
        let pool = PostgresPool::connect_lazy(&config).unwrap();
        assert_eq!(pool.inner().size(), 0);
    }
}

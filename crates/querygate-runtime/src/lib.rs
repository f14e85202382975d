//! Querygate runtime.
//!
//! The request-handling core: [`Authenticator`] resolves principals,
//! [`QueryDispatcher`] classifies, authorizes and executes statements. Both
//! talk to the database only through the [`ConnectionPool`] capability they
//! are constructed with.

pub mod authenticator;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod pool;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use authenticator::Authenticator;
pub use credentials::hash_password;
pub use dispatcher::QueryDispatcher;
pub use error::GatewayError;
pub use pool::{ConnectionPool, PoolError, PooledConnection, RawResult, ScopedConnection};

//! # Painel Database Crate
//!
//! This crate is the application-specific interface to the MySQL server that
//! exposes the custodians' cash ledger through the `vw_extrato` view.
//!
//! ## Architectural Principles
//!
//! - **Adapter:** All SQL lives here. The rest of the application only sees
//!   `FilterParams` going in and typed rows coming out.
//! - **Parameterized SQL:** `QueryBuilder` renders one statement per report type
//!   with a `?` placeholder for every filter value. Only the row limit is
//!   formatted into the text, and it is an integer.
//! - **Degradable:** When the server cannot be reached at start-up the repository
//!   runs offline and every read returns `DbError::Offline`.
//!
//! ## Public API
//!
//! - `connect` / `connect_or_offline`: build the connection pool (3 attempts, exponential backoff).
//! - `QueryBuilder`, `BuiltQuery`, `QueryParam`: SQL construction per report.
//! - `DbRepository`: the data access methods; implements `analytics::LedgerSource`.
//! - `DbError`: the specific error types that can be returned from this crate.

// Declare the modules that constitute this crate.
pub mod connection;
pub mod error;
pub mod queries;
pub mod repository;

// Re-export the key components to create a clean, public-facing API.
pub use connection::{connect, connect_or_offline};
pub use error::DbError;
pub use queries::{BuiltQuery, QueryBuilder, QueryParam};
pub use repository::DbRepository;

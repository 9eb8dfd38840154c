//! QuillDB - an embeddable in-memory SQL engine
//!
//! Callers open a [`Session`] through a [`Registry`] and run SQL batches
//! against it:
//! - SQL parsing (lexer, parser, AST)
//! - Schema catalog and in-memory table storage with unique indexes
//! - Binding and execution of queries and DML/DDL
//! - Transactions with table locks and undo-log rollback
//! - Sessions, readers, transaction handles and parameters
//!
//! ```
//! use quilldb::Registry;
//!
//! let registry = Registry::default();
//! let mut session = registry.connect("Database=demo;User ID=sa").unwrap();
//! session.execute("CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(20))").unwrap();
//! session.execute("INSERT INTO t VALUES (1, 'Alice')").unwrap();
//! let result = session.execute("SELECT name FROM t").unwrap();
//! assert_eq!(result.rows.len(), 1);
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod session;
pub mod sql;
pub mod storage;
pub mod transaction;

pub use config::{ConnectionString, EngineConfig};
pub use error::{Error, ErrorKind, Result};
pub use executor::{ColumnDescriptor, QueryResult};
pub use session::{Direction, ParameterSet, Reader, Registry, Session, TransactionHandle};
pub use transaction::IsolationLevel;

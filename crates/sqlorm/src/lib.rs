//! # sqlorm
//!
//! A struct-first SQL builder and ORM.
//!
//! ## Features
//!
//! - **Model registry**: table and column names derived from struct metadata,
//!   overridable per field with `#[orm(column = "...")]` or at registration
//! - **Expression builder**: columns, predicates, aggregates and raw fragments
//!   compiled to SQL with `?` placeholders and ordered arguments
//! - **Statement builders**: SELECT (joins, GROUP BY, HAVING, ORDER BY, LIMIT),
//!   multi-row INSERT with upsert, DELETE that refuses to run without WHERE
//! - **Dialects**: MySQL and SQLite quoting and upsert syntax
//! - **Two value strategies**: derive-generated accessors or direct field
//!   memory access by offset, with identical results
//! - **Sessions and middleware**: one pipeline for a `Db` and its transactions,
//!   with query logging, tracing spans and statistics built in
//!
//! ## Example
//!
//! ```ignore
//! use sqlorm::{Db, Dialect, Entity, Session, col};
//!
//! #[derive(Debug, Default, Entity)]
//! struct User {
//!     id: i64,
//!     #[orm(column = "user_name")]
//!     name: String,
//!     age: Option<i8>,
//! }
//!
//! let db = Db::builder(conn).dialect(Dialect::Sqlite).build()?;
//!
//! // SELECT * FROM "user" WHERE ("age" > ?) AND ("user_name" LIKE ?);
//! let adults = db
//!     .select::<User>()
//!     .filter([col("age").gt(18), col("name").like("a%")])
//!     .get_multi()
//!     .await?;
//!
//! db.insert::<User>()
//!     .values([User { id: 1, name: "ann".into(), age: Some(30) }])
//!     .exec()
//!     .await?;
//! ```

extern crate self as sqlorm;

pub mod builder;
pub mod config;
pub mod dialect;
pub mod entity;
pub mod error;
mod executor;
pub mod expr;
pub mod middleware;
pub mod model;
pub mod row;
pub mod session;
pub mod table;
#[cfg(test)]
mod testing;
pub mod transaction;
pub mod value;
pub mod valuer;

pub use builder::{
    Deleter, Inserter, OrderBy, Query, QueryBuilder, RawQuerier, Selector, UpsertBuilder,
};
pub use config::DbConfig;
pub use dialect::Dialect;
pub use entity::{Entity, EntityDescriptor, EntityKind, FieldDescriptor};
pub use error::{OrmError, OrmResult};
pub use expr::{
    Aggregate, AggregateFn, Assignable, Assignment, Column, Expr, Op, Predicate, RawExpr,
    Selectable, assign, avg, col, count, max, min, not, raw, sum,
};
pub use middleware::{
    LogFn, Middleware, Next, QueryContext, QueryLogMiddleware, QueryOutput, QueryResult,
    QueryStats, QueryType, StatsMiddleware, TracingMiddleware,
};
pub use model::{
    Field, Model, ModelOption, Registry, underscore_case, with_column_name, with_table_name,
};
pub use row::{ExecResult, Row};
pub use session::{Connection, Core, Db, DbBuilder, Session, Transaction};
pub use table::{Join, JoinBuilder, JoinKind, Table, TableReference};
pub use transaction::Tx;
pub use value::{FieldType, FromValue, ScalarKind, SqlType, Value};
pub use valuer::{Creator, FieldReader, Valuer};

#[cfg(feature = "derive")]
pub use sqlorm_derive::Entity;

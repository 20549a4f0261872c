//! Statement builders.
//!
//! Each builder borrows a [`Session`](crate::Session), resolves the model of
//! its entity type lazily, and compiles its clauses into a [`Query`]:
//! SQL text with `?` placeholders plus the arguments in placeholder order.
//!
//! ```ignore
//! use sqlorm::{Selector, col};
//!
//! let query = Selector::<User, _>::new(&db)
//!     .filter([col("age").gt(18)])
//!     .build()?;
//! assert_eq!(query.sql, "SELECT * FROM `user` WHERE `age` > ?;");
//! ```
//!
//! `build` never performs I/O and may be called any number of times.

pub(crate) mod delete;
pub(crate) mod insert;
pub(crate) mod raw;
pub(crate) mod select;

pub use delete::Deleter;
pub use insert::{Inserter, UpsertBuilder};
pub use raw::RawQuerier;
pub use select::{OrderBy, Selector};

use crate::dialect::Dialect;
use crate::entity::Entity;
use crate::error::OrmResult;
use crate::expr::{Aggregate, Column, Expr, Predicate, Selectable};
use crate::model::{Field, Model, Registry};
use crate::session::Core;
use crate::table::TableReference;
use crate::value::Value;
use std::fmt::Write;
use std::sync::{Arc, OnceLock};

/// A compiled statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub sql: String,
    pub args: Vec<Value>,
}

/// Anything that compiles to a [`Query`].
pub trait QueryBuilder: Send + Sync {
    fn build(&self) -> OrmResult<Query>;
}

/// Text buffer plus argument list for one compilation.
pub(crate) struct SqlBuilder<'a> {
    sql: String,
    args: Vec<Value>,
    model: &'a Model,
    registry: &'a Registry,
    dialect: Dialect,
}

impl<'a> SqlBuilder<'a> {
    pub(crate) fn new(core: &'a Core, model: &'a Model) -> Self {
        Self {
            sql: String::with_capacity(64),
            args: Vec::new(),
            model,
            registry: core.registry(),
            dialect: core.dialect(),
        }
    }

    pub(crate) fn push(&mut self, s: &str) {
        self.sql.push_str(s);
    }

    pub(crate) fn push_arg(&mut self, value: Value) {
        self.args.push(value);
    }

    pub(crate) fn quote(&mut self, ident: &str) {
        let q = self.dialect.quote_char();
        let _ = write!(self.sql, "{q}{ident}{q}");
    }

    /// Resolve a field of the bound model.
    pub(crate) fn field(&self, name: &str) -> OrmResult<&'a Field> {
        self.model.require_field(name)
    }

    /// Render a column. The alias is only rendered when `with_alias` is set.
    pub(crate) fn build_column(&mut self, column: &Column, with_alias: bool) -> OrmResult<()> {
        match &column.table {
            None => {
                let field = self.field(&column.name)?;
                self.quote(&field.column);
            }
            Some(table) => {
                let model = table.entity.model(self.registry)?;
                let field = model.require_field(&column.name)?;
                match &table.alias {
                    Some(alias) => self.quote(alias),
                    None => self.quote(model.table_name()),
                }
                self.push(".");
                self.quote(&field.column);
            }
        }
        if with_alias {
            if let Some(alias) = &column.alias {
                self.push(" AS ");
                self.quote(alias);
            }
        }
        Ok(())
    }

    fn build_aggregate(&mut self, agg: &Aggregate, with_alias: bool) -> OrmResult<()> {
        self.push(agg.func.as_str());
        self.push("(");
        let field = self.field(&agg.arg)?;
        self.quote(&field.column);
        self.push(")");
        if with_alias {
            if let Some(alias) = &agg.alias {
                self.push(" AS ");
                self.quote(alias);
            }
        }
        Ok(())
    }

    pub(crate) fn build_expr(&mut self, expr: &Expr) -> OrmResult<()> {
        match expr {
            Expr::Column(column) => self.build_column(column, false),
            Expr::Predicate(p) => self.build_predicate(p),
            Expr::Aggregate(agg) => self.build_aggregate(agg, false),
            Expr::Raw(raw) => {
                self.args.extend(raw.args.iter().cloned());
                if raw.is_aggregate() {
                    self.push(&raw.sql);
                } else {
                    self.push("(");
                    self.push(&raw.sql);
                    self.push(")");
                }
                Ok(())
            }
            Expr::Value(value) => {
                self.push("?");
                self.push_arg(value.clone());
                Ok(())
            }
        }
    }

    /// Predicate children are parenthesised iff they are predicates themselves.
    fn build_operand(&mut self, expr: &Expr) -> OrmResult<()> {
        if let Expr::Predicate(p) = expr {
            self.push("(");
            self.build_predicate(p)?;
            self.push(")");
            Ok(())
        } else {
            self.build_expr(expr)
        }
    }

    pub(crate) fn build_predicate(&mut self, p: &Predicate) -> OrmResult<()> {
        if let Some(left) = &p.left {
            self.build_operand(left)?;
        }
        if let Some(op) = p.op {
            if p.left.is_some() {
                self.push(" ");
            }
            self.push(op.as_str());
            self.push(" ");
        }
        if let Some(right) = &p.right {
            self.build_operand(right)?;
        }
        Ok(())
    }

    /// Write `keyword` followed by the predicates ANDed, if there are any.
    pub(crate) fn build_predicates(&mut self, keyword: &str, predicates: &[Predicate]) -> OrmResult<()> {
        if let Some(p) = Predicate::all(predicates) {
            self.push(keyword);
            self.build_predicate(&p)?;
        }
        Ok(())
    }

    pub(crate) fn build_selectable(&mut self, s: &Selectable) -> OrmResult<()> {
        match s {
            Selectable::Column(column) => self.build_column(column, true),
            Selectable::Aggregate(agg) => self.build_aggregate(agg, true),
            Selectable::Raw(raw) => {
                self.push(&raw.sql);
                self.args.extend(raw.args.iter().cloned());
                Ok(())
            }
        }
    }

    /// Render a `FROM` target. `None` is the bound model's own table.
    pub(crate) fn build_table(&mut self, table: Option<&TableReference>) -> OrmResult<()> {
        match table {
            None => {
                let name = self.model.table_name();
                self.quote(name);
            }
            Some(TableReference::Table(table)) => {
                let model = table.entity.model(self.registry)?;
                self.quote(model.table_name());
                if let Some(alias) = &table.alias {
                    self.push(" AS ");
                    self.quote(alias);
                }
            }
            Some(TableReference::Join(join)) => {
                self.push("(");
                self.build_table(Some(&join.left))?;
                self.push(" ");
                self.push(join.kind.as_str());
                self.push(" ");
                self.build_table(Some(&join.right))?;
                self.push(")");

                if !join.using.is_empty() {
                    // USING names a field both sides share; resolve it on the left.
                    let model = join.left.leftmost().entity.model(self.registry)?;
                    self.push(" USING (");
                    for (i, name) in join.using.iter().enumerate() {
                        if i > 0 {
                            self.push(",");
                        }
                        let field = model.require_field(name)?;
                        self.quote(&field.column);
                    }
                    self.push(")");
                }
                self.build_predicates(" ON ", &join.on)?;
            }
        }
        Ok(())
    }

    /// Terminate the statement.
    pub(crate) fn finish(mut self) -> Query {
        self.sql.push(';');
        Query {
            sql: self.sql,
            args: self.args,
        }
    }
}

/// Resolve the model of `T` once per builder.
pub(crate) fn resolve_model<'b, T: Entity>(
    cell: &'b OnceLock<Arc<Model>>,
    core: &Core,
) -> OrmResult<&'b Arc<Model>> {
    if let Some(model) = cell.get() {
        return Ok(model);
    }
    let model = core.registry().get::<T>()?;
    Ok(cell.get_or_init(|| model))
}

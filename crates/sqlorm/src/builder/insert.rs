//! INSERT statement builder with optional upsert clause.

use super::{Query, QueryBuilder, SqlBuilder, resolve_model};
use crate::entity::Entity;
use crate::error::{OrmError, OrmResult};
use crate::executor;
use crate::middleware::{QueryContext, QueryType};
use crate::model::{Field, Model};
use crate::expr::Assignable;
use crate::row::ExecResult;
use crate::session::Session;
use std::sync::{Arc, OnceLock};

/// Conflict handling appended to an INSERT.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Upsert {
    /// Field names of the conflict target.
    pub(crate) conflict_columns: Vec<String>,
    pub(crate) assigns: Vec<Assignable>,
}

/// `INSERT INTO <t>(<cols>) VALUES (?,..),(?,..)[ <upsert>];`
///
/// Row arguments come first, row-major; upsert assignment arguments follow.
#[must_use = "builders do nothing until built or executed"]
pub struct Inserter<'s, T, S> {
    session: &'s S,
    model: OnceLock<Arc<Model>>,
    values: Vec<T>,
    columns: Vec<String>,
    upsert: Option<Upsert>,
}

impl<'s, T: Entity, S: Session> Inserter<'s, T, S> {
    pub fn new(session: &'s S) -> Self {
        Self {
            session,
            model: OnceLock::new(),
            values: Vec::new(),
            columns: Vec::new(),
            upsert: None,
        }
    }

    /// Rows to insert.
    pub fn values(mut self, rows: impl IntoIterator<Item = T>) -> Self {
        self.values = rows.into_iter().collect();
        self
    }

    /// Insert only these fields, in this order.
    pub fn columns<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.columns = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Start an upsert clause.
    pub fn on_duplicate_key(self) -> UpsertBuilder<'s, T, S> {
        UpsertBuilder {
            inserter: self,
            conflict_columns: Vec::new(),
        }
    }

    fn model(&self) -> OrmResult<&Arc<Model>> {
        resolve_model::<T>(&self.model, self.session.core())
    }

    fn target_fields<'m>(&self, model: &'m Model) -> OrmResult<Vec<&'m Field>> {
        if self.columns.is_empty() {
            return Ok(model.fields().iter().collect());
        }
        self.columns
            .iter()
            .map(|name| model.require_field(name))
            .collect()
    }

    /// Execute the insert.
    pub async fn exec(self) -> OrmResult<ExecResult> {
        let ctx = QueryContext::new(QueryType::Insert, &self, Arc::clone(self.model()?));
        executor::exec(self.session, &ctx).await
    }
}

impl<T: Entity, S: Session> QueryBuilder for Inserter<'_, T, S> {
    fn build(&self) -> OrmResult<Query> {
        if self.values.is_empty() {
            return Err(OrmError::InsertZeroRow);
        }
        let core = self.session.core();
        let model = self.model()?;
        let fields = self.target_fields(model)?;
        let mut b = SqlBuilder::new(core, model);

        b.push("INSERT INTO ");
        b.quote(model.table_name());
        b.push("(");
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                b.push(",");
            }
            b.quote(&field.column);
        }
        b.push(") VALUES ");

        let placeholders = format!("({})", vec!["?"; fields.len()].join(","));
        for (i, row) in self.values.iter().enumerate() {
            if i > 0 {
                b.push(",");
            }
            b.push(&placeholders);
            let reader = core.creator().reader(model, row)?;
            for field in &fields {
                b.push_arg(reader.field(field.name)?);
            }
        }

        if let Some(upsert) = &self.upsert {
            core.dialect().build_upsert(&mut b, upsert)?;
        }

        Ok(b.finish())
    }
}

/// Upsert clause under construction.
#[must_use = "finish the upsert with `update`"]
pub struct UpsertBuilder<'s, T, S> {
    inserter: Inserter<'s, T, S>,
    conflict_columns: Vec<String>,
}

impl<'s, T: Entity, S: Session> UpsertBuilder<'s, T, S> {
    /// Conflict target fields. Required by dialects that name the target
    /// (SQLite), ignored by MySQL.
    pub fn conflict_columns<I>(mut self, fields: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        self.conflict_columns = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Assignments applied when the row already exists.
    pub fn update<I>(self, assigns: I) -> Inserter<'s, T, S>
    where
        I: IntoIterator,
        I::Item: Into<Assignable>,
    {
        let mut inserter = self.inserter;
        inserter.upsert = Some(Upsert {
            conflict_columns: self.conflict_columns,
            assigns: assigns.into_iter().map(Into::into).collect(),
        });
        inserter
    }
}

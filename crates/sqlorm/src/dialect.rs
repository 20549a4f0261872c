//! SQL dialects: identifier quoting and upsert syntax.

use crate::builder::SqlBuilder;
use crate::builder::insert::Upsert;
use crate::error::{OrmError, OrmResult};
use crate::expr::Assignable;
use serde::{Deserialize, Serialize};

/// The SQL flavor statements are rendered for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// `` `ident` ``, `ON DUPLICATE KEY UPDATE`
    #[default]
    MySql,
    /// `"ident"`, `ON CONFLICT(..) DO UPDATE SET`
    Sqlite,
}

impl Dialect {
    pub fn quote_char(self) -> char {
        match self {
            Dialect::MySql => '`',
            Dialect::Sqlite => '"',
        }
    }

    /// Whether upserts need an explicit conflict target.
    pub fn requires_conflict_columns(self) -> bool {
        matches!(self, Dialect::Sqlite)
    }

    pub(crate) fn build_upsert(self, b: &mut SqlBuilder<'_>, upsert: &Upsert) -> OrmResult<()> {
        match self {
            Dialect::MySql => {
                b.push(" ON DUPLICATE KEY UPDATE ");
                build_assignments(b, &upsert.assigns, |b, column| {
                    b.push("=VALUES(");
                    b.quote(column);
                    b.push(")");
                })
            }
            Dialect::Sqlite => {
                if upsert.conflict_columns.is_empty() {
                    return Err(OrmError::MissingConflictColumns);
                }
                b.push(" ON CONFLICT(");
                for (i, field) in upsert.conflict_columns.iter().enumerate() {
                    if i > 0 {
                        b.push(",");
                    }
                    let column = b.field(field)?.column.as_str();
                    b.quote(column);
                }
                b.push(") DO UPDATE SET ");
                build_assignments(b, &upsert.assigns, |b, column| {
                    b.push("=excluded.");
                    b.quote(column);
                })
            }
        }
    }
}

/// Render `col=?` for assignments and `col=<proposed>` for bare columns.
fn build_assignments(
    b: &mut SqlBuilder<'_>,
    assigns: &[Assignable],
    proposed: impl Fn(&mut SqlBuilder<'_>, &str),
) -> OrmResult<()> {
    for (i, assign) in assigns.iter().enumerate() {
        if i > 0 {
            b.push(",");
        }
        match assign {
            Assignable::Assignment(a) => {
                let column = b.field(&a.field)?.column.as_str();
                b.quote(column);
                b.push("=?");
                b.push_arg(a.value.clone());
            }
            Assignable::Column(c) => {
                // Proposed values always come from the inserted table.
                if c.table.is_some() {
                    return Err(OrmError::validation(format!(
                        "upsert column `{}` must not be table-qualified",
                        c.name()
                    )));
                }
                let column = b.field(c.name())?.column.as_str();
                b.quote(column);
                proposed(b, column);
            }
        }
    }
    Ok(())
}

//! Expression tree: columns, predicates, aggregates, raw fragments and values.
//!
//! Expressions are plain data; they are compiled to SQL text plus bound
//! arguments by the statement builders.
//!
//! ```ignore
//! use sqlorm::{col, not};
//!
//! let adult_johns = col("age").ge(18).and(col("first_name").eq("John"));
//! let not_tom = not(col("first_name").eq("Tom"));
//! ```

use crate::table::Table;
use crate::value::Value;
use chrono::NaiveDateTime;
use uuid::Uuid;

/// Comparison and logical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    Not,
    And,
    Or,
}

impl Op {
    pub fn as_str(self) -> &'static str {
        match self {
            Op::Eq => "=",
            Op::Ne => "!=",
            Op::Lt => "<",
            Op::Le => "<=",
            Op::Gt => ">",
            Op::Ge => ">=",
            Op::Like => "LIKE",
            Op::Not => "NOT",
            Op::And => "AND",
            Op::Or => "OR",
        }
    }
}

/// Any node that compiles to a SQL fragment.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Column(Column),
    Predicate(Box<Predicate>),
    Aggregate(Aggregate),
    Raw(RawExpr),
    /// A bound argument, rendered as a placeholder.
    Value(Value),
}

/// A field reference, optionally aliased and qualified by a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub(crate) name: String,
    pub(crate) alias: Option<String>,
    pub(crate) table: Option<Table>,
}

/// Reference a field of the statement's entity by its Rust name.
pub fn col(name: impl Into<String>) -> Column {
    Column {
        name: name.into(),
        alias: None,
        table: None,
    }
}

macro_rules! comparisons {
    ($($(#[$doc:meta])* $method:ident => $op:ident),+ $(,)?) => {
        $(
            $(#[$doc])*
            pub fn $method(self, rhs: impl Into<Expr>) -> Predicate {
                Predicate::binary(self.into(), Op::$op, rhs.into())
            }
        )+
    };
}

impl Column {
    pub(crate) fn qualified(table: Table, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            table: Some(table),
        }
    }

    /// Set the `AS` alias used in select lists.
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    comparisons! {
        /// `column = rhs`
        eq => Eq,
        /// `column != rhs`
        ne => Ne,
        lt => Lt,
        le => Le,
        gt => Gt,
        ge => Ge,
        /// `column LIKE rhs`
        like => Like,
    }
}

/// A boolean expression.
///
/// `left` is absent for `NOT`; `op` and `right` are absent for a raw
/// fragment used as a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub(crate) left: Option<Expr>,
    pub(crate) op: Option<Op>,
    pub(crate) right: Option<Expr>,
}

impl Predicate {
    fn binary(left: Expr, op: Op, right: Expr) -> Self {
        Self {
            left: Some(left),
            op: Some(op),
            right: Some(right),
        }
    }

    pub fn and(self, rhs: Predicate) -> Predicate {
        Predicate::binary(self.into(), Op::And, rhs.into())
    }

    pub fn or(self, rhs: Predicate) -> Predicate {
        Predicate::binary(self.into(), Op::Or, rhs.into())
    }

    /// AND a sequence of predicates left to right. `None` if it is empty.
    pub(crate) fn all(predicates: &[Predicate]) -> Option<Predicate> {
        let (first, rest) = predicates.split_first()?;
        Some(
            rest.iter()
                .cloned()
                .fold(first.clone(), |acc, p| acc.and(p)),
        )
    }
}

/// `NOT (p)`
pub fn not(p: Predicate) -> Predicate {
    Predicate {
        left: None,
        op: Some(Op::Not),
        right: Some(p.into()),
    }
}

/// Aggregate function names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFn {
    pub fn as_str(self) -> &'static str {
        match self {
            AggregateFn::Count => "COUNT",
            AggregateFn::Sum => "SUM",
            AggregateFn::Avg => "AVG",
            AggregateFn::Max => "MAX",
            AggregateFn::Min => "MIN",
        }
    }
}

/// `FN(column)`, usable in select lists and `HAVING`.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub(crate) func: AggregateFn,
    pub(crate) arg: String,
    pub(crate) alias: Option<String>,
}

fn aggregate(func: AggregateFn, field: impl Into<String>) -> Aggregate {
    Aggregate {
        func,
        arg: field.into(),
        alias: None,
    }
}

pub fn count(field: impl Into<String>) -> Aggregate {
    aggregate(AggregateFn::Count, field)
}

pub fn sum(field: impl Into<String>) -> Aggregate {
    aggregate(AggregateFn::Sum, field)
}

pub fn avg(field: impl Into<String>) -> Aggregate {
    aggregate(AggregateFn::Avg, field)
}

pub fn max(field: impl Into<String>) -> Aggregate {
    aggregate(AggregateFn::Max, field)
}

pub fn min(field: impl Into<String>) -> Aggregate {
    aggregate(AggregateFn::Min, field)
}

impl Aggregate {
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    comparisons! {
        eq => Eq,
        ne => Ne,
        lt => Lt,
        le => Le,
        gt => Gt,
        ge => Ge,
    }
}

/// A caller-authored SQL fragment with its own positional arguments.
///
/// The text is emitted verbatim; only the arguments are bound.
#[derive(Debug, Clone, PartialEq)]
pub struct RawExpr {
    pub(crate) sql: String,
    pub(crate) args: Vec<Value>,
}

pub fn raw(sql: impl Into<String>) -> RawExpr {
    RawExpr {
        sql: sql.into(),
        args: Vec::new(),
    }
}

impl RawExpr {
    /// Bind the next positional argument.
    pub fn bind(mut self, value: impl Into<Value>) -> Self {
        self.args.push(value.into());
        self
    }

    pub fn as_predicate(self) -> Predicate {
        Predicate {
            left: Some(self.into()),
            op: None,
            right: None,
        }
    }

    pub(crate) fn is_aggregate(&self) -> bool {
        ["COUNT", "SUM", "AVG", "MAX", "MIN"]
            .iter()
            .any(|prefix| self.sql.starts_with(prefix))
    }
}

/// An item of a `SELECT` list.
#[derive(Debug, Clone, PartialEq)]
pub enum Selectable {
    Column(Column),
    Aggregate(Aggregate),
    Raw(RawExpr),
}

/// Right-hand side of an upsert assignment.
#[derive(Debug, Clone, PartialEq)]
pub enum Assignable {
    /// `column = ?` with an explicit value.
    Assignment(Assignment),
    /// Take the value the insert row proposed for this column.
    Column(Column),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub(crate) field: String,
    pub(crate) value: Value,
}

/// Assign `value` to a field in an upsert.
pub fn assign(field: impl Into<String>, value: impl Into<Value>) -> Assignment {
    Assignment {
        field: field.into(),
        value: value.into(),
    }
}

macro_rules! into_enum {
    ($target:ident { $($variant:ident($ty:ty) => $conv:expr),+ $(,)? }) => {
        $(
            impl From<$ty> for $target {
                fn from(v: $ty) -> Self {
                    #[allow(clippy::redundant_closure_call)]
                    $target::$variant(($conv)(v))
                }
            }
        )+
    };
}

into_enum!(Expr {
    Column(Column) => |v| v,
    Predicate(Predicate) => Box::new,
    Aggregate(Aggregate) => |v| v,
    Raw(RawExpr) => |v| v,
    Value(Value) => |v| v,
});

into_enum!(Selectable {
    Column(Column) => |v| v,
    Aggregate(Aggregate) => |v| v,
    Raw(RawExpr) => |v| v,
});

into_enum!(Assignable {
    Assignment(Assignment) => |v| v,
    Column(Column) => |v| v,
});

macro_rules! scalar_into_expr {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Expr {
                fn from(v: $ty) -> Self {
                    Expr::Value(v.into())
                }
            }
        )+
    };
}

scalar_into_expr!(
    bool,
    i8,
    i16,
    i32,
    i64,
    u8,
    u16,
    u32,
    u64,
    f32,
    f64,
    String,
    &str,
    Vec<u8>,
    NaiveDateTime,
    Uuid,
);

impl<T: Into<Value>> From<Option<T>> for Expr {
    fn from(v: Option<T>) -> Self {
        Expr::Value(v.into())
    }
}

//! Table metadata derived from entity types, and the registry that caches it.

use crate::entity::{Entity, EntityKind};
use crate::error::{OrmError, OrmResult};
use crate::value::FieldType;
use regex::Regex;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, PoisonError, RwLock};
use tracing::debug;

const TAG_KEY_COLUMN: &str = "column";

static FIRST_CAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("(.)([A-Z][a-z]+)").expect("valid regex"));
static ALL_CAP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("([a-z0-9])([A-Z])").expect("valid regex"));
static MULTI_UNDERSCORE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("_+").expect("valid regex"));

/// Convert a Rust identifier to `snake_case`.
///
/// Acronyms stay together: `UserID` becomes `user_id` and `APIResponse`
/// becomes `api_response`.
pub fn underscore_case(name: &str) -> String {
    let snake = FIRST_CAP.replace_all(name, "${1}_${2}");
    let snake = ALL_CAP.replace_all(&snake, "${1}_${2}");
    let snake = snake.to_lowercase();
    MULTI_UNDERSCORE.replace_all(&snake, "_").into_owned()
}

/// A mapped struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Rust field name.
    pub name: &'static str,
    /// Column name.
    pub column: String,
    /// Semantic type, trusted by the offset valuer.
    pub ty: FieldType,
    /// Byte offset inside the entity.
    pub offset: usize,
}

/// Table metadata for one entity type.
///
/// Published models are shared as `Arc<Model>` and never change.
#[derive(Debug, Clone)]
pub struct Model {
    entity: TypeId,
    table_name: String,
    fields: Vec<Field>,
    field_map: HashMap<&'static str, usize>,
    column_map: HashMap<String, usize>,
}

impl Model {
    /// Build the model for `T` without publishing it.
    pub fn parse<T: Entity>() -> OrmResult<Self> {
        let descriptor = T::DESCRIPTOR;
        if descriptor.kind != EntityKind::Struct {
            return Err(OrmError::PointerOnly(descriptor.type_name));
        }

        let mut fields = Vec::with_capacity(descriptor.fields.len());
        for fd in descriptor.fields {
            let pairs = parse_tag(fd.tag)?;
            let column = pairs
                .get(TAG_KEY_COLUMN)
                .filter(|c| !c.is_empty())
                .map(|c| c.to_string())
                .unwrap_or_else(|| underscore_case(fd.name));
            fields.push(Field {
                name: fd.name,
                column,
                ty: fd.ty,
                offset: fd.offset,
            });
        }

        let table_name = match descriptor.table_name {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => underscore_case(descriptor.type_name),
        };

        let mut model = Self {
            entity: TypeId::of::<T>(),
            table_name,
            field_map: fields.iter().enumerate().map(|(i, f)| (f.name, i)).collect(),
            column_map: HashMap::with_capacity(fields.len()),
            fields,
        };
        model.rebuild_columns()?;
        Ok(model)
    }

    fn rebuild_columns(&mut self) -> OrmResult<()> {
        self.column_map.clear();
        for (idx, field) in self.fields.iter().enumerate() {
            if self.column_map.insert(field.column.clone(), idx).is_some() {
                return Err(OrmError::DuplicateColumn(field.column.clone()));
            }
        }
        Ok(())
    }

    fn apply(&mut self, option: ModelOption) -> OrmResult<()> {
        match option {
            ModelOption::TableName(name) => {
                if name.is_empty() {
                    return Err(OrmError::validation("table name is empty"));
                }
                self.table_name = name;
            }
            ModelOption::ColumnName { field, column } => {
                let idx = *self
                    .field_map
                    .get(field.as_str())
                    .ok_or_else(|| OrmError::UnknownField(field.clone()))?;
                self.fields[idx].column = column;
                self.rebuild_columns()?;
            }
        }
        Ok(())
    }

    /// Whether this model was parsed from `T`.
    pub fn describes<T: Entity>(&self) -> bool {
        self.entity == TypeId::of::<T>()
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Fields in declaration order.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Look up a field by Rust name.
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.field_map.get(name).map(|&i| &self.fields[i])
    }

    /// Look up a field by column name.
    pub fn column(&self, column: &str) -> Option<&Field> {
        self.column_map.get(column).map(|&i| &self.fields[i])
    }

    /// Resolve a field name, failing with `UnknownField`.
    pub fn require_field(&self, name: &str) -> OrmResult<&Field> {
        self.field(name)
            .ok_or_else(|| OrmError::UnknownField(name.to_string()))
    }
}

fn parse_tag(tag: Option<&'static str>) -> OrmResult<HashMap<&'static str, &'static str>> {
    let Some(tag) = tag else {
        return Ok(HashMap::new());
    };
    let mut pairs = HashMap::new();
    for pair in tag.split(',') {
        let segs: Vec<&str> = pair.split('=').collect();
        let [key, value] = segs[..] else {
            return Err(OrmError::InvalidTagContent(pair.to_string()));
        };
        pairs.insert(key.trim(), value.trim());
    }
    Ok(pairs)
}

/// Adjustment applied to a model at registration time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOption {
    TableName(String),
    ColumnName { field: String, column: String },
}

/// Override the table name. An empty name is rejected.
pub fn with_table_name(name: impl Into<String>) -> ModelOption {
    ModelOption::TableName(name.into())
}

/// Override the column name of one field.
pub fn with_column_name(field: impl Into<String>, column: impl Into<String>) -> ModelOption {
    ModelOption::ColumnName {
        field: field.into(),
        column: column.into(),
    }
}

/// Cache of parsed models keyed by entity type.
///
/// Each [`Db`](crate::Db) owns one registry; models are parsed on first use
/// and every later lookup returns the same `Arc`.
#[derive(Debug, Default)]
pub struct Registry {
    models: RwLock<HashMap<TypeId, Arc<Model>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the model for `T`, parsing and publishing it on first use.
    pub fn get<T: Entity>(&self) -> OrmResult<Arc<Model>> {
        let key = TypeId::of::<T>();
        {
            let models = self.models.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(model) = models.get(&key) {
                return Ok(Arc::clone(model));
            }
        }

        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(model) = models.get(&key) {
            return Ok(Arc::clone(model));
        }
        let model = Arc::new(Model::parse::<T>()?);
        debug!(
            entity = T::DESCRIPTOR.type_name,
            table = model.table_name(),
            fields = model.fields().len(),
            "registered model"
        );
        models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// Parse `T`, apply `options` in order and publish the result.
    ///
    /// Fails with `AlreadyRegistered` if a model for `T` exists already,
    /// including one published implicitly by [`Registry::get`].
    pub fn register<T: Entity>(
        &self,
        options: impl IntoIterator<Item = ModelOption>,
    ) -> OrmResult<Arc<Model>> {
        let key = TypeId::of::<T>();
        let mut models = self.models.write().unwrap_or_else(PoisonError::into_inner);
        if models.contains_key(&key) {
            return Err(OrmError::AlreadyRegistered(T::DESCRIPTOR.type_name));
        }
        let mut model = Model::parse::<T>()?;
        for option in options {
            model.apply(option)?;
        }
        let model = Arc::new(model);
        debug!(
            entity = T::DESCRIPTOR.type_name,
            table = model.table_name(),
            fields = model.fields().len(),
            "registered model with options"
        );
        models.insert(key, Arc::clone(&model));
        Ok(model)
    }

    /// Number of published models.
    pub fn len(&self) -> usize {
        self.models.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

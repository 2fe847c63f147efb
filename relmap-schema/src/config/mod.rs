//! Configuration file parsing for `relmap.toml`.
//!
//! ```toml
//! [fetch]
//! query_timeout_ms = 5000
//! callback_dispatch = "sequential"
//!
//! [debug]
//! log_sql = true
//!
//! [entities.Customer]
//! table = "customers"
//! id = ["id"]
//! fields = ["name"]
//!
//! [entities.Customer.relations.orders]
//! kind = "one_to_many"
//! target = "Order"
//! references = ["customer_id"]
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use crate::error::{SchemaError, SchemaResult};
use crate::model::{EntityModel, FieldDef};
use crate::relation::{JoinTableSpec, RelationDef, RelationKind};
use crate::schema::Schema;

/// Main configuration structure for `relmap.toml`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelmapConfig {
    /// Batch fetch settings.
    #[serde(default)]
    pub fetch: FetchSection,

    /// Debug/logging settings.
    #[serde(default)]
    pub debug: DebugSection,

    /// Entity metadata, keyed by entity name.
    #[serde(default)]
    pub entities: IndexMap<SmolStr, EntityConfig>,

    /// Environment-specific overrides.
    #[serde(default)]
    pub environments: HashMap<String, EnvironmentOverride>,
}

impl RelmapConfig {
    /// Load configuration from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> SchemaResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&content)
    }

    /// Parse configuration from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> SchemaResult<Self> {
        let expanded = expand_env_vars(content);

        toml::from_str(&expanded).map_err(|e| SchemaError::TomlError { source: e })
    }

    /// Apply environment-specific overrides.
    pub fn with_environment(mut self, env: &str) -> Self {
        if let Some(overrides) = self.environments.remove(env) {
            if let Some(fetch) = overrides.fetch {
                if let Some(timeout) = fetch.query_timeout_ms {
                    self.fetch.query_timeout_ms = Some(timeout);
                }
                if let Some(dispatch) = fetch.callback_dispatch {
                    self.fetch.callback_dispatch = dispatch;
                }
            }
            if let Some(debug) = overrides.debug {
                if let Some(log_plans) = debug.log_plans {
                    self.debug.log_plans = log_plans;
                }
                if let Some(log_sql) = debug.log_sql {
                    self.debug.log_sql = log_sql;
                }
            }
        }
        self
    }

    /// Build and validate a [`Schema`] from the `[entities]` tables.
    pub fn schema(&self) -> SchemaResult<Schema> {
        let mut schema = Schema::new();
        for (name, entity) in &self.entities {
            schema.add_entity(entity.to_model(name))?;
        }
        schema.validate()?;
        Ok(schema)
    }
}

/// How completion callbacks of one batch are driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CallbackDispatch {
    /// Await callbacks one after another, in request order.
    #[default]
    Sequential,
    /// Await all callbacks of a batch together.
    Concurrent,
}

/// `[fetch]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FetchSection {
    /// Upper bound for the batch query plus materialization, in milliseconds.
    #[serde(default)]
    pub query_timeout_ms: Option<u64>,

    /// Callback dispatch mode.
    #[serde(default)]
    pub callback_dispatch: CallbackDispatch,
}

/// `[debug]` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugSection {
    /// Log every batch plan at debug level.
    #[serde(default)]
    pub log_plans: bool,

    /// Log rendered SQL at trace level.
    #[serde(default)]
    pub log_sql: bool,
}

/// `[entities.<Name>]` table.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
    /// Table name (defaults to the entity name).
    #[serde(default)]
    pub table: Option<SmolStr>,

    /// Identifier fields.
    #[serde(default)]
    pub id: Vec<SmolStr>,

    /// Other scalar fields.
    #[serde(default)]
    pub fields: Vec<SmolStr>,

    /// Field to column renames.
    #[serde(default)]
    pub columns: IndexMap<SmolStr, SmolStr>,

    /// Relations keyed by navigation name.
    #[serde(default)]
    pub relations: IndexMap<SmolStr, RelationConfig>,
}

impl EntityConfig {
    fn to_model(&self, name: &SmolStr) -> EntityModel {
        let mut model = EntityModel::new(name.clone());
        if let Some(table) = &self.table {
            model = model.table(table.clone());
        }

        let ids = self.id.iter().map(|f| (f, true));
        let others = self.fields.iter().filter(|f| !self.id.contains(f)).map(|f| (f, false));
        for (field, is_id) in ids.chain(others) {
            let mut def = if is_id { FieldDef::id(field.clone()) } else { FieldDef::new(field.clone()) };
            if let Some(column) = self.columns.get(field) {
                def = def.with_column(column.clone());
            }
            model = model.field(def);
        }

        for (rel_name, rel) in &self.relations {
            model = model.relation(RelationDef {
                name: rel_name.clone(),
                kind: rel.kind,
                target: rel.target.clone(),
                fields: rel.fields.clone(),
                references: rel.references.clone(),
                through: rel.through.clone(),
            });
        }
        model
    }
}

/// `[entities.<Name>.relations.<rel>]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelationConfig {
    /// Relation kind.
    pub kind: RelationKind,
    /// Target entity.
    pub target: SmolStr,
    /// Key fields on the owning entity.
    #[serde(default)]
    pub fields: Vec<SmolStr>,
    /// Referenced fields on the target.
    #[serde(default)]
    pub references: Vec<SmolStr>,
    /// Join table for many-to-many relations.
    #[serde(default)]
    pub through: Option<JoinTableSpec>,
}

/// Environment-specific configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentOverride {
    /// Fetch overrides.
    #[serde(default)]
    pub fetch: Option<FetchOverride>,
    /// Debug overrides.
    #[serde(default)]
    pub debug: Option<DebugOverride>,
}

/// Fetch configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FetchOverride {
    /// Query timeout override.
    pub query_timeout_ms: Option<u64>,
    /// Dispatch mode override.
    pub callback_dispatch: Option<CallbackDispatch>,
}

/// Debug configuration overrides.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DebugOverride {
    /// Plan logging override.
    pub log_plans: Option<bool>,
    /// SQL logging override.
    pub log_sql: Option<bool>,
}

static ENV_VAR: LazyLock<regex_lite::Regex> = LazyLock::new(|| {
    regex_lite::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}").expect("valid env var pattern")
});

/// Expand `${VAR}` and `${VAR:-default}` references.
///
/// Unset variables without a default are left untouched.
fn expand_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex_lite::Captures<'_>| {
            match (std::env::var(&caps[1]), caps.get(2)) {
                (Ok(value), _) => value,
                (Err(_), Some(default)) => default.as_str().to_string(),
                (Err(_), None) => caps[0].to_string(),
            }
        })
        .into_owned()
}

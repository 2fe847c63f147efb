//! Runtime fetch configuration.
//!
//! `FetchConfig` is the resolved form of the `[fetch]` and `[debug]` sections
//! of `relmap.toml`. It can also be assembled in code or from the
//! `RELMAP_QUERY_TIMEOUT_MS` and `RELMAP_CALLBACK_DISPATCH` environment
//! variables.

use std::env;
use std::time::Duration;

use relmap_schema::{CallbackDispatch, RelmapConfig};

use crate::error::{FetchError, FetchResult};
use crate::sql::DatabaseType;

/// Resolved fetch settings for a [`MappingSession`](crate::MappingSession).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchConfig {
    /// Upper bound on the correlation query plus entity loading.
    pub query_timeout: Option<Duration>,
    /// How completion callbacks of one batch are run.
    pub callback_dispatch: CallbackDispatch,
    /// Log every batch plan at debug level.
    pub log_plans: bool,
    /// Log rendered SQL at trace level.
    pub log_sql: bool,
    /// Placeholder dialect for rendered SQL.
    pub dialect: DatabaseType,
}

impl FetchConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    /// Set the callback dispatch mode.
    pub fn with_dispatch(mut self, dispatch: CallbackDispatch) -> Self {
        self.callback_dispatch = dispatch;
        self
    }

    /// Enable plan logging.
    pub fn with_plan_logging(mut self, enabled: bool) -> Self {
        self.log_plans = enabled;
        self
    }

    /// Enable SQL logging.
    pub fn with_sql_logging(mut self, enabled: bool) -> Self {
        self.log_sql = enabled;
        self
    }

    /// Set the SQL dialect used for logging rendered plans.
    pub fn with_dialect(mut self, dialect: DatabaseType) -> Self {
        self.dialect = dialect;
        self
    }

    /// Build a configuration from environment variables.
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> FetchResult<Self> {
        let mut config = Self::default();

        if let Ok(ms) = env::var("RELMAP_QUERY_TIMEOUT_MS") {
            let ms: u64 = ms.trim().parse().map_err(|_| {
                FetchError::configuration(format!("RELMAP_QUERY_TIMEOUT_MS is not a number: `{}`", ms))
            })?;
            config.query_timeout = Some(Duration::from_millis(ms));
        }

        if let Ok(dispatch) = env::var("RELMAP_CALLBACK_DISPATCH") {
            config.callback_dispatch = match dispatch.to_lowercase().as_str() {
                "sequential" => CallbackDispatch::Sequential,
                "concurrent" => CallbackDispatch::Concurrent,
                other => {
                    return Err(FetchError::configuration(format!(
                        "RELMAP_CALLBACK_DISPATCH must be `sequential` or `concurrent`, got `{}`",
                        other
                    )));
                }
            };
        }

        Ok(config)
    }
}

impl From<&RelmapConfig> for FetchConfig {
    fn from(config: &RelmapConfig) -> Self {
        Self {
            query_timeout: config.fetch.query_timeout_ms.map(Duration::from_millis),
            callback_dispatch: config.fetch.callback_dispatch,
            log_plans: config.debug.log_plans,
            log_sql: config.debug.log_sql,
            dialect: DatabaseType::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = FetchConfig::new();
        assert_eq!(config.query_timeout, None);
        assert_eq!(config.callback_dispatch, CallbackDispatch::Sequential);
        assert!(!config.log_sql);
    }

    #[test]
    fn test_from_relmap_config() {
        let parsed = RelmapConfig::from_str(
            r#"
            [fetch]
            query_timeout_ms = 250
            callback_dispatch = "concurrent"

            [debug]
            log_sql = true
            "#,
        )
        .unwrap();

        let config = FetchConfig::from(&parsed);
        assert_eq!(config.query_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.callback_dispatch, CallbackDispatch::Concurrent);
        assert!(config.log_sql);
        assert!(!config.log_plans);
    }
}

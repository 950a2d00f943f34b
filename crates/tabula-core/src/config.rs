use serde::{Deserialize, Serialize};

/// Storage engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Database connection URL.
    pub url: String,

    /// Statement timeout in seconds, applied to the engine's connection.
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,

    /// What the diff engine is allowed to drop.
    #[serde(default)]
    pub drop_mode: DropMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            statement_timeout_secs: default_statement_timeout(),
            drop_mode: DropMode::default(),
        }
    }
}

fn default_statement_timeout() -> u64 {
    30
}

/// Drop policy for structures present in the database but absent from the
/// declared models. `Full` matches the historical always-drop behavior and
/// is the default; deployments that converge against data they care about
/// should run `Safe` or `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DropMode {
    /// Never emit a drop of any kind.
    None,
    /// Drop constraints and indexes, but never tables or columns.
    Safe,
    /// Drop everything not present in the expected structure.
    #[default]
    Full,
}

impl DropMode {
    pub fn allows_constraint_drops(self) -> bool {
        !matches!(self, DropMode::None)
    }

    pub fn allows_column_drops(self) -> bool {
        matches!(self, DropMode::Full)
    }

    pub fn allows_table_drops(self) -> bool {
        matches!(self, DropMode::Full)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StorageConfig::default();
        assert_eq!(config.statement_timeout_secs, 30);
        assert_eq!(config.drop_mode, DropMode::Full);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
            url = "postgres://localhost/test"
            drop_mode = "safe"
        "#;

        let config: StorageConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.url, "postgres://localhost/test");
        assert_eq!(config.drop_mode, DropMode::Safe);
        assert_eq!(config.statement_timeout_secs, 30);
    }

    #[test]
    fn test_drop_mode_permissions() {
        assert!(!DropMode::None.allows_constraint_drops());
        assert!(DropMode::Safe.allows_constraint_drops());
        assert!(!DropMode::Safe.allows_table_drops());
        assert!(DropMode::Full.allows_column_drops());
    }
}

use crate::filter::FilterAttribute;
use crate::sort::Sorter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub config_version: u32,
    pub fields: FieldMap,
    pub filter_attributes: Option<Vec<FilterAttribute>>,
    pub sorters: Vec<Sorter>,
    pub lazy_load: Option<LazyLoadConfig>,
    pub labels: Labels,
    pub removal_grace_ms: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            config_version: 1,
            fields: FieldMap::default(),
            filter_attributes: None,
            sorters: Vec::new(),
            lazy_load: None,
            labels: Labels::default(),
            removal_grace_ms: 1000,
        }
    }
}

/// Field names backing each logical role of a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FieldMap {
    pub id: String,
    pub parent: String,
    pub children: Option<String>,
    pub level: String,
    pub child_count: String,
    pub selection_disabled: Option<String>,
}

impl Default for FieldMap {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            parent: "parent_id".to_string(),
            children: None,
            level: "level".to_string(),
            child_count: "child_count".to_string(),
            selection_disabled: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LazyLoadConfig {
    pub resource: String,
    pub tree: bool,
    pub max_resident_rows: usize,
    pub request_timeout_ms: u64,
    pub scroll_debounce_ms: u64,
    pub row_height_px: f64,
    pub max_resubscribe_attempts: u32,
}

impl Default for LazyLoadConfig {
    fn default() -> Self {
        Self {
            resource: String::new(),
            tree: true,
            max_resident_rows: 100,
            request_timeout_ms: 3000,
            scroll_debounce_ms: 250,
            row_height_px: 38.0,
            max_resubscribe_attempts: 3,
        }
    }
}

impl LazyLoadConfig {
    pub fn for_resource(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Self::default()
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn scroll_debounce(&self) -> Duration {
        Duration::from_millis(self.scroll_debounce_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub results: String,
    pub of: String,
    pub generic_error: String,
    pub permission_denied: String,
    pub no_items: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            results: "resultado(s)".to_string(),
            of: "de".to_string(),
            generic_error: "Ocorreu um erro a carregar os dados.".to_string(),
            permission_denied: "Não tem permissão para executar esta operação".to_string(),
            no_items: "Não existem quaisquer resultados para mostrar.".to_string(),
        }
    }
}

impl GridConfig {
    pub fn load_or_default() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str::<GridConfig>(&raw)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    pub fn save(&self) -> Result<PathBuf> {
        let path = config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        ensure_parent_dir(path)?;
        let body = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, body).with_context(|| format!("failed to write config: {}", path.display()))
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy_load.is_some()
    }

    pub fn removal_grace(&self) -> Duration {
        Duration::from_millis(self.removal_grace_ms)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("could not resolve config directory")?;
    Ok(base.join("lazygrid").join("config.toml"))
}

fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::MatchOperator;
    use crate::sort::SortDirection;

    #[test]
    fn default_values_are_local_mode() {
        let cfg = GridConfig::default();
        assert_eq!(cfg.config_version, 1);
        assert!(!cfg.is_lazy());
        assert_eq!(cfg.fields.id, "id");
        assert_eq!(cfg.fields.parent, "parent_id");
        assert_eq!(cfg.removal_grace(), Duration::from_secs(1));
    }

    #[test]
    fn lazy_defaults_match_remote_contract() {
        let lazy = LazyLoadConfig::for_resource("stores");
        assert_eq!(lazy.resource, "stores");
        assert_eq!(lazy.max_resident_rows, 100);
        assert_eq!(lazy.request_timeout(), Duration::from_millis(3000));
        assert_eq!(lazy.scroll_debounce(), Duration::from_millis(250));
        assert!(lazy.tree);
    }

    #[test]
    fn partial_config_is_deserialized_with_defaults() {
        let raw = r#"
config_version = 1

[fields]
id = "uuid"

[lazy_load]
resource = "accounts"
max_resident_rows = 50
"#;

        let cfg = toml::from_str::<GridConfig>(raw).expect("parse partial config");
        assert_eq!(cfg.fields.id, "uuid");
        assert_eq!(cfg.fields.level, "level");
        let lazy = cfg.lazy_load.expect("lazy section");
        assert_eq!(lazy.max_resident_rows, 50);
        assert_eq!(lazy.scroll_debounce_ms, 250);
        assert_eq!(cfg.labels.results, "resultado(s)");
    }

    #[test]
    fn saved_config_loads_back() {
        let dir = std::env::temp_dir().join(format!("lazygrid-config-{}", std::process::id()));
        let path = dir.join("nested").join("config.toml");
        let mut cfg = GridConfig::default();
        cfg.lazy_load = Some(LazyLoadConfig::for_resource("orders"));
        cfg.fields.children = Some("children".to_string());

        cfg.save_to(&path).expect("save config");
        let loaded = GridConfig::load_from(&path).expect("load config");
        let _ = fs::remove_dir_all(&dir);

        assert_eq!(loaded.lazy_load, cfg.lazy_load);
        assert_eq!(loaded.fields, cfg.fields);
    }

    #[test]
    fn filter_attributes_and_sorters_deserialize() {
        let raw = r#"
filter_attributes = ["name", { field = "code", operator = "starts_with" }]

[[sorters]]
path = "name"
direction = "descending"
"#;

        let cfg = toml::from_str::<GridConfig>(raw).expect("parse attributes");
        let attributes = cfg.filter_attributes.expect("attributes");
        assert_eq!(attributes[0], FilterAttribute::Field("name".to_string()));
        assert_eq!(
            attributes[1],
            FilterAttribute::Descriptor {
                field: "code".to_string(),
                operator: MatchOperator::StartsWith,
            }
        );
        assert_eq!(cfg.sorters[0].direction, SortDirection::Descending);
    }
}

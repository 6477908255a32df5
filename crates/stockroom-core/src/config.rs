use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use crate::db::STORE_DB_FILE;

/// Name of the per-project state directory.
pub const STOCKROOM_DIR: &str = ".stockroom";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub terminology: Terminology,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database path; relative paths are resolved against the project root.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

/// Display terms for the things the store tracks.
///
/// Every field may be left empty in the file; accessors fall back to the
/// built-in term.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminology {
    #[serde(default)]
    pub item: String,
    #[serde(default)]
    pub items: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub locations: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub groups: String,
}

fn term<'a>(configured: &'a str, fallback: &'a str) -> &'a str {
    let trimmed = configured.trim();
    if trimmed.is_empty() { fallback } else { trimmed }
}

impl Terminology {
    #[must_use]
    pub fn item(&self) -> &str {
        term(&self.item, "Item")
    }

    #[must_use]
    pub fn items(&self) -> &str {
        term(&self.items, "Items")
    }

    #[must_use]
    pub fn location(&self) -> &str {
        term(&self.location, "Location")
    }

    #[must_use]
    pub fn locations(&self) -> &str {
        term(&self.locations, "Locations")
    }

    #[must_use]
    pub fn group(&self) -> &str {
        term(&self.group, "Group")
    }

    #[must_use]
    pub fn groups(&self) -> &str {
        term(&self.groups, "Groups")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Default acting user (id or username) when `--as` is not given.
    #[serde(default)]
    pub user: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub project: ProjectConfig,
    pub user: UserConfig,
    pub resolved_output: String,
}

impl ProjectConfig {
    /// Absolute database path for a project rooted at `project_root`.
    #[must_use]
    pub fn store_path(&self, project_root: &Path) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            project_root.join(&self.store.path)
        }
    }
}

/// Path of the project config file under `project_root`.
#[must_use]
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(STOCKROOM_DIR).join("config.toml")
}

/// Load `.stockroom/config.toml`, or defaults when it does not exist.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_config_path(project_root);
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Write `config` to the project config file, creating `.stockroom/`.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_project_config(project_root: &Path, config: &ProjectConfig) -> Result<PathBuf> {
    let path = project_config_path(project_root);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let content = toml::to_string_pretty(config).context("Failed to serialize project config")?;
    std::fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// # Errors
///
/// Returns an error if the user config exists but cannot be read or parsed.
pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("stockroom/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// # Errors
///
/// Returns an error if either config file is unreadable.
pub fn resolve_config(project_root: &Path, cli_json: bool) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(cli_json, user.output.clone(), env_format);

    Ok(EffectiveConfig {
        project,
        user,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "table" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

fn default_store_path() -> PathBuf {
    Path::new(STOCKROOM_DIR).join(STORE_DB_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg, ProjectConfig::default());
        assert_eq!(
            cfg.store_path(root.path()),
            root.path().join(".stockroom").join("stockroom.sqlite3")
        );
        assert_eq!(cfg.terminology.group(), "Group");
    }

    #[test]
    fn terminology_falls_back_for_blank_values() {
        let cfg: ProjectConfig = toml::from_str(
            r#"
[terminology]
item = "Asset"
items = "Assets"
location = "  "
group = "Category"
"#,
        )
        .expect("parse");

        let terms = &cfg.terminology;
        assert_eq!(terms.item(), "Asset");
        assert_eq!(terms.items(), "Assets");
        assert_eq!(terms.location(), "Location");
        assert_eq!(terms.locations(), "Locations");
        assert_eq!(terms.group(), "Category");
        assert_eq!(terms.groups(), "Groups");
    }

    #[test]
    fn absolute_store_path_is_kept() {
        let cfg: ProjectConfig = toml::from_str(
            r#"
[store]
path = "/var/lib/stockroom/db.sqlite3"
"#,
        )
        .expect("parse");
        assert_eq!(
            cfg.store_path(Path::new("/home/alice/project")),
            PathBuf::from("/var/lib/stockroom/db.sqlite3")
        );
    }

    #[test]
    fn written_config_loads_back() {
        let root = tempfile::tempdir().expect("temp dir");
        let mut cfg = ProjectConfig::default();
        cfg.terminology.location = "Bin".into();

        let path = write_project_config(root.path(), &cfg).expect("write");
        assert!(path.ends_with(".stockroom/config.toml"));
        assert_eq!(load_project_config(root.path()).expect("load"), cfg);
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        std::fs::create_dir_all(root.path().join(STOCKROOM_DIR)).expect("mkdir");
        std::fs::write(project_config_path(root.path()), "[store\npath = 3").expect("write");

        let err = load_project_config(root.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse"));
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()));
        assert_eq!(output, "json");
    }

    #[test]
    fn legacy_aliases_are_normalized() {
        let pretty = resolve_output(false, Some("table".to_string()), Some("human".to_string()));
        assert_eq!(pretty, "pretty");

        let text = resolve_output(false, Some("human".to_string()), Some("table".to_string()));
        assert_eq!(text, "text");
    }

    #[test]
    fn user_config_parses_default_user() {
        let cfg: UserConfig = toml::from_str(
            r#"
output = "json"
user = "alice"
"#,
        )
        .expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        assert_eq!(cfg.user.as_deref(), Some("alice"));
    }
}

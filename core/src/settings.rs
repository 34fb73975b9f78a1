use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::address::DEFAULT_DELIMITER;
use crate::error::{Error, Result};


/// Document-wide behaviour switches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Separator between address segments.
    pub delimiter: String,
    /// Whether lookups go through the handle cache by default.
    pub use_cache: bool,
    /// Whether writes and deletes re-check handles below the touched path.
    pub cascade_invalidation: bool,
}

impl Default for Settings {
    fn default() -> Self {
        default_settings()
    }
}

impl Settings {
    /// Overlay `RFX_DELIMITER`, `RFX_USE_CACHE` and `RFX_CASCADE` from the
    /// process environment.
    pub fn apply_env(self) -> Result<Self> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`, keyed by environment variable name.
    pub fn apply_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(delimiter) = lookup("RFX_DELIMITER") {
            self.delimiter = delimiter;
        }
        if let Some(raw) = lookup("RFX_USE_CACHE") {
            self.use_cache = parse_bool("RFX_USE_CACHE", &raw)?;
        }
        if let Some(raw) = lookup("RFX_CASCADE") {
            self.cascade_invalidation = parse_bool("RFX_CASCADE", &raw)?;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.delimiter.is_empty() {
            return Err(Error::Config("delimiter must not be empty".into()));
        }
        Ok(())
    }
}


/// Returns the defaults for all settings fields.
pub fn default_settings() -> Settings {
    Settings {
        delimiter: DEFAULT_DELIMITER.into(),
        use_cache: true,
        cascade_invalidation: true,
    }
}


/// Load `Settings` from a YAML file.
pub fn load(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| Error::Io(path.to_path_buf(), e))?;
    parse(&content)
}


/// Save `Settings` to a YAML file.
pub fn save(path: &Path, settings: &Settings) -> Result<()> {
    settings.validate()?;
    let content = serde_yaml::to_string(settings)?;
    std::fs::write(path, content).map_err(|e| Error::Io(path.to_path_buf(), e))
}


/// Parse settings from YAML. Missing fields keep their defaults; an empty
/// file is all defaults.
pub fn parse(content: &str) -> Result<Settings> {
    if content.trim().is_empty() {
        return Ok(default_settings());
    }
    let settings: Settings = serde_yaml::from_str(content)?;
    settings.validate()?;
    Ok(settings)
}


fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("invalid bool for {}: {}", name, raw))),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let s = default_settings();
        assert_eq!(s.delimiter, "/");
        assert!(s.use_cache);
        assert!(s.cascade_invalidation);
        assert_eq!(Settings::default(), s);
    }

    #[test]
    fn parse_partial_keeps_defaults() {
        let s = parse("delimiter: \".\"\n").unwrap();
        assert_eq!(s.delimiter, ".");
        assert!(s.use_cache);
        assert!(s.cascade_invalidation);
    }

    #[test]
    fn parse_empty_is_defaults() {
        assert_eq!(parse("").unwrap(), default_settings());
        assert_eq!(parse("  \n").unwrap(), default_settings());
    }

    #[test]
    fn parse_all_fields() {
        let s = parse("delimiter: \"::\"\nuse_cache: false\ncascade_invalidation: false\n").unwrap();
        assert_eq!(s.delimiter, "::");
        assert!(!s.use_cache);
        assert!(!s.cascade_invalidation);
    }

    #[test]
    fn parse_rejects_empty_delimiter() {
        assert!(matches!(parse("delimiter: \"\"\n"), Err(Error::Config(_))));
    }

    #[test]
    fn parse_rejects_malformed_yaml() {
        assert!(matches!(parse("use_cache: [1"), Err(Error::Yaml(_))));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = std::env::temp_dir().join(format!("reflective-settings-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("settings.yaml");
        let original = Settings {
            delimiter: ".".into(),
            use_cache: false,
            cascade_invalidation: true,
        };
        save(&path, &original).unwrap();
        assert_eq!(load(&path).unwrap(), original);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let path = std::env::temp_dir().join("reflective-settings-does-not-exist.yaml");
        assert!(matches!(load(&path), Err(Error::Io(..))));
    }

    #[test]
    fn overrides_apply_on_top() {
        let env: HashMap<&str, &str> = [("RFX_DELIMITER", "."), ("RFX_USE_CACHE", "off")]
            .into_iter()
            .collect();
        let s = default_settings()
            .apply_overrides(|name| env.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(s.delimiter, ".");
        assert!(!s.use_cache);
        assert!(s.cascade_invalidation);
    }

    #[test]
    fn overrides_reject_bad_values() {
        let bad_bool = default_settings().apply_overrides(|name| {
            (name == "RFX_CASCADE").then(|| "maybe".to_string())
        });
        assert!(matches!(bad_bool, Err(Error::Config(_))));
        let empty = default_settings().apply_overrides(|name| {
            (name == "RFX_DELIMITER").then(String::new)
        });
        assert!(matches!(empty, Err(Error::Config(_))));
    }
}

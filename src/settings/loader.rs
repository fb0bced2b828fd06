//! Settings loader that merges files and environment variables.

use super::HookSettings;
use crate::core::Validate;
use crate::error::{HookError, Result};
use config::{Environment, File};
use std::path::{Path, PathBuf};

/// Loads [`HookSettings`] from files and environment variables.
///
/// Files are merged in the order they were added (later files override
/// earlier ones); environment variables override every file.
///
/// # Examples
///
/// ```rust,no_run
/// use change_notify::settings::SettingsLoader;
///
/// # fn example() -> change_notify::error::Result<()> {
/// // CHANGE_NOTIFY_DESTINATION=orders -> destination = "orders"
/// let settings = SettingsLoader::new()
///     .with_file("config/notify.yaml")
///     .with_env_overrides("CHANGE_NOTIFY", "__")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SettingsLoader {
    files: Vec<PathBuf>,
    env: Option<(String, String)>,
}

impl SettingsLoader {
    /// Create a loader with no sources.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a YAML, TOML or JSON file; the format comes from the extension.
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.files.push(path.into());
        self
    }

    /// Read overrides from environment variables named `{prefix}_{KEY}`.
    ///
    /// `separator` splits nested keys.
    pub fn with_env_overrides(mut self, prefix: &str, separator: &str) -> Self {
        self.env = Some((prefix.to_string(), separator.to_string()));
        self
    }

    /// Whether any source was added.
    pub fn has_sources(&self) -> bool {
        !self.files.is_empty() || self.env.is_some()
    }

    /// Load and validate settings.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - No sources were added
    /// - A file is missing or has an unsupported extension
    /// - A source cannot be parsed or deserialized
    /// - The merged settings fail validation
    pub fn load(&self) -> Result<HookSettings> {
        let settings = self.load_unvalidated()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings without validating them, so callers can apply
    /// overrides first.
    pub(crate) fn load_unvalidated(&self) -> Result<HookSettings> {
        if !self.has_sources() {
            return Err(HookError::Settings(
                "No settings sources specified".to_string(),
            ));
        }

        let mut builder = config::Config::builder();

        for path in &self.files {
            validate_extension(path)?;
            if !path.exists() {
                return Err(HookError::Settings(format!(
                    "Settings file not found: {}",
                    path.display()
                )));
            }
            builder = builder.add_source(File::from(path.clone()).required(true));
        }

        if let Some((prefix, separator)) = &self.env {
            builder = builder.add_source(
                Environment::with_prefix(prefix)
                    .prefix_separator("_")
                    .separator(separator)
                    .try_parsing(true),
            );
        }

        let config = builder
            .build()
            .map_err(|e| HookError::Settings(format!("Failed to load settings: {}", e)))?;

        config
            .try_deserialize::<HookSettings>()
            .map_err(|e| HookError::Settings(format!("Failed to deserialize settings: {}", e)))
    }
}

fn validate_extension(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .ok_or_else(|| {
            HookError::Settings(format!(
                "Unable to determine file format for: {}",
                path.display()
            ))
        })?;

    match extension {
        "yaml" | "yml" | "toml" | "json" => Ok(()),
        _ => Err(HookError::Settings(format!(
            "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
            extension
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_no_sources() {
        let result = SettingsLoader::new().load();
        assert!(matches!(result, Err(HookError::Settings(_))));
    }

    #[test]
    fn test_validate_extension() {
        assert!(validate_extension(Path::new("notify.yaml")).is_ok());
        assert!(validate_extension(Path::new("notify.yml")).is_ok());
        assert!(validate_extension(Path::new("notify.toml")).is_ok());
        assert!(validate_extension(Path::new("notify.json")).is_ok());
        assert!(validate_extension(Path::new("notify.txt")).is_err());
        assert!(validate_extension(Path::new("notify")).is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = SettingsLoader::new()
            .with_file("/nonexistent/notify.yaml")
            .load();
        assert!(matches!(result, Err(HookError::Settings(msg)) if msg.contains("not found")));
    }

    #[test]
    fn test_load_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notify.yaml");
        fs::write(
            &path,
            r#"
destination: orders-queue
call_timeout_ms: 1500
serialize_calls: false
"#,
        )
        .unwrap();

        let settings = SettingsLoader::new().with_file(&path).load().unwrap();
        assert_eq!(settings.destination, "orders-queue");
        assert_eq!(settings.call_timeout_ms, Some(1500));
        assert!(!settings.serialize_calls);
        assert_eq!(settings.message_body, None);
    }

    #[test]
    fn test_later_file_overrides() {
        let temp_dir = TempDir::new().unwrap();
        let base = temp_dir.path().join("base.toml");
        let prod = temp_dir.path().join("prod.json");
        fs::write(&base, "destination = \"dev-queue\"\npublish_timeout_ms = 200\n").unwrap();
        fs::write(&prod, r#"{ "destination": "prod-queue" }"#).unwrap();

        let settings = SettingsLoader::new()
            .with_file(&base)
            .with_file(&prod)
            .load()
            .unwrap();
        assert_eq!(settings.destination, "prod-queue");
        assert_eq!(settings.publish_timeout_ms, Some(200));
    }

    #[test]
    fn test_validation_applies() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("notify.yaml");
        fs::write(&path, "call_timeout_ms: 10\n").unwrap();

        let result = SettingsLoader::new().with_file(&path).load();
        assert!(matches!(result, Err(HookError::Validation(msg)) if msg.contains("destination")));

        let unvalidated = SettingsLoader::new()
            .with_file(&path)
            .load_unvalidated()
            .unwrap();
        assert_eq!(unvalidated.call_timeout_ms, Some(10));
    }
}

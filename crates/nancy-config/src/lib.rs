//! Configuration management for Nancy.
//!
//! Parses `nancy.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! The `[build]` paths support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default

mod expand;

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the source tree.
    pub input: Option<PathBuf>,
    /// Override the output tree.
    pub output: Option<PathBuf>,
    /// Override the sub-tree to build.
    pub path: Option<PathBuf>,
    /// Override keep-going mode.
    pub keep_going: Option<bool>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "nancy.toml";

/// Application configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build configuration (paths are relative strings from TOML).
    build: BuildConfigRaw,
    /// Materializer settings.
    pub xml: XmlConfig,

    /// Resolved build configuration (set after loading).
    #[serde(skip)]
    pub build_resolved: BuildConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

/// Raw build configuration as parsed from TOML (paths as strings).
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct BuildConfigRaw {
    input: Option<String>,
    output: Option<String>,
    path: Option<String>,
    keep_going: Option<bool>,
}

/// Resolved build configuration.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct BuildConfig {
    /// Source tree.
    pub input: Option<PathBuf>,
    /// Output tree.
    pub output: Option<PathBuf>,
    /// Sub-tree of `input` to build, relative to `input`.
    pub path: Option<PathBuf>,
    /// Annotate macro errors instead of failing.
    pub keep_going: bool,
}

/// Materializer settings.
#[derive(Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct XmlConfig {
    /// Extensions of files parsed as XML.
    pub structured_extensions: Vec<String>,
    /// Extensions of files registered as query modules.
    pub module_extensions: Vec<String>,
    /// Entries whose name starts with this are ignored.
    pub hidden_prefix: String,
}

impl Default for XmlConfig {
    fn default() -> Self {
        Self {
            structured_extensions: vec!["xml".to_owned(), "xhtml".to_owned()],
            module_extensions: ["xq", "xql", "xqm", "xqy"].map(str::to_owned).to_vec(),
            hidden_prefix: ".".to_owned(),
        }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`build.input`").
        field: String,
        /// Error message (e.g., "${`SITE_DIR`} not set").
        message: String,
    },
}

/// Require every extension to be non-empty and given without a dot.
fn require_extensions(extensions: &[String], field: &str) -> Result<(), ConfigError> {
    if extensions.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    for extension in extensions {
        if extension.is_empty() || extension.starts_with('.') {
            return Err(ConfigError::Validation(format!(
                "{field} entries must be non-empty and have no leading dot, got '{extension}'"
            )));
        }
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `nancy.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = std::env::current_dir()
            .ok()
            .and_then(|cwd| Self::discover_config(&cwd))
        {
            Self::load_from_file(&discovered)?
        } else {
            Self::default()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
        }
        config.validate()?;

        Ok(config)
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(input) = &settings.input {
            self.build_resolved.input = Some(input.clone());
        }
        if let Some(output) = &settings.output {
            self.build_resolved.output = Some(output.clone());
        }
        if let Some(path) = &settings.path {
            self.build_resolved.path = Some(path.clone());
        }
        if let Some(keep_going) = settings.keep_going {
            self.build_resolved.keep_going = keep_going;
        }
    }

    /// Input and output trees, both of which a build needs.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first one that is unset.
    pub fn require_paths(&self) -> Result<(&Path, &Path), ConfigError> {
        let input = self.build_resolved.input.as_deref().ok_or_else(|| {
            ConfigError::Validation("no input directory given (build.input)".to_owned())
        })?;
        let output = self.build_resolved.output.as_deref().ok_or_else(|| {
            ConfigError::Validation("no output directory given (build.output)".to_owned())
        })?;
        Ok((input, output))
    }

    /// Search for a config file in `start` and its parents.
    fn discover_config(start: &Path) -> Option<PathBuf> {
        let mut current = start.to_path_buf();
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called by [`Config::load`] once CLI settings are applied.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_xml()?;
        self.validate_build()?;
        Ok(())
    }

    fn validate_xml(&self) -> Result<(), ConfigError> {
        require_extensions(&self.xml.structured_extensions, "xml.structured_extensions")?;
        require_extensions(&self.xml.module_extensions, "xml.module_extensions")?;
        if self.xml.hidden_prefix.is_empty() {
            return Err(ConfigError::Validation(
                "xml.hidden_prefix cannot be empty".to_owned(),
            ));
        }
        Ok(())
    }

    fn validate_build(&self) -> Result<(), ConfigError> {
        if let Some(path) = &self.build_resolved.path
            && path.is_absolute()
        {
            return Err(ConfigError::Validation(format!(
                "build.path must be relative to the input directory, got '{}'",
                path.display()
            )));
        }

        // Rebuilding would otherwise read the previous output back in
        if let (Some(input), Some(output)) = (&self.build_resolved.input, &self.build_resolved.output)
        {
            let input = std::path::absolute(input)?;
            let output = std::path::absolute(output)?;
            if output.starts_with(&input) {
                return Err(ConfigError::Validation(format!(
                    "output directory '{}' cannot be inside input directory '{}'",
                    output.display(),
                    input.display()
                )));
            }
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        let build = &mut self.build;
        for (value, field) in [
            (&mut build.input, "build.input"),
            (&mut build.output, "build.output"),
            (&mut build.path, "build.path"),
        ] {
            if let Some(raw) = value {
                *raw = expand::expand_env(raw, field)?;
            }
        }
        Ok(())
    }

    /// Resolve `input` and `output` against the config directory.
    ///
    /// `path` stays relative to `input`.
    fn resolve_paths(&mut self, config_dir: &Path) {
        self.build_resolved = BuildConfig {
            input: self.build.input.as_deref().map(|p| config_dir.join(p)),
            output: self.build.output.as_deref().map(|p| config_dir.join(p)),
            path: self.build.path.as_deref().map(PathBuf::from),
            keep_going: self.build.keep_going.unwrap_or(false),
        };
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.build_resolved, BuildConfig::default());
        assert_eq!(config.xml.structured_extensions, vec!["xml", "xhtml"]);
        assert_eq!(config.xml.module_extensions, vec!["xq", "xql", "xqm", "xqy"]);
        assert_eq!(config.xml.hidden_prefix, ".");
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.xml, XmlConfig::default());
    }

    #[test]
    fn test_parse_xml_config() {
        let toml = r#"
[xml]
structured_extensions = ["html"]
hidden_prefix = "_"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.xml.structured_extensions, vec!["html"]);
        assert_eq!(config.xml.module_extensions, XmlConfig::default().module_extensions);
        assert_eq!(config.xml.hidden_prefix, "_");
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[build]
input = "src"
output = "public"
path = "people"
keep_going = true
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(
            config.build_resolved,
            BuildConfig {
                input: Some(PathBuf::from("/project/src")),
                output: Some(PathBuf::from("/project/public")),
                path: Some(PathBuf::from("people")),
                keep_going: true,
            }
        );
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config: Config = toml::from_str("[build]\ninput = \"src\"").unwrap();
        config.resolve_paths(Path::new("/project"));
        let overrides = CliSettings {
            output: Some(PathBuf::from("/tmp/out")),
            keep_going: Some(true),
            ..Default::default()
        };

        config.apply_cli_settings(&overrides);

        assert_eq!(config.build_resolved.input, Some(PathBuf::from("/project/src")));
        assert_eq!(config.build_resolved.output, Some(PathBuf::from("/tmp/out")));
        assert!(config.build_resolved.keep_going);
    }

    #[test]
    fn test_require_paths() {
        let mut config = Config::default();
        let err = config.require_paths().unwrap_err();
        assert!(err.to_string().contains("build.input"));

        config.apply_cli_settings(&CliSettings {
            input: Some(PathBuf::from("src")),
            output: Some(PathBuf::from("out")),
            ..Default::default()
        });
        let (input, output) = config.require_paths().unwrap();
        assert_eq!((input, output), (Path::new("src"), Path::new("out")));
    }

    #[test]
    fn test_validate_extensions() {
        let mut config = Config::default();
        config.xml.structured_extensions = vec![".xhtml".to_owned()];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("xml.structured_extensions"));

        config.xml.structured_extensions = Vec::new();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_hidden_prefix() {
        let mut config = Config::default();
        config.xml.hidden_prefix = String::new();
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_validate_output_inside_input() {
        let mut config = Config::default();
        config.apply_cli_settings(&CliSettings {
            input: Some(PathBuf::from("/site")),
            output: Some(PathBuf::from("/site/./public")),
            ..Default::default()
        });
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("inside input"), "{err}");

        config.build_resolved.output = Some(PathBuf::from("/public"));
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_absolute_path() {
        let mut config = Config::default();
        config.build_resolved.path = Some(PathBuf::from("/people"));
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nancy.toml");
        fs::write(
            &config_path,
            "[build]\ninput = \"src\"\noutput = \"out\"\n\n[xml]\nhidden_prefix = \"_\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&config_path), None).unwrap();

        assert_eq!(config.config_path, Some(config_path));
        assert_eq!(config.build_resolved.input, Some(temp_dir.path().join("src")));
        assert_eq!(config.build_resolved.output, Some(temp_dir.path().join("out")));
        assert_eq!(config.xml.hidden_prefix, "_");
    }

    #[test]
    fn test_load_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let missing = temp_dir.path().join("nancy.toml");

        let err = Config::load(Some(&missing), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(path) if path == missing));
    }

    #[test]
    fn test_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nancy.toml");
        fs::write(&config_path, "[build\n").unwrap();

        let err = Config::load(Some(&config_path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_cli_settings_take_precedence() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config_path = temp_dir.path().join("nancy.toml");
        fs::write(&config_path, "[build]\ninput = \"src\"\nkeep_going = true\n").unwrap();
        let settings = CliSettings {
            keep_going: Some(false),
            ..Default::default()
        };

        let config = Config::load(Some(&config_path), Some(&settings)).unwrap();

        assert!(!config.build_resolved.keep_going);
        assert_eq!(config.build_resolved.input, Some(temp_dir.path().join("src")));
    }

    #[test]
    fn test_discover_config_in_parent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let nested = temp_dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();
        fs::write(temp_dir.path().join("nancy.toml"), "").unwrap();

        assert_eq!(
            Config::discover_config(&nested),
            Some(temp_dir.path().join("nancy.toml"))
        );
    }
}

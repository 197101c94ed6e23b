use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};

use crate::paths::resolve_home_dir;

/// Application configuration: strongly-typed global sections plus a
/// per-module configuration bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Process-wide client settings.
    pub client: ClientConfig,
    /// Logging configuration (optional, uses defaults if None).
    pub logging: Option<LoggingConfig>,
    /// Directory containing per-module YAML files (optional).
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// Per-module configuration bag: module_name → arbitrary JSON/YAML value.
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ClientConfig {
    /// Base for relative log paths; normalized to an absolute path on load.
    #[serde(default)]
    pub home_dir: String,
}

/// Logging configuration - maps subsystem names to their logging settings.
/// Key "default" is the catch-all for logs that don't match explicit subsystems.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Section {
    pub console_level: String, // "info", "debug", "error", "off"
    #[serde(default)]
    pub file: String, // "logs/userdir.log", empty disables the file
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

/// Create a default logging configuration.
pub fn default_logging_config() -> LoggingConfig {
    let mut logging = HashMap::new();
    logging.insert(
        "default".to_string(),
        Section {
            console_level: "warn".to_string(),
            file: "logs/userdir.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(10),
        },
    );
    logging
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            client: ClientConfig::default(),
            logging: Some(default_logging_config()),
            modules_dir: None,
            modules: HashMap::new(),
        }
    }
}

/// Command line arguments relevant to configuration.
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub verbose: u8,
}

const ENV_PREFIX: &str = "USERDIR__";

const fn default_subdir() -> &'static str {
    ".userdir"
}

/// Provider stack: defaults → YAML file → module files → environment variables.
fn layered_figment(config_path: Option<&Path>, module_files: Option<serde_json::Value>) -> Figment {
    // Optional sections stay None unless YAML/ENV provide them.
    let base = AppConfig {
        client: ClientConfig::default(),
        logging: None,
        modules_dir: None,
        modules: HashMap::new(),
    };

    let mut figment = Figment::new().merge(Serialized::defaults(base));
    if let Some(path) = config_path {
        figment = figment.merge(Yaml::file(path));
    }
    if let Some(files) = module_files {
        figment = figment.merge(Serialized::default("modules", files));
    }
    // USERDIR__MODULES__USER_DIRECTORY__BASE_URL maps to modules.user_directory.base_url
    figment.merge(Env::prefixed(ENV_PREFIX).split("__"))
}

impl AppConfig {
    /// Load configuration with layered loading: defaults → YAML file → environment variables.
    /// Also normalizes `client.home_dir` into an absolute path and creates the directory.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref();
        Self::load(Some(path))
            .with_context(|| format!("Failed to load configuration from '{}'", path.display()))
    }

    /// Load configuration from file, or from defaults and environment variables alone.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => Self::load(None).context("Failed to load configuration from environment"),
        }
    }

    fn load(config_path: Option<&Path>) -> Result<Self> {
        let mut config: AppConfig = layered_figment(config_path, None).extract()?;

        // Module files sit below the environment layer, so the stack is
        // rebuilt once `modules_dir` is known.
        if let Some(dir) = config.modules_dir.clone() {
            let files = read_module_files(dir)?;
            if !files.is_empty() {
                let files = serde_json::Value::Object(files.into_iter().collect());
                config = layered_figment(config_path, Some(files)).extract()?;
            }
        }

        normalize_home_dir_inplace(&mut config.client)
            .context("Failed to resolve client.home_dir")?;
        Ok(config)
    }

    /// Serialize configuration to YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Deserialize one module's section; an absent section yields `T::default()`.
    pub fn module_config<T>(&self, module_name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        match self.modules.get(module_name) {
            None | Some(serde_json::Value::Null) => Ok(T::default()),
            Some(raw) => serde_json::from_value(raw.clone())
                .with_context(|| format!("Invalid configuration for module '{module_name}'")),
        }
    }

    /// Apply overrides from command line arguments.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(default_section) = logging.get_mut("default") {
            default_section.console_level = match args.verbose {
                0 => default_section.console_level.clone(), // keep
                1 => "debug".to_string(),
                _ => "trace".to_string(),
            };
        }
    }

    pub fn home_dir(&self) -> &Path {
        Path::new(&self.client.home_dir)
    }
}

fn normalize_home_dir_inplace(client: &mut ClientConfig) -> Result<()> {
    let opt = if client.home_dir.trim().is_empty() {
        None
    } else {
        Some(client.home_dir.clone())
    };

    let resolved: PathBuf = resolve_home_dir(opt, default_subdir(), true)?;

    client.home_dir = resolved.to_string_lossy().to_string();
    Ok(())
}

/// Read `<module>.yaml` / `<module>.yml` files from `dir`, keyed by file stem.
fn read_module_files(dir: impl AsRef<Path>) -> Result<HashMap<String, serde_json::Value>> {
    use std::fs;
    let dir = dir.as_ref();
    let mut files = HashMap::new();
    if !dir.exists() {
        return Ok(files);
    }
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();
        if ext != "yml" && ext != "yaml" {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read module config '{}'", path.display()))?;
        let val: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid YAML in '{}'", path.display()))?;
        files.insert(name.to_string(), serde_json::to_value(val)?);
    }
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::fs;
    use tempfile::tempdir;

    const BASE_URL_VAR: &str = "USERDIR__MODULES__USER_DIRECTORY__BASE_URL";

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        crate::ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Sets an environment variable and restores the previous value on drop.
    struct EnvVar {
        key: &'static str,
        previous: Option<std::ffi::OsString>,
    }

    impl EnvVar {
        fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
            let previous = std::env::var_os(key);
            std::env::set_var(key, value);
            Self { key, previous }
        }
    }

    impl Drop for EnvVar {
        fn drop(&mut self) {
            match self.previous.take() {
                Some(v) => std::env::set_var(self.key, v),
                None => std::env::remove_var(self.key),
            }
        }
    }

    fn is_normalized_path(p: &str) -> bool {
        let pb = PathBuf::from(p);
        pb.is_absolute() && !p.starts_with('~')
    }

    #[derive(Debug, Default, Deserialize, PartialEq)]
    #[serde(deny_unknown_fields)]
    struct DemoModule {
        #[serde(default)]
        base_url: String,
    }

    #[test]
    fn test_default_config_structure() {
        let config = AppConfig::default();

        assert_eq!(config.client.home_dir, "");

        let logging = config.logging.as_ref().unwrap();
        let default_section = &logging["default"];
        assert_eq!(default_section.console_level, "warn");
        assert_eq!(default_section.file, "logs/userdir.log");

        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_load_layered_reads_sections() {
        let _guard = env_lock();
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let home = tmp.path().join("home");

        let yaml = format!(
            r#"
client:
  home_dir: "{}"

logging:
  default:
    console_level: debug
    file: "logs/default.log"

modules:
  demo:
    base_url: "http://backend:8080"
"#,
            home.to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(is_normalized_path(&config.client.home_dir));
        assert!(home.is_dir());

        let def = &config.logging.as_ref().unwrap()["default"];
        assert_eq!(def.console_level, "debug");
        assert_eq!(def.file, "logs/default.log");

        let demo: DemoModule = config.module_config("demo").unwrap();
        assert_eq!(demo.base_url, "http://backend:8080");
    }

    #[test]
    fn test_minimal_yaml_leaves_optional_sections_empty() {
        let _guard = env_lock();
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = format!(
            "client:\n  home_dir: \"{}\"\n",
            tmp.path().join("h").to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        assert!(config.logging.is_none());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn test_unknown_top_level_key_is_rejected() {
        let _guard = env_lock();
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        fs::write(&cfg_path, "client: {}\nserver:\n  port: 1\n").unwrap();

        assert!(AppConfig::load_layered(&cfg_path).is_err());
    }

    #[test]
    fn test_module_config_absent_and_malformed() {
        let mut config = AppConfig::default();
        let absent: DemoModule = config.module_config("demo").unwrap();
        assert_eq!(absent, DemoModule::default());

        config
            .modules
            .insert("demo".into(), serde_json::json!({"bogus": true}));
        let err = config.module_config::<DemoModule>("demo").unwrap_err();
        assert!(err.to_string().contains("demo"));
    }

    #[test]
    fn test_cli_verbose_levels_matrix() {
        for (verbose_level, expected) in [(0, "warn"), (1, "debug"), (2, "trace"), (3, "trace")] {
            let mut config = AppConfig::default();
            let args = CliArgs {
                verbose: verbose_level,
            };

            config.apply_cli_overrides(&args);

            let logging = config.logging.as_ref().unwrap();
            assert_eq!(logging["default"].console_level, expected);
        }
    }

    #[test]
    fn test_cli_overrides_create_logging_when_missing() {
        let mut config = AppConfig {
            logging: None,
            ..AppConfig::default()
        };
        config.apply_cli_overrides(&CliArgs { verbose: 1 });
        assert_eq!(
            config.logging.as_ref().unwrap()["default"].console_level,
            "debug"
        );
    }

    #[test]
    fn test_layered_config_loading_with_modules_dir() {
        let _guard = env_lock();
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("modules_dir.yaml");
        let modules_dir = tmp.path().join("modules");

        fs::create_dir_all(&modules_dir).unwrap();
        fs::write(
            modules_dir.join("demo.yaml"),
            "base_url: \"http://from-file:9000\"\n",
        )
        .unwrap();
        fs::write(modules_dir.join("notes.txt"), "ignored").unwrap();

        let yaml = format!(
            r#"
client:
  home_dir: "{}"

modules_dir: "{}"

modules:
  existing_module:
    key: "value"
"#,
            tmp.path().join("h").to_string_lossy().replace('\\', "/"),
            modules_dir.to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();

        assert!(config.modules.contains_key("existing_module"));
        assert!(!config.modules.contains_key("notes"));
        let demo: DemoModule = config.module_config("demo").unwrap();
        assert_eq!(demo.base_url, "http://from-file:9000");
    }

    #[test]
    fn test_env_layer_overrides_yaml_module_section() {
        let _guard = env_lock();
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let yaml = format!(
            r#"
client:
  home_dir: "{}"

modules:
  user_directory:
    base_url: "http://from-yaml:8080"
"#,
            tmp.path().join("h").to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let _var = EnvVar::set(BASE_URL_VAR, "http://from-env:9000");
        let config = AppConfig::load_layered(&cfg_path).unwrap();

        let section: DemoModule = config.module_config("user_directory").unwrap();
        assert_eq!(section.base_url, "http://from-env:9000");
    }

    #[test]
    fn test_env_layer_applies_without_config_file() {
        let _guard = env_lock();
        let tmp = tempdir().unwrap();
        #[cfg(target_os = "windows")]
        let _home = EnvVar::set("APPDATA", tmp.path());
        #[cfg(not(target_os = "windows"))]
        let _home = EnvVar::set("HOME", tmp.path());
        let _var = EnvVar::set(BASE_URL_VAR, "http://from-env:9000");

        let config = AppConfig::load_or_default(None::<&str>).unwrap();

        assert!(is_normalized_path(&config.client.home_dir));
        assert!(config.client.home_dir.ends_with(default_subdir()));
        let section: DemoModule = config.module_config("user_directory").unwrap();
        assert_eq!(section.base_url, "http://from-env:9000");
    }

    #[test]
    fn test_env_layer_overrides_modules_dir_files() {
        let _guard = env_lock();
        let tmp = tempdir().unwrap();
        let cfg_path = tmp.path().join("cfg.yaml");
        let modules_dir = tmp.path().join("modules");
        fs::create_dir_all(&modules_dir).unwrap();
        fs::write(
            modules_dir.join("user_directory.yaml"),
            "base_url: \"http://from-file:9000\"\n",
        )
        .unwrap();
        let yaml = format!(
            "client:\n  home_dir: \"{}\"\nmodules_dir: \"{}\"\n",
            tmp.path().join("h").to_string_lossy().replace('\\', "/"),
            modules_dir.to_string_lossy().replace('\\', "/")
        );
        fs::write(&cfg_path, yaml).unwrap();

        let config = AppConfig::load_layered(&cfg_path).unwrap();
        let section: DemoModule = config.module_config("user_directory").unwrap();
        assert_eq!(section.base_url, "http://from-file:9000");

        let _var = EnvVar::set(BASE_URL_VAR, "http://from-env:7000");
        let config = AppConfig::load_layered(&cfg_path).unwrap();
        let section: DemoModule = config.module_config("user_directory").unwrap();
        assert_eq!(section.base_url, "http://from-env:7000");
    }

    #[test]
    fn test_to_yaml_roundtrip_basic() {
        let config = AppConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("client:"));
        assert!(yaml.contains("logging:"));

        let roundtrip: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(roundtrip.client.home_dir, config.client.home_dir);
    }
}

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::paths::home_dir::resolve_home_dir;

/// Environment prefix; `USERMGMT__SERVER__PORT=9000` sets `server.port`.
pub const ENV_PREFIX: &str = "USERMGMT__";

/// DSN used by `--mock`.
pub const MEMORY_DSN: &str = "sqlite::memory:";

const DEFAULT_HOME_SUBDIR: &str = ".usermgmt";
const DEFAULT_SECTION: &str = "default";

/// Server configuration: typed global sections plus a per-module bag.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Absent means the server refuses to start (no storage).
    pub database: Option<DatabaseConfig>,
    /// Absent means plain console logging.
    pub logging: Option<LoggingConfig>,
    /// Directory of `<module>.yaml` files merged into `modules`.
    #[serde(default)]
    pub modules_dir: Option<String>,
    /// module name → raw config value, decoded by [`AppConfig::module_config`].
    #[serde(default)]
    pub modules: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Absolute after loading; empty selects `$HOME/.usermgmt`.
    pub home_dir: String,
    pub host: String,
    pub port: u16,
    /// Per-request handler timeout; 0 keeps the ingress default.
    pub timeout_sec: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            home_dir: String::new(),
            host: "127.0.0.1".to_string(),
            port: 8087,
            timeout_sec: 0,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// `sqlite://<path>` (relative to home_dir) or `sqlite::memory:`.
    pub url: String,
    #[serde(default)]
    pub max_conns: Option<u32>,
    #[serde(default)]
    pub busy_timeout_ms: Option<u32>,
}

/// Section name → sink settings. `default` covers targets no other section claims.
pub type LoggingConfig = HashMap<String, Section>;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Section {
    /// trace | debug | info | warn | error | off
    pub console_level: String,
    /// Empty disables the file sink.
    #[serde(default)]
    pub file: String,
    #[serde(default)]
    pub file_level: String,
    #[serde(default)]
    pub max_backups: Option<usize>,
    #[serde(default)]
    pub max_size_mb: Option<u64>,
}

pub fn default_logging_config() -> LoggingConfig {
    HashMap::from([(
        DEFAULT_SECTION.to_string(),
        Section {
            console_level: "info".to_string(),
            file: "logs/usermgmt.log".to_string(),
            file_level: "debug".to_string(),
            max_backups: Some(3),
            max_size_mb: Some(100),
        },
    )])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: Some(DatabaseConfig {
                url: "sqlite://database/users.db".to_string(),
                max_conns: Some(10),
                busy_timeout_ms: Some(5000),
            }),
            logging: Some(default_logging_config()),
            ..Self::bare()
        }
    }
}

impl AppConfig {
    /// Only the server section; optional sections stay unset.
    fn bare() -> Self {
        Self {
            server: ServerConfig::default(),
            database: None,
            logging: None,
            modules_dir: None,
            modules: HashMap::new(),
        }
    }

    /// Defaults, then the YAML file, then `USERMGMT__*` environment variables.
    ///
    /// `server.home_dir` comes back absolute and created. Files from
    /// `modules_dir` override inline `modules` entries of the same name.
    pub fn load_layered<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        use figment::{
            providers::{Env, Format, Serialized, Yaml},
            Figment,
        };

        let path = config_path.as_ref();
        let mut config: AppConfig = Figment::new()
            .merge(Serialized::defaults(Self::bare()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        config.normalize_home_dir()?;
        if let Some(dir) = config.modules_dir.clone() {
            merge_module_files(&mut config.modules, Path::new(&dir))?;
        }
        Ok(config)
    }

    /// [`AppConfig::load_layered`] when a path is given, otherwise built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_layered(path),
            None => {
                let mut config = Self::default();
                config.normalize_home_dir()?;
                Ok(config)
            }
        }
    }

    fn normalize_home_dir(&mut self) -> Result<()> {
        let configured = Some(self.server.home_dir.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_owned);
        let resolved: PathBuf = resolve_home_dir(configured, DEFAULT_HOME_SUBDIR, true)
            .context("Failed to resolve server.home_dir")?;
        self.server.home_dir = resolved.to_string_lossy().into_owned();
        Ok(())
    }

    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).context("Failed to serialize config to YAML")
    }

    /// Typed config of one module; a module without an entry gets `T::default()`.
    pub fn module_config<T>(&self, module_name: &str) -> Result<T>
    where
        T: DeserializeOwned + Default,
    {
        self.modules
            .get(module_name)
            .map(|raw| serde_json::from_value(raw.clone()))
            .transpose()
            .with_context(|| format!("Invalid configuration for module '{module_name}'"))
            .map(Option::unwrap_or_default)
    }

    /// `--port` replaces the port, `--mock` swaps in an in-memory database and
    /// each `-v` raises the default console level (debug, then trace).
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if args.mock {
            self.database
                .get_or_insert_with(DatabaseConfig::default)
                .url = MEMORY_DSN.to_string();
        }

        let level = match args.verbose {
            0 => return,
            1 => "debug",
            _ => "trace",
        };
        let logging = self.logging.get_or_insert_with(default_logging_config);
        if let Some(section) = logging.get_mut(DEFAULT_SECTION) {
            section.console_level = level.to_string();
        }
    }
}

/// Command line arguments that feed [`AppConfig::apply_cli_overrides`].
#[derive(Debug, Clone, Default)]
pub struct CliArgs {
    pub config: Option<String>,
    pub port: Option<u16>,
    pub print_config: bool,
    pub verbose: u8,
    pub mock: bool,
}

/// `<name>.yaml` / `<name>.yml` → module name.
fn module_file_name(path: &Path) -> Option<String> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    if !(ext == "yaml" || ext == "yml") || !path.is_file() {
        return None;
    }
    path.file_stem()?.to_str().map(str::to_owned)
}

fn merge_module_files(bag: &mut HashMap<String, serde_json::Value>, dir: &Path) -> Result<()> {
    if !dir.exists() {
        return Ok(());
    }
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to list modules_dir {}", dir.display()))?;

    for entry in entries {
        let path = entry?.path();
        let Some(name) = module_file_name(&path) else {
            continue;
        };
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read module config {}", path.display()))?;
        let value: serde_yaml::Value = serde_yaml::from_str(&raw)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?;
        bag.insert(name, serde_json::to_value(value)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::{tempdir, TempDir};

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct SampleModule {
        #[serde(default)]
        enabled: bool,
        #[serde(default)]
        capacity: Option<usize>,
    }

    /// Writes `body` below a `server.home_dir` pointing into the temp dir.
    fn config_file(tmp: &TempDir, body: &str) -> PathBuf {
        let path = tmp.path().join("usermgmt.yaml");
        let home = tmp.path().join("home").to_string_lossy().replace('\\', "/");
        fs::write(&path, format!("server:\n  home_dir: \"{home}\"\n{body}")).unwrap();
        path
    }

    #[test]
    fn defaults_describe_a_local_sqlite_server() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 8087);
        assert!(config.server.home_dir.is_empty());

        let db = config.database.unwrap();
        assert_eq!(db.url, "sqlite://database/users.db");
        assert_eq!(db.busy_timeout_ms, Some(5000));
        assert_eq!(config.logging.unwrap()["default"].file, "logs/usermgmt.log");
    }

    #[test]
    fn yaml_fills_sections_and_home_dir_is_created() {
        let tmp = tempdir().unwrap();
        let path = config_file(
            &tmp,
            r#"  port: 9090
  timeout_sec: 15
database:
  url: "sqlite::memory:"
  max_conns: 1
logging:
  default:
    console_level: debug
"#,
        );

        let config = AppConfig::load_layered(&path).unwrap();
        assert!(Path::new(&config.server.home_dir).is_absolute());
        assert!(tmp.path().join("home").is_dir());
        assert_eq!(config.server.port, 9090);
        // not in the file, so from defaults
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.timeout_sec, 15);

        let db = config.database.unwrap();
        assert_eq!(db.url, MEMORY_DSN);
        assert_eq!(db.max_conns, Some(1));
        assert_eq!(db.busy_timeout_ms, None);

        let default = &config.logging.unwrap()["default"];
        assert_eq!(default.console_level, "debug");
        assert!(default.file.is_empty());
    }

    #[test]
    fn optional_sections_stay_empty_when_absent() {
        let tmp = tempdir().unwrap();
        let config = AppConfig::load_layered(config_file(&tmp, "")).unwrap();
        assert!(config.database.is_none());
        assert!(config.logging.is_none());
        assert!(config.modules.is_empty());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let tmp = tempdir().unwrap();
        let path = config_file(&tmp, "  prot: 1\n");
        let err = AppConfig::load_layered(&path).unwrap_err();
        assert!(format!("{err:#}").contains("prot"));
    }

    #[test]
    fn cli_overrides_port_database_and_verbosity() {
        let mut config = AppConfig::default();
        config.apply_cli_overrides(&CliArgs {
            port: Some(3000),
            verbose: 1,
            mock: true,
            ..Default::default()
        });

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.as_ref().unwrap().url, MEMORY_DSN);
        // pool settings survive the mock swap
        assert_eq!(config.database.unwrap().max_conns, Some(10));
        assert_eq!(config.logging.unwrap()["default"].console_level, "debug");
    }

    #[test]
    fn mock_creates_database_section_when_missing() {
        let mut config = AppConfig::bare();
        config.apply_cli_overrides(&CliArgs {
            mock: true,
            ..Default::default()
        });
        assert_eq!(config.database.unwrap().url, MEMORY_DSN);
        assert!(config.logging.is_none());
    }

    #[test]
    fn verbosity_levels() {
        for (verbose, expected) in [(0, "info"), (1, "debug"), (2, "trace"), (5, "trace")] {
            let mut config = AppConfig::default();
            config.apply_cli_overrides(&CliArgs {
                verbose,
                ..Default::default()
            });
            assert_eq!(config.logging.unwrap()["default"].console_level, expected);
        }
    }

    #[test]
    fn modules_dir_files_override_inline_entries() {
        let tmp = tempdir().unwrap();
        let dir = tmp.path().join("modules");
        fs::create_dir_all(&dir).unwrap();
        fs::write(
            dir.join("user_management.yaml"),
            "seed_sample_users: false\nactivity_log_capacity: 500\n",
        )
        .unwrap();
        fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let body = format!(
            "modules_dir: \"{}\"\nmodules:\n  user_management:\n    seed_sample_users: true\n  api_ingress:\n    enable_docs: true\n",
            dir.to_string_lossy().replace('\\', "/")
        );
        let config = AppConfig::load_layered(config_file(&tmp, &body)).unwrap();

        assert_eq!(config.modules.len(), 2);
        assert_eq!(config.modules["api_ingress"]["enable_docs"], true);
        let um = &config.modules["user_management"];
        assert_eq!(um["seed_sample_users"], false);
        assert_eq!(um["activity_log_capacity"], 500);
    }

    #[test]
    fn module_config_is_typed_and_defaulted() {
        let mut config = AppConfig::default();
        config.modules.insert(
            "sample".into(),
            serde_json::json!({"enabled": true, "capacity": 5}),
        );
        config
            .modules
            .insert("broken".into(), serde_json::json!({"enabled": "yes"}));

        let sample: SampleModule = config.module_config("sample").unwrap();
        assert_eq!(
            sample,
            SampleModule {
                enabled: true,
                capacity: Some(5)
            }
        );
        assert_eq!(
            config.module_config::<SampleModule>("absent").unwrap(),
            SampleModule::default()
        );

        let err = config.module_config::<SampleModule>("broken").unwrap_err();
        assert!(err.to_string().contains("'broken'"));
    }

    #[test]
    fn yaml_dump_parses_back() {
        let yaml = AppConfig::default().to_yaml().unwrap();
        assert!(yaml.contains("database:"));
        let parsed: AppConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed.server.port, 8087);
        assert!(parsed.logging.unwrap().contains_key("default"));
    }

    #[test]
    fn module_file_name_filters_extensions() {
        let tmp = tempdir().unwrap();
        let yml = tmp.path().join("api_ingress.YML");
        fs::write(&yml, "{}").unwrap();
        assert_eq!(module_file_name(&yml).as_deref(), Some("api_ingress"));
        assert_eq!(module_file_name(&tmp.path().join("missing.yaml")), None);
        assert_eq!(module_file_name(&tmp.path().join("x.json")), None);
    }
}

//! Test configuration composition.
//!
//! A [`ConfigurationBuilder`] keeps an ordered list of sources where later
//! sources override earlier ones. Tests replace the application's settings
//! files with their own, pin single values, or lower the log level, while
//! command line arguments and environment variables keep their usual
//! precedence over files.

use crate::error::ConfigurationError;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, Level};

/// Configuration key holding the default log level.
pub const DEFAULT_LOG_LEVEL_KEY: &str = "Logging:LogLevel:Default";

/// Separator between the segments of a hierarchical key.
pub const KEY_DELIMITER: &str = ":";

/// One provider of configuration values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// A JSON or YAML settings file.
    File { path: PathBuf, optional: bool },
    /// Process environment variables, `__` standing for the key delimiter.
    EnvironmentVariables { prefix: Option<String> },
    /// Command line arguments.
    CommandLine { args: Vec<String> },
    /// Values set in code.
    Memory { values: Vec<(String, String)> },
}

impl ConfigSource {
    fn kind(&self) -> &'static str {
        match self {
            ConfigSource::File { .. } => "file",
            ConfigSource::EnvironmentVariables { .. } => "environment",
            ConfigSource::CommandLine { .. } => "command_line",
            ConfigSource::Memory { .. } => "memory",
        }
    }

    fn load(&self, into: &mut BTreeMap<String, String>) -> Result<(), ConfigurationError> {
        match self {
            ConfigSource::File { path, optional } => {
                if !path.exists() {
                    if *optional {
                        return Ok(());
                    }
                    return Err(ConfigurationError::MissingFile(path.clone()));
                }
                let value = read_settings_file(path)?;
                flatten(&value, String::new(), into);
            }
            ConfigSource::EnvironmentVariables { prefix } => {
                for (name, value) in std::env::vars_os() {
                    // Keys that are not UTF-8 cannot be addressed by a configuration key.
                    let Some(name) = name.to_str() else {
                        continue;
                    };
                    if let Some(key) = strip_env_prefix(name, prefix.as_deref()) {
                        into.insert(
                            normalize_key(&key.replace("__", KEY_DELIMITER)),
                            value.to_string_lossy().into_owned(),
                        );
                    }
                }
            }
            ConfigSource::CommandLine { args } => {
                for (key, value) in parse_command_line(args) {
                    into.insert(normalize_key(&key), value);
                }
            }
            ConfigSource::Memory { values } => {
                for (key, value) in values {
                    into.insert(normalize_key(key), value.clone());
                }
            }
        }
        Ok(())
    }
}

/// Where the test settings files live.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestConfigOptions {
    /// Directory of the test settings files. Relative paths are resolved
    /// against the current directory.
    pub app_settings_dir: PathBuf,
}

impl TestConfigOptions {
    pub fn new(app_settings_dir: impl Into<PathBuf>) -> Self {
        Self {
            app_settings_dir: app_settings_dir.into(),
        }
    }

    pub fn is_relative(&self) -> bool {
        self.app_settings_dir.is_relative()
    }

    fn resolve_dir(&self) -> Result<PathBuf, ConfigurationError> {
        if !self.is_relative() {
            return Ok(self.app_settings_dir.clone());
        }
        let cwd = std::env::current_dir().map_err(|e| ConfigurationError::Read {
            path: PathBuf::from("."),
            reason: e.to_string(),
        })?;
        Ok(cwd.join(&self.app_settings_dir))
    }
}

/// Ordered list of configuration sources.
#[derive(Debug, Clone, Default)]
pub struct ConfigurationBuilder {
    sources: Vec<ConfigSource>,
}

impl ConfigurationBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sources in load order.
    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn add(&mut self, source: ConfigSource) -> &mut Self {
        self.sources.push(source);
        self
    }

    pub fn add_file(&mut self, path: impl Into<PathBuf>, optional: bool) -> &mut Self {
        self.add(ConfigSource::File {
            path: path.into(),
            optional,
        })
    }

    pub fn add_environment_variables(&mut self, prefix: Option<&str>) -> &mut Self {
        self.add(ConfigSource::EnvironmentVariables {
            prefix: prefix.map(str::to_string),
        })
    }

    pub fn add_command_line<I, S>(&mut self, args: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add(ConfigSource::CommandLine {
            args: args.into_iter().map(Into::into).collect(),
        })
    }

    /// Replace every settings file with the given test files.
    ///
    /// Files are required and load in the order given; a missing one is
    /// reported here, before any source is touched. Environment and
    /// command line sources are moved after them, so the final precedence
    /// is command line, then environment, then the test files.
    pub fn add_test_app_settings(
        &mut self,
        options: &TestConfigOptions,
        app_settings_file: &str,
        other_app_settings_files: &[&str],
    ) -> Result<&mut Self, ConfigurationError> {
        if app_settings_file.trim().is_empty() {
            return Err(ConfigurationError::BlankArgument("app settings file name"));
        }
        if other_app_settings_files.iter().any(|f| f.trim().is_empty()) {
            return Err(ConfigurationError::BlankArgument(
                "other app settings file names",
            ));
        }

        let dir = options.resolve_dir()?;
        let files = std::iter::once(&app_settings_file)
            .chain(other_app_settings_files)
            .map(|file| dir.join(file))
            .collect::<Vec<_>>();
        if let Some(missing) = files.iter().find(|path| !path.is_file()) {
            return Err(ConfigurationError::MissingFile(missing.clone()));
        }

        self.sources
            .retain(|s| !matches!(s, ConfigSource::File { .. }));
        self.sources.extend(files.into_iter().map(|path| ConfigSource::File {
            path,
            optional: false,
        }));

        let (environment, rest): (Vec<_>, Vec<_>) = std::mem::take(&mut self.sources)
            .into_iter()
            .partition(|s| matches!(s, ConfigSource::EnvironmentVariables { .. }));
        let (command_line, rest): (Vec<_>, Vec<_>) = rest
            .into_iter()
            .partition(|s| matches!(s, ConfigSource::CommandLine { .. }));
        self.sources = rest;
        self.sources.extend(environment);
        self.sources.extend(command_line);

        debug!(
            dir = %dir.display(),
            files = 1 + other_app_settings_files.len(),
            sources = self.sources.len(),
            "Test app settings added"
        );
        Ok(self)
    }

    /// Pin one configuration value.
    pub fn use_configuration_value(
        &mut self,
        key: &str,
        value: &str,
    ) -> Result<&mut Self, ConfigurationError> {
        if key.trim().is_empty() {
            return Err(ConfigurationError::BlankArgument("configuration key"));
        }
        if value.is_empty() {
            return Err(ConfigurationError::EmptyArgument("configuration value"));
        }
        Ok(self.add(ConfigSource::Memory {
            values: vec![(key.to_string(), value.to_string())],
        }))
    }

    /// Set `Logging:LogLevel:Default`.
    ///
    /// Accepts a [`LogLevel`] or a `tracing::Level`.
    pub fn use_default_log_level(&mut self, level: impl Into<LogLevel>) -> &mut Self {
        self.add(ConfigSource::Memory {
            values: vec![(
                DEFAULT_LOG_LEVEL_KEY.to_string(),
                level.into().as_str().to_string(),
            )],
        })
    }

    /// Load every source in order.
    pub fn build(&self) -> Result<Configuration, ConfigurationError> {
        let mut values = BTreeMap::new();
        for source in &self.sources {
            debug!(kind = source.kind(), "Loading configuration source");
            source.load(&mut values)?;
        }
        Ok(Configuration { values })
    }
}

/// Flattened configuration values with case-insensitive keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Configuration {
    values: BTreeMap<String, String>,
}

impl Configuration {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(&normalize_key(key))
    }

    /// Values under `section`, keyed relative to it.
    pub fn section(&self, section: &str) -> BTreeMap<String, String> {
        let prefix = format!("{}{}", normalize_key(section), KEY_DELIMITER);
        self.values
            .iter()
            .filter_map(|(k, v)| k.strip_prefix(&prefix).map(|rest| (rest.to_string(), v.clone())))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Log level as written to settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Trace,
    Debug,
    Information,
    Warning,
    Error,
    Critical,
    /// Logging disabled
    None,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "Trace",
            LogLevel::Debug => "Debug",
            LogLevel::Information => "Information",
            LogLevel::Warning => "Warning",
            LogLevel::Error => "Error",
            LogLevel::Critical => "Critical",
            LogLevel::None => "None",
        }
    }

    /// Parse a settings name (`Warning`) or a tracing name (`warn`), ignoring case.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(LogLevel::Trace),
            "debug" => Some(LogLevel::Debug),
            "info" | "information" => Some(LogLevel::Information),
            "warn" | "warning" => Some(LogLevel::Warning),
            "error" => Some(LogLevel::Error),
            "critical" => Some(LogLevel::Critical),
            "none" => Some(LogLevel::None),
            _ => None,
        }
    }

    /// Closest tracing level. `Critical` maps to `ERROR`; `None` has no level.
    pub fn to_tracing(self) -> Option<Level> {
        match self {
            LogLevel::Trace => Some(Level::TRACE),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Information => Some(Level::INFO),
            LogLevel::Warning => Some(Level::WARN),
            LogLevel::Error | LogLevel::Critical => Some(Level::ERROR),
            LogLevel::None => None,
        }
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => LogLevel::Trace,
            Level::DEBUG => LogLevel::Debug,
            Level::INFO => LogLevel::Information,
            Level::WARN => LogLevel::Warning,
            _ => LogLevel::Error,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_key(key: &str) -> String {
    key.to_ascii_lowercase()
}

fn strip_env_prefix<'a>(name: &'a str, prefix: Option<&str>) -> Option<&'a str> {
    match prefix {
        None => Some(name),
        Some(prefix) => {
            let head = name.get(..prefix.len())?;
            head.eq_ignore_ascii_case(prefix).then(|| &name[prefix.len()..])
        }
    }
}

fn read_settings_file(path: &Path) -> Result<Value, ConfigurationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigurationError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let parse_error = |reason: String| ConfigurationError::Parse {
        path: path.to_path_buf(),
        reason,
    };

    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
        }
        _ => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
    }
}

fn flatten(value: &Value, prefix: String, into: &mut BTreeMap<String, String>) {
    let child = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}{}", prefix, KEY_DELIMITER, key)
        }
    };

    match value {
        Value::Object(map) => {
            for (key, value) in map {
                flatten(value, child(key), into);
            }
        }
        Value::Array(items) => {
            for (index, value) in items.iter().enumerate() {
                flatten(value, child(&index.to_string()), into);
            }
        }
        Value::Null => {
            if !prefix.is_empty() {
                into.insert(normalize_key(&prefix), String::new());
            }
        }
        Value::String(s) => {
            into.insert(normalize_key(&prefix), s.clone());
        }
        other => {
            into.insert(normalize_key(&prefix), other.to_string());
        }
    }
}

/// Accepts `--key=value`, `--key value`, `/key=value`, `/key value` and
/// `key=value`. Anything else is skipped.
fn parse_command_line(args: &[String]) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    let mut args = args.iter();

    while let Some(arg) = args.next() {
        let (stripped, prefixed) = match arg.strip_prefix("--").or_else(|| arg.strip_prefix('/')) {
            Some(rest) => (rest, true),
            None => (arg.as_str(), false),
        };

        if let Some((key, value)) = stripped.split_once('=') {
            if !key.is_empty() {
                pairs.push((key.to_string(), value.to_string()));
            }
        } else if prefixed && !stripped.is_empty() {
            match args.next() {
                Some(value) => pairs.push((stripped.to_string(), value.clone())),
                None => debug!(argument = %arg, "Command line switch has no value"),
            }
        }
    }

    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;
    use tokio_test::assert_ok;

    fn settings_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for (name, content) in files {
            fs::write(dir.path().join(name), content).unwrap();
        }
        dir
    }

    #[test]
    fn test_add_test_app_settings_orders_sources() {
        let dir = settings_dir(&[
            ("appsettings.test.json", "{}"),
            ("appsettings.extra.json", "{}"),
        ]);
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_environment_variables(None)
            .add_command_line(["--urls=http://+:80"])
            .add_file("appsettings.json", true)
            .use_configuration_value("Feature:Enabled", "true")
            .unwrap();

        builder
            .add_test_app_settings(
                &TestConfigOptions::new(dir.path()),
                "appsettings.test.json",
                &["appsettings.extra.json"],
            )
            .unwrap();

        let kinds: Vec<_> = builder.sources().iter().map(ConfigSource::kind).collect();
        assert_eq!(
            kinds,
            vec!["memory", "file", "file", "environment", "command_line"]
        );
        assert_eq!(
            builder.sources()[1],
            ConfigSource::File {
                path: dir.path().join("appsettings.test.json"),
                optional: false,
            }
        );
        assert_eq!(
            builder.sources()[2],
            ConfigSource::File {
                path: dir.path().join("appsettings.extra.json"),
                optional: false,
            }
        );
    }

    #[test]
    fn test_blank_file_names_rejected() {
        let options = TestConfigOptions::default();
        let mut builder = ConfigurationBuilder::new();
        assert_eq!(
            builder
                .add_test_app_settings(&options, "  ", &[])
                .unwrap_err(),
            ConfigurationError::BlankArgument("app settings file name")
        );
        assert_eq!(
            builder
                .add_test_app_settings(&options, "appsettings.json", &["ok.json", ""])
                .unwrap_err(),
            ConfigurationError::BlankArgument("other app settings file names")
        );
        assert!(builder.sources().is_empty());
    }

    #[test]
    fn test_relative_dir_resolves_against_current_dir() {
        let cwd = std::env::current_dir().unwrap();
        let dir = tempfile::tempdir_in(&cwd).unwrap();
        fs::write(dir.path().join("appsettings.json"), "{}").unwrap();
        let relative = dir.path().strip_prefix(&cwd).unwrap();

        let options = TestConfigOptions::new(relative);
        assert!(options.is_relative());
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_test_app_settings(&options, "appsettings.json", &[])
            .unwrap();

        assert_eq!(
            builder.sources(),
            &[ConfigSource::File {
                path: cwd.join(relative).join("appsettings.json"),
                optional: false,
            }]
        );
    }

    #[test]
    fn test_missing_test_file_is_fatal() {
        let dir = settings_dir(&[("appsettings.json", "{}")]);
        let mut builder = ConfigurationBuilder::new();
        builder.add_file("appsettings.Production.json", true);

        let err = builder
            .add_test_app_settings(
                &TestConfigOptions::new(dir.path()),
                "appsettings.json",
                &["missing.json"],
            )
            .unwrap_err();

        assert_eq!(
            err,
            ConfigurationError::MissingFile(dir.path().join("missing.json"))
        );
        assert_eq!(
            builder.sources(),
            &[ConfigSource::File {
                path: PathBuf::from("appsettings.Production.json"),
                optional: true,
            }]
        );
    }

    #[test]
    fn test_required_file_deleted_before_build() {
        let dir = settings_dir(&[("appsettings.json", "{}")]);
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_test_app_settings(&TestConfigOptions::new(dir.path()), "appsettings.json", &[])
            .unwrap();
        fs::remove_file(dir.path().join("appsettings.json")).unwrap();

        assert_eq!(
            builder.build().unwrap_err(),
            ConfigurationError::MissingFile(dir.path().join("appsettings.json"))
        );
    }

    #[test]
    fn test_precedence_command_line_then_env_then_files() {
        let dir = settings_dir(&[
            (
                "appsettings.json",
                r#"{"Service": {"Name": "file1", "Region": "eu", "Mode": "file1"}, "Only1": "a"}"#,
            ),
            (
                "appsettings.Default.yaml",
                "Service:\n  Name: file2\n  Mode: file2\nOnly2: b\n",
            ),
        ]);
        std::env::set_var("ZTKPRECEDENCE_Service__Name", "env");
        std::env::set_var("ZTKPRECEDENCE_Service__Mode", "env");

        let mut builder = ConfigurationBuilder::new();
        builder
            .add_file(dir.path().join("ignored.json"), false)
            .add_environment_variables(Some("ZTKPRECEDENCE_"))
            .add_command_line(["--Service:Name=cli"]);
        builder
            .add_test_app_settings(
                &TestConfigOptions::new(dir.path()),
                "appsettings.json",
                &["appsettings.Default.yaml"],
            )
            .unwrap();

        let config = assert_ok!(builder.build());
        assert_eq!(config.get("Service:Name"), Some("cli"));
        assert_eq!(config.get("service:mode"), Some("env"));
        assert_eq!(config.get("Service:Region"), Some("eu"));
        assert_eq!(config.get("Only1"), Some("a"));
        assert_eq!(config.get("Only2"), Some("b"));

        std::env::remove_var("ZTKPRECEDENCE_Service__Name");
        std::env::remove_var("ZTKPRECEDENCE_Service__Mode");
    }

    #[test]
    fn test_later_test_file_overrides_earlier() {
        let dir = settings_dir(&[
            ("appsettings.json", r#"{"Logging": {"LogLevel": {"Default": "Warning"}}}"#),
            ("appsettings.Default.json", r#"{"Logging": {"LogLevel": {"Default": "Debug"}}}"#),
        ]);
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_test_app_settings(
                &TestConfigOptions::new(dir.path()),
                "appsettings.json",
                &["appsettings.Default.json"],
            )
            .unwrap();

        let config = builder.build().unwrap();
        assert_eq!(config.get(DEFAULT_LOG_LEVEL_KEY), Some("Debug"));
    }

    #[test]
    fn test_use_configuration_value() {
        let mut builder = ConfigurationBuilder::new();
        builder
            .add_command_line(["Feature:Enabled=false"])
            .use_configuration_value("Feature:Enabled", "true")
            .unwrap();

        assert_eq!(
            builder.build().unwrap().get("feature:enabled"),
            Some("true")
        );
        assert_eq!(
            builder.use_configuration_value("", "x").unwrap_err(),
            ConfigurationError::BlankArgument("configuration key")
        );
        assert_eq!(
            builder.use_configuration_value("k", "").unwrap_err(),
            ConfigurationError::EmptyArgument("configuration value")
        );
    }

    #[test]
    fn test_white_space_value_is_kept() {
        let mut builder = ConfigurationBuilder::new();
        builder.use_configuration_value("Greeting:Separator", " ").unwrap();
        assert_eq!(
            builder.build().unwrap().get("Greeting:Separator"),
            Some(" ")
        );
    }

    #[test]
    fn test_use_default_log_level() {
        let mut builder = ConfigurationBuilder::new();
        builder.use_default_log_level(Level::WARN);
        let config = builder.build().unwrap();
        assert_eq!(config.get("Logging:LogLevel:Default"), Some("Warning"));
    }

    #[test]
    fn test_use_default_log_level_beyond_tracing_levels() {
        for (level, stored) in [(LogLevel::Critical, "Critical"), (LogLevel::None, "None")] {
            let mut builder = ConfigurationBuilder::new();
            builder.use_default_log_level(level);
            let config = builder.build().unwrap();
            assert_eq!(config.get(DEFAULT_LOG_LEVEL_KEY), Some(stored));
            assert_eq!(LogLevel::parse(stored), Some(level));
        }
        assert_eq!(LogLevel::from(Level::ERROR).to_string(), "Error");
        assert_eq!(LogLevel::Critical.to_tracing(), Some(Level::ERROR));
        assert_eq!(LogLevel::None.to_tracing(), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_non_utf8_environment_does_not_break_build() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        std::env::set_var("ZTKNONUTF8_VALUE", OsStr::from_bytes(b"\xff\xfe"));
        std::env::set_var(OsStr::from_bytes(b"ZTKNONUTF8_\xff"), "x");
        std::env::set_var("ZTKNONUTF8_Plain", "ok");

        let mut builder = ConfigurationBuilder::new();
        builder.add_environment_variables(Some("ZTKNONUTF8_"));
        let result = builder.build();

        std::env::remove_var("ZTKNONUTF8_VALUE");
        std::env::remove_var(OsStr::from_bytes(b"ZTKNONUTF8_\xff"));
        std::env::remove_var("ZTKNONUTF8_Plain");

        let config = assert_ok!(result);
        assert_eq!(config.get("Plain"), Some("ok"));
        assert_eq!(config.get("VALUE"), Some("\u{FFFD}\u{FFFD}"));

        let mut unprefixed = ConfigurationBuilder::new();
        unprefixed.add_environment_variables(Some("APP_"));
        std::env::set_var("ZTKNONUTF8_OTHER", OsStr::from_bytes(b"\xff"));
        let result = unprefixed.build();
        std::env::remove_var("ZTKNONUTF8_OTHER");
        assert_ok!(result);
    }

    #[test]
    fn test_flatten_arrays_and_scalars() {
        let dir = settings_dir(&[(
            "appsettings.json",
            r#"{"Hosts": ["a", "b"], "Port": 8080, "Tls": false, "Proxy": null}"#,
        )]);
        let mut builder = ConfigurationBuilder::new();
        builder.add_file(dir.path().join("appsettings.json"), false);

        let config = builder.build().unwrap();
        assert_eq!(config.get("Hosts:0"), Some("a"));
        assert_eq!(config.get("Hosts:1"), Some("b"));
        assert_eq!(config.get("Port"), Some("8080"));
        assert_eq!(config.get("Tls"), Some("false"));
        assert_eq!(config.get("Proxy"), Some(""));
        assert_eq!(config.section("hosts").len(), 2);
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = settings_dir(&[("appsettings.json", "{ not json")]);
        let mut builder = ConfigurationBuilder::new();
        builder.add_file(dir.path().join("appsettings.json"), false);
        assert!(matches!(
            builder.build().unwrap_err(),
            ConfigurationError::Parse { .. }
        ));
    }

    #[test]
    fn test_command_line_forms() {
        let args: Vec<String> = [
            "--a=1",
            "--b",
            "2",
            "/c=3",
            "/d",
            "4",
            "e=5",
            "stray",
            "--dangling",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let pairs = parse_command_line(&args);
        assert_eq!(
            pairs,
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "2".to_string()),
                ("c".to_string(), "3".to_string()),
                ("d".to_string(), "4".to_string()),
                ("e".to_string(), "5".to_string()),
            ]
        );
    }

    #[test]
    fn test_env_prefix_is_case_insensitive() {
        assert_eq!(strip_env_prefix("APP_Key", Some("app_")), Some("Key"));
        assert_eq!(strip_env_prefix("OTHER", Some("app_")), None);
        assert_eq!(strip_env_prefix("AP", Some("app_")), None);
        assert_eq!(strip_env_prefix("Key", None), Some("Key"));
    }
}

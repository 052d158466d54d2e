use crate::command::{CommandError, CommandSpec};
use crate::metrics::MetricsSource;
use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub const EXEC_DIR_VAR: &str = "PIPELINE_EXEC_DIR";
pub const STDOUT_PATH_VAR: &str = "PIPELINE_STDOUT_PATH";
pub const STDERR_PATH_VAR: &str = "PIPELINE_STDERR_PATH";
pub const TEST_PATH_VAR: &str = "MODEL_TEST_PATH";
pub const EXEC_FILE_VAR: &str = "PIPELINE_EXEC_FILE";
pub const SCRIPT_LAUNCHER_VAR: &str = "PIPELINE_SCRIPT_LAUNCHER";
pub const TEST_COMMAND_VAR: &str = "PIPELINE_TEST_COMMAND";
pub const METRICS_PATH_VAR: &str = "PIPELINE_METRICS_PATH";
pub const RUNTIME_ENVIRONMENT_VAR: &str = "PIPELINE_RUNTIME_ENVIRONMENT";
pub const INSTALL_COMMAND_VAR: &str = "PIPELINE_INSTALL_COMMAND";
pub const DEBUG_VAR: &str = "PIPELINE_DEBUG";

/// Value of `PIPELINE_METRICS_PATH` that selects captured stdout.
pub const METRICS_FROM_STDOUT: &str = "-";

const DEFAULT_EXEC_DIR: &str = ".";
const DEFAULT_STDOUT_PATH: &str = "script.stdout";
const DEFAULT_STDERR_PATH: &str = "script.stderr";
const DEFAULT_TEST_PATH: &str = "src/test.py";
const DEFAULT_SCRIPT_LAUNCHER: &str = "pipenv run python3";
const DEFAULT_TEST_COMMAND: &str = "pipenv run pytest";
const DEFAULT_METRICS_PATH: &str = "metrics.json";
const DEFAULT_INSTALL_COMMAND: &str = "thamos install --runtime-environment {runtime_environment}";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var}: {source}")]
    Command {
        var: &'static str,
        #[source]
        source: CommandError,
    },
    #[error("{var}: expected a boolean flag, got {value:?}")]
    Flag { var: &'static str, value: String },
}

/// Settings for `gather-metrics`: run a test script through a launcher and
/// read its metrics from the captured stdout file.
#[derive(Debug, Clone, Serialize)]
pub struct ScriptConfig {
    /// Working directory of the script; output files are placed here.
    pub exec_dir: PathBuf,
    pub stdout_file: PathBuf,
    pub stderr_file: PathBuf,
    /// Script to run, `{exec_dir}/{MODEL_TEST_PATH}` unless overridden.
    pub exec_file: PathBuf,
    pub launcher: CommandSpec,
    pub debug: bool,
}

/// Settings for `gather-test-metrics`: optionally install a runtime
/// environment, run the test command, and read the metrics it reports.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerConfig {
    pub exec_dir: PathBuf,
    pub test_command: CommandSpec,
    pub metrics_source: MetricsSource,
    /// Runtime environment to install before running the tests.
    pub runtime_environment: Option<String>,
    /// Install command; `{runtime_environment}` is replaced with the name.
    pub install_command: CommandSpec,
    pub debug: bool,
}

// --- Default implementations ---

impl Default for ScriptConfig {
    fn default() -> Self {
        let exec_dir = PathBuf::from(DEFAULT_EXEC_DIR);
        Self {
            exec_file: exec_dir.join(DEFAULT_TEST_PATH),
            exec_dir,
            stdout_file: PathBuf::from(DEFAULT_STDOUT_PATH),
            stderr_file: PathBuf::from(DEFAULT_STDERR_PATH),
            launcher: default_command(DEFAULT_SCRIPT_LAUNCHER),
            debug: false,
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            exec_dir: PathBuf::from(DEFAULT_EXEC_DIR),
            test_command: default_command(DEFAULT_TEST_COMMAND),
            metrics_source: MetricsSource::File(PathBuf::from(DEFAULT_METRICS_PATH)),
            runtime_environment: None,
            install_command: default_command(DEFAULT_INSTALL_COMMAND),
            debug: false,
        }
    }
}

fn default_command(command: &str) -> CommandSpec {
    let mut words = command.split_whitespace();
    let program = words.next().unwrap_or_default();
    words.fold(CommandSpec::new(program), |cmd, word| cmd.arg(word))
}

// --- Environment loading ---

impl ScriptConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load settings from an arbitrary variable lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let exec_dir = path_var(&lookup, EXEC_DIR_VAR).unwrap_or(defaults.exec_dir);
        let test_path = path_var(&lookup, TEST_PATH_VAR).unwrap_or_else(|| DEFAULT_TEST_PATH.into());
        let exec_file = path_var(&lookup, EXEC_FILE_VAR).unwrap_or_else(|| exec_dir.join(test_path));

        Ok(Self {
            stdout_file: path_var(&lookup, STDOUT_PATH_VAR).unwrap_or(defaults.stdout_file),
            stderr_file: path_var(&lookup, STDERR_PATH_VAR).unwrap_or(defaults.stderr_file),
            launcher: command_var(&lookup, SCRIPT_LAUNCHER_VAR)?.unwrap_or(defaults.launcher),
            debug: flag_var(&lookup, DEBUG_VAR)?,
            exec_dir,
            exec_file,
        })
    }

    /// Where the script's stdout is written.
    pub fn stdout_path(&self) -> PathBuf {
        self.exec_dir.join(&self.stdout_file)
    }

    /// Where the script's stderr is written.
    pub fn stderr_path(&self) -> PathBuf {
        self.exec_dir.join(&self.stderr_file)
    }
}

impl RunnerConfig {
    /// Load settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Load settings from an arbitrary variable lookup, falling back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let metrics_source = match non_empty(&lookup, METRICS_PATH_VAR) {
            Some(value) if value == METRICS_FROM_STDOUT => MetricsSource::Stdout,
            Some(value) => MetricsSource::File(PathBuf::from(value)),
            None => defaults.metrics_source,
        };

        Ok(Self {
            exec_dir: path_var(&lookup, EXEC_DIR_VAR).unwrap_or(defaults.exec_dir),
            test_command: command_var(&lookup, TEST_COMMAND_VAR)?.unwrap_or(defaults.test_command),
            metrics_source,
            runtime_environment: non_empty(&lookup, RUNTIME_ENVIRONMENT_VAR),
            install_command: command_var(&lookup, INSTALL_COMMAND_VAR)?
                .unwrap_or(defaults.install_command),
            debug: flag_var(&lookup, DEBUG_VAR)?,
        })
    }
}

/// Trimmed value; empty values count as unset.
fn non_empty(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<String> {
    lookup(var)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn path_var(lookup: &impl Fn(&str) -> Option<String>, var: &str) -> Option<PathBuf> {
    non_empty(lookup, var).map(PathBuf::from)
}

fn command_var(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<CommandSpec>, ConfigError> {
    non_empty(lookup, var)
        .map(|value| CommandSpec::parse(&value).map_err(|source| ConfigError::Command { var, source }))
        .transpose()
}

fn flag_var(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<bool, ConfigError> {
    match lookup(var) {
        Some(value) => parse_flag(&value).ok_or(ConfigError::Flag { var, value }),
        None => Ok(false),
    }
}

/// Parse a boolean flag value; `None` if it is not recognised.
pub fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "" | "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |var: &str| vars.get(var).cloned()
    }

    #[test]
    fn test_script_defaults() {
        let config = ScriptConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.exec_dir, PathBuf::from("."));
        assert_eq!(config.exec_file, PathBuf::from("./src/test.py"));
        assert_eq!(config.stdout_path(), PathBuf::from("./script.stdout"));
        assert_eq!(config.stderr_path(), PathBuf::from("./script.stderr"));
        assert_eq!(config.launcher.argv(), vec!["pipenv", "run", "python3"]);
        assert!(!config.debug);
    }

    #[test]
    fn test_script_exec_file_follows_exec_dir_and_test_path() {
        let config = ScriptConfig::from_lookup(lookup(&[
            (EXEC_DIR_VAR, "/work"),
            (TEST_PATH_VAR, "bench/run.py"),
        ]))
        .unwrap();
        assert_eq!(config.exec_file, PathBuf::from("/work/bench/run.py"));
        assert_eq!(config.stdout_path(), PathBuf::from("/work/script.stdout"));
    }

    #[test]
    fn test_script_explicit_exec_file_wins() {
        let config = ScriptConfig::from_lookup(lookup(&[
            (EXEC_DIR_VAR, "/work"),
            (TEST_PATH_VAR, "bench/run.py"),
            (EXEC_FILE_VAR, "/opt/model/test.py"),
        ]))
        .unwrap();
        assert_eq!(config.exec_file, PathBuf::from("/opt/model/test.py"));
    }

    #[test]
    fn test_script_output_overrides() {
        let config = ScriptConfig::from_lookup(lookup(&[
            (STDOUT_PATH_VAR, "out.log"),
            (STDERR_PATH_VAR, "/tmp/err.log"),
            (SCRIPT_LAUNCHER_VAR, "python3 -u"),
        ]))
        .unwrap();
        assert_eq!(config.stdout_path(), PathBuf::from("./out.log"));
        // Absolute paths are not re-rooted under the exec dir.
        assert_eq!(config.stderr_path(), PathBuf::from("/tmp/err.log"));
        assert_eq!(config.launcher.argv(), vec!["python3", "-u"]);
    }

    #[test]
    fn test_empty_values_fall_back_to_defaults() {
        let config = ScriptConfig::from_lookup(lookup(&[
            (EXEC_DIR_VAR, ""),
            (STDOUT_PATH_VAR, "  "),
            (SCRIPT_LAUNCHER_VAR, ""),
        ]))
        .unwrap();
        assert_eq!(config.exec_dir, PathBuf::from("."));
        assert_eq!(config.stdout_file, PathBuf::from("script.stdout"));
        assert_eq!(config.launcher.program(), "pipenv");
    }

    #[test]
    fn test_path_values_are_trimmed() {
        let config = ScriptConfig::from_lookup(lookup(&[
            (EXEC_DIR_VAR, " /work "),
            (TEST_PATH_VAR, "bench/run.py\n"),
            (STDOUT_PATH_VAR, "\tout.log"),
        ]))
        .unwrap();
        assert_eq!(config.exec_dir, PathBuf::from("/work"));
        assert_eq!(config.exec_file, PathBuf::from("/work/bench/run.py"));
        assert_eq!(config.stdout_path(), PathBuf::from("/work/out.log"));

        let config = RunnerConfig::from_lookup(lookup(&[
            (EXEC_DIR_VAR, " /srv/model"),
            (METRICS_PATH_VAR, " out/metrics.json "),
        ]))
        .unwrap();
        assert_eq!(config.exec_dir, PathBuf::from("/srv/model"));
        assert_eq!(
            config.metrics_source,
            MetricsSource::File(PathBuf::from("out/metrics.json"))
        );
    }

    #[test]
    fn test_runner_defaults() {
        let config = RunnerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.exec_dir, PathBuf::from("."));
        assert_eq!(config.test_command.argv(), vec!["pipenv", "run", "pytest"]);
        assert_eq!(
            config.metrics_source,
            MetricsSource::File(PathBuf::from("metrics.json"))
        );
        assert_eq!(config.runtime_environment, None);
        assert_eq!(
            config.install_command.argv(),
            vec!["thamos", "install", "--runtime-environment", "{runtime_environment}"]
        );
    }

    #[test]
    fn test_runner_overrides() {
        let config = RunnerConfig::from_lookup(lookup(&[
            (EXEC_DIR_VAR, "/srv/model"),
            (TEST_COMMAND_VAR, "python3 -m pytest -q 'tests/test metrics.py'"),
            (METRICS_PATH_VAR, "out/metrics.json"),
            (RUNTIME_ENVIRONMENT_VAR, " ubi8-py38 "),
            (INSTALL_COMMAND_VAR, "pipenv install --deploy"),
            (DEBUG_VAR, "true"),
        ]))
        .unwrap();
        assert_eq!(config.exec_dir, PathBuf::from("/srv/model"));
        assert_eq!(
            config.test_command.argv(),
            vec!["python3", "-m", "pytest", "-q", "tests/test metrics.py"]
        );
        assert_eq!(
            config.metrics_source,
            MetricsSource::File(PathBuf::from("out/metrics.json"))
        );
        assert_eq!(config.runtime_environment.as_deref(), Some("ubi8-py38"));
        assert_eq!(config.install_command.program(), "pipenv");
        assert!(config.debug);
    }

    #[test]
    fn test_runner_metrics_from_stdout() {
        let config = RunnerConfig::from_lookup(lookup(&[(METRICS_PATH_VAR, "-")])).unwrap();
        assert_eq!(config.metrics_source, MetricsSource::Stdout);
    }

    #[test]
    fn test_invalid_command_is_rejected() {
        let err = RunnerConfig::from_lookup(lookup(&[(TEST_COMMAND_VAR, "pytest 'unterminated")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Command {
                var: TEST_COMMAND_VAR,
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_flag_is_rejected() {
        let err = ScriptConfig::from_lookup(lookup(&[(DEBUG_VAR, "maybe")])).unwrap_err();
        assert!(matches!(err, ConfigError::Flag { var: DEBUG_VAR, .. }));
        assert!(err.to_string().contains("maybe"));
    }

    #[test]
    fn test_parse_flag() {
        for value in ["1", "true", "TRUE", "yes", "On"] {
            assert_eq!(parse_flag(value), Some(true), "{value}");
        }
        for value in ["", "0", "false", "No", "off"] {
            assert_eq!(parse_flag(value), Some(false), "{value}");
        }
        assert_eq!(parse_flag("2"), None);
    }
}

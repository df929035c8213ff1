//! Service configuration and factories.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use mathscore_core::scale::BuiltinScaler;
use mathscore_core::traits::{Predictor, Scaler};

use crate::process::ProcedureCommand;
use crate::script::{ScriptPredictor, ScriptScaler};

/// HTTP listener settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; empty means any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
        }
    }
}

/// The external scoring procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictorConfig {
    #[serde(default = "default_command")]
    pub command: String,
    /// Fixed arguments; the feature vector is appended after them.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            command: default_command(),
            args: default_args(),
            timeout_secs: default_timeout_secs(),
            working_dir: None,
        }
    }
}

/// How the scale stage is carried out.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScalerConfig {
    /// Normalize in-process.
    #[default]
    Builtin,
    /// Pipe the payload through an external procedure.
    Script {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_timeout_secs")]
        timeout_secs: u64,
        #[serde(default)]
        working_dir: Option<PathBuf>,
    },
}

/// Top-level mathscore configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MathscoreConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub predictor: PredictorConfig,
    #[serde(default)]
    pub scaler: ScalerConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    5000
}
fn default_command() -> String {
    "python".to_string()
}
fn default_args() -> Vec<String> {
    vec!["predict_math_score.py".to_string()]
}
fn default_timeout_secs() -> u64 {
    5
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str, lookup: &impl Fn(&str) -> Option<String>) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = lookup(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path, lookup: &impl Fn(&str) -> Option<String>) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy(), lookup))
}

/// Resolve `${VAR}` references in every command, argument and path.
fn resolve_config(config: &mut MathscoreConfig, lookup: &impl Fn(&str) -> Option<String>) {
    config.server.host = resolve_env_vars(&config.server.host, lookup);

    let predictor = &mut config.predictor;
    predictor.command = resolve_env_vars(&predictor.command, lookup);
    for arg in &mut predictor.args {
        *arg = resolve_env_vars(arg, lookup);
    }
    if let Some(dir) = &predictor.working_dir {
        predictor.working_dir = Some(resolve_path(dir, lookup));
    }

    if let ScalerConfig::Script {
        command,
        args,
        working_dir,
        ..
    } = &mut config.scaler
    {
        *command = resolve_env_vars(command, lookup);
        for arg in args.iter_mut() {
            *arg = resolve_env_vars(arg, lookup);
        }
        if let Some(dir) = working_dir.as_ref() {
            *working_dir = Some(resolve_path(dir, lookup));
        }
    }
}

/// Apply `PORT`, `MATHSCORE_PREDICTOR_COMMAND` and
/// `MATHSCORE_PREDICTOR_TIMEOUT_SECS` overrides.
fn apply_env_overrides(
    config: &mut MathscoreConfig,
    lookup: &impl Fn(&str) -> Option<String>,
) -> Result<()> {
    if let Some(port) = lookup("PORT") {
        config.server.port = port
            .trim()
            .parse()
            .with_context(|| format!("invalid PORT: {port}"))?;
    }
    if let Some(command) = lookup("MATHSCORE_PREDICTOR_COMMAND") {
        config.predictor.command = command;
    }
    if let Some(secs) = lookup("MATHSCORE_PREDICTOR_TIMEOUT_SECS") {
        config.predictor.timeout_secs = secs
            .trim()
            .parse()
            .with_context(|| format!("invalid MATHSCORE_PREDICTOR_TIMEOUT_SECS: {secs}"))?;
    }
    Ok(())
}

fn check_config(config: &MathscoreConfig) -> Result<()> {
    if config.predictor.command.trim().is_empty() {
        anyhow::bail!("predictor.command must not be empty");
    }
    if config.predictor.timeout_secs == 0 {
        anyhow::bail!("predictor.timeout_secs must be greater than zero");
    }
    if let ScalerConfig::Script {
        command,
        timeout_secs,
        ..
    } = &config.scaler
    {
        if command.trim().is_empty() {
            anyhow::bail!("scaler.command must not be empty");
        }
        if *timeout_secs == 0 {
            anyhow::bail!("scaler.timeout_secs must be greater than zero");
        }
    }
    Ok(())
}

/// Load config from an explicit path, or search the default locations.
///
/// Search order when `path` is `None`:
/// 1. `mathscore.toml` in the current directory
/// 2. `~/.config/mathscore/config.toml`
///
/// Environment variable overrides: `PORT`, `MATHSCORE_PREDICTOR_COMMAND`,
/// `MATHSCORE_PREDICTOR_TIMEOUT_SECS`.
pub fn load_config_from(path: Option<&Path>) -> Result<MathscoreConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("mathscore.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let content = match &config_path {
        Some(path) => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("failed to read config: {}", path.display()))?,
        ),
        None => None,
    };

    let config = parse_config(content.as_deref(), |key| std::env::var(key).ok())
        .with_context(|| match &config_path {
            Some(path) => format!("failed to load config: {}", path.display()),
            None => "failed to load default config".to_string(),
        })?;

    match &config_path {
        Some(path) => tracing::info!("loaded config from {}", path.display()),
        None => tracing::info!("no config file found, using defaults"),
    }
    Ok(config)
}

/// Parse config text (or defaults when `None`) and apply the environment.
pub fn parse_config(
    content: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<MathscoreConfig> {
    let mut config = match content {
        Some(text) => toml::from_str::<MathscoreConfig>(text).context("failed to parse config")?,
        None => MathscoreConfig::default(),
    };
    apply_env_overrides(&mut config, &lookup)?;
    resolve_config(&mut config, &lookup);
    check_config(&config)?;
    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("mathscore"))
}

/// Create the predictor described by the configuration.
pub fn create_predictor(config: &PredictorConfig) -> Arc<dyn Predictor> {
    let mut command = ProcedureCommand::new(&config.command).with_args(config.args.iter().cloned());
    if let Some(dir) = &config.working_dir {
        command = command.with_working_dir(dir);
    }
    Arc::new(ScriptPredictor::new(command).with_timeout(Duration::from_secs(config.timeout_secs)))
}

/// Create the scaler described by the configuration.
pub fn create_scaler(config: &ScalerConfig) -> Arc<dyn Scaler> {
    match config {
        ScalerConfig::Builtin => Arc::new(BuiltinScaler),
        ScalerConfig::Script {
            command,
            args,
            timeout_secs,
            working_dir,
        } => {
            let mut cmd = ProcedureCommand::new(command).with_args(args.iter().cloned());
            if let Some(dir) = working_dir {
                cmd = cmd.with_working_dir(dir);
            }
            Arc::new(ScriptScaler::new(cmd).with_timeout(Duration::from_secs(*timeout_secs)))
        }
    }
}

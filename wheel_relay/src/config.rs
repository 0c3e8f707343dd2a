use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::paths::AppPaths;

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:9876";

/// How inbound messages are handled once acknowledged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RelayMode {
    /// Ack (with the original payload echoed back) and nothing else.
    EchoOnly,
    /// Forward to every client except the sender.
    BroadcastExcludeSender,
    /// Forward like above and keep the latest message for late joiners.
    #[default]
    BroadcastWithRetainedReplay,
}

impl RelayMode {
    pub fn forwards(self) -> bool {
        !matches!(self, RelayMode::EchoOnly)
    }

    pub fn retains(self) -> bool {
        matches!(self, RelayMode::BroadcastWithRetainedReplay)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RelayMode::EchoOnly => "echo-only",
            RelayMode::BroadcastExcludeSender => "broadcast-exclude-sender",
            RelayMode::BroadcastWithRetainedReplay => "broadcast-with-retained-replay",
        }
    }
}

impl fmt::Display for RelayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RelayMode {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "echo" | "echo-only" => Ok(RelayMode::EchoOnly),
            "broadcast" | "broadcast-exclude-sender" => Ok(RelayMode::BroadcastExcludeSender),
            "replay" | "broadcast-with-retained-replay" => {
                Ok(RelayMode::BroadcastWithRetainedReplay)
            }
            other => Err(RelayError::Config(format!(
                "unknown mode '{other}' (expected echo|broadcast|replay)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub listen_addr: String,
    pub mode: RelayMode,
    // Plain-text liveness listener; disabled when unset.
    pub health_addr: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            mode: RelayMode::default(),
            health_addr: None,
        }
    }
}

impl RelayConfig {
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("read {}: {e}", path.display())))?;
        serde_json::from_str(&raw)
            .map_err(|e| RelayError::Config(format!("parse {}: {e}", path.display())))
    }
}

/// Command-line overrides; anything unset falls back to the config file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliArgs {
    pub config: Option<PathBuf>,
    pub listen_addr: Option<String>,
    pub mode: Option<RelayMode>,
    pub health_addr: Option<String>,
    pub help: bool,
}

impl CliArgs {
    pub fn parse(args: &[String]) -> Result<Self, RelayError> {
        let mut out = CliArgs::default();
        let mut it = args.iter();
        while let Some(flag) = it.next() {
            if flag == "--help" || flag == "-h" {
                out.help = true;
                continue;
            }
            let value = it
                .next()
                .ok_or_else(|| RelayError::Config(format!("{flag} needs a value")))?;
            match flag.as_str() {
                "--config" => out.config = Some(PathBuf::from(value)),
                "--addr" => out.listen_addr = Some(value.clone()),
                "--mode" => out.mode = Some(value.parse()?),
                "--health" => out.health_addr = Some(value.clone()),
                other => return Err(RelayError::Config(format!("unknown flag {other}"))),
            }
        }
        Ok(out)
    }

    pub fn apply(&self, mut cfg: RelayConfig) -> RelayConfig {
        if let Some(addr) = &self.listen_addr {
            cfg.listen_addr = addr.clone();
        }
        if let Some(mode) = self.mode {
            cfg.mode = mode;
        }
        if let Some(addr) = &self.health_addr {
            cfg.health_addr = Some(addr.clone());
        }
        cfg
    }
}

/// Config file (explicit `--config`, else the platform default if it
/// exists), then command-line overrides on top.
pub fn resolve(args: &CliArgs) -> Result<RelayConfig, RelayError> {
    let base = match &args.config {
        Some(path) => RelayConfig::load(path)?,
        None => match AppPaths::new() {
            Ok(paths) if paths.relay_config_file().exists() => {
                RelayConfig::load(&paths.relay_config_file())?
            }
            _ => RelayConfig::default(),
        },
    };
    Ok(args.apply(base))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn mode_parses_short_and_long_names() {
        assert_eq!("echo".parse::<RelayMode>().unwrap(), RelayMode::EchoOnly);
        assert_eq!(
            "broadcast-exclude-sender".parse::<RelayMode>().unwrap(),
            RelayMode::BroadcastExcludeSender
        );
        assert_eq!(
            "replay".parse::<RelayMode>().unwrap(),
            RelayMode::BroadcastWithRetainedReplay
        );
        assert!("fanout".parse::<RelayMode>().is_err());
    }

    #[test]
    fn mode_flags() {
        assert!(!RelayMode::EchoOnly.forwards());
        assert!(RelayMode::BroadcastExcludeSender.forwards());
        assert!(!RelayMode::BroadcastExcludeSender.retains());
        assert!(RelayMode::BroadcastWithRetainedReplay.retains());
    }

    #[test]
    fn config_file_fills_missing_fields_with_defaults() {
        let cfg: RelayConfig = serde_json::from_str(r#"{"mode":"echo-only"}"#).unwrap();
        assert_eq!(cfg.mode, RelayMode::EchoOnly);
        assert_eq!(cfg.listen_addr, DEFAULT_LISTEN_ADDR);
        assert_eq!(cfg.health_addr, None);
    }

    #[test]
    fn cli_overrides_config() {
        let cli = CliArgs::parse(&args(&[
            "--addr",
            "0.0.0.0:4000",
            "--mode",
            "broadcast",
            "--health",
            "127.0.0.1:4001",
        ]))
        .unwrap();
        let cfg = cli.apply(RelayConfig::default());
        assert_eq!(cfg.listen_addr, "0.0.0.0:4000");
        assert_eq!(cfg.mode, RelayMode::BroadcastExcludeSender);
        assert_eq!(cfg.health_addr.as_deref(), Some("127.0.0.1:4001"));
    }

    #[test]
    fn cli_rejects_unknown_and_dangling_flags() {
        assert!(CliArgs::parse(&args(&["--port", "1"])).is_err());
        assert!(CliArgs::parse(&args(&["--addr"])).is_err());
        assert!(CliArgs::parse(&args(&["-h"])).unwrap().help);
    }
}

// src/config/model.rs

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::stack::Stack;
use crate::types::HashStorageMode;

/// Configuration exactly as read from TOML, before validation.
///
/// ```toml
/// [config]
/// namespace = "dev"
/// concurrency = 0
///
/// [stack.vpc]
/// deploy = "./deploy-vpc.sh"
///
/// [stack.bastion]
/// requires = ["vpc"]
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub config: ConfigSection,

    /// All stacks from `[stack.<name>]`, keyed by stack name.
    #[serde(default)]
    pub stack: BTreeMap<String, StackConfig>,
}

/// Validated configuration. Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub config: ConfigSection,
    pub stack: BTreeMap<String, StackConfig>,
    poll_interval: Duration,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        stack: BTreeMap<String, StackConfig>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            config,
            stack,
            poll_interval,
        }
    }

    /// `[config].poll_interval`, already parsed.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Build every configured stack, resolving template paths against `root`.
    pub fn stacks(&self, root: &Path) -> Vec<Stack> {
        self.stack
            .iter()
            .map(|(name, cfg)| Stack::from_config(name, cfg, &self.config.namespace, root))
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Prefix of every stack's fully qualified name.
    #[serde(default)]
    pub namespace: String,

    /// 0 = unlimited, 1 = serial, N = at most N stacks at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Delay between polls of a submitted stack (`500ms`, `2s`, `1m`).
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    /// Stream stack command output while steps run.
    #[serde(default)]
    pub tail: bool,

    #[serde(default)]
    pub hash_storage_mode: HashStorageMode,
}

fn default_concurrency() -> usize {
    0
}

fn default_poll_interval() -> String {
    "1s".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            namespace: String::new(),
            concurrency: default_concurrency(),
            poll_interval: default_poll_interval(),
            tail: false,
            hash_storage_mode: HashStorageMode::default(),
        }
    }
}

/// `[stack.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct StackConfig {
    #[serde(default)]
    pub description: Option<String>,

    /// Stacks deployed before this one.
    #[serde(default)]
    pub requires: Vec<String>,

    /// Stacks deployed after this one.
    #[serde(default)]
    pub required_by: Vec<String>,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub locked: bool,

    #[serde(default)]
    pub recreate_failed: bool,

    /// Template file, relative to the config file's directory.
    #[serde(default)]
    pub template_path: Option<String>,

    #[serde(default)]
    pub parameters: BTreeMap<String, String>,

    #[serde(default)]
    pub deploy: Option<String>,

    #[serde(default)]
    pub destroy: Option<String>,

    /// Exits 0 when the stack exists.
    #[serde(default)]
    pub check: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            description: None,
            requires: Vec::new(),
            required_by: Vec::new(),
            enabled: true,
            locked: false,
            recreate_failed: false,
            template_path: None,
            parameters: BTreeMap::new(),
            deploy: None,
            destroy: None,
            check: None,
        }
    }
}

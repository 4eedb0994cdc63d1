#![allow(dead_code)]

use std::collections::BTreeMap;

use cfngin::config::{ConfigFile, ConfigSection, RawConfigFile, StackConfig};
use cfngin::errors::CfnginError;
use cfngin::stack::Stack;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                stack: BTreeMap::new(),
            },
        }
    }

    pub fn with_stack(mut self, name: &str, stack: StackConfig) -> Self {
        self.config.stack.insert(name.to_string(), stack);
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.config.config.namespace = namespace.to_string();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.config.config.concurrency = concurrency;
        self
    }

    pub fn with_poll_interval(mut self, interval: &str) -> Self {
        self.config.config.poll_interval = interval.to_string();
        self
    }

    pub fn try_build(self) -> Result<ConfigFile, CfnginError> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        self.try_build()
            .expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `StackConfig`.
pub struct StackConfigBuilder {
    stack: StackConfig,
}

impl StackConfigBuilder {
    pub fn new() -> Self {
        Self {
            stack: StackConfig::default(),
        }
    }

    pub fn requires(mut self, deps: &[&str]) -> Self {
        self.stack.requires = deps.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn required_by(mut self, parents: &[&str]) -> Self {
        self.stack.required_by = parents.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn deploy(mut self, cmd: &str) -> Self {
        self.stack.deploy = Some(cmd.to_string());
        self
    }

    pub fn destroy(mut self, cmd: &str) -> Self {
        self.stack.destroy = Some(cmd.to_string());
        self
    }

    pub fn check(mut self, cmd: &str) -> Self {
        self.stack.check = Some(cmd.to_string());
        self
    }

    pub fn template_path(mut self, path: &str) -> Self {
        self.stack.template_path = Some(path.to_string());
        self
    }

    pub fn param(mut self, key: &str, value: &str) -> Self {
        self.stack.parameters.insert(key.to_string(), value.to_string());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.stack.enabled = false;
        self
    }

    pub fn locked(mut self) -> Self {
        self.stack.locked = true;
        self
    }

    pub fn build(self) -> StackConfig {
        self.stack
    }
}

impl Default for StackConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// A bare stack named `name` that requires `deps`.
pub fn stack(name: &str, deps: &[&str]) -> Stack {
    deps.iter().fold(Stack::new(name), |stack, dep| stack.requires(dep))
}

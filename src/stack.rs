// src/stack.rs

//! The deployable entity planned and executed by the engine.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde_json::json;

use crate::config::model::StackConfig;
use crate::types::StackName;

static PARAM_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z0-9_]+)\}").expect("valid regex"));

/// A named, independently deployable unit of infrastructure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stack {
    pub name: StackName,
    /// Fully qualified name: `<namespace>-<name>`, or `name` without a namespace.
    pub fqn: String,
    pub description: Option<String>,
    /// Stacks that must be deployed before this one.
    pub requires: Vec<StackName>,
    /// Stacks that must be deployed after this one.
    pub required_by: Vec<StackName>,
    pub enabled: bool,
    /// A locked stack is created if missing but never updated.
    pub locked: bool,
    /// Destroy and re-create the stack when it is found in a failed state.
    pub recreate_failed: bool,
    pub template_path: Option<PathBuf>,
    pub parameters: BTreeMap<String, String>,
    pub deploy: Option<String>,
    pub destroy: Option<String>,
    pub check: Option<String>,
    /// Whether status transitions of this stack's step are logged.
    pub logging: bool,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            fqn: name.clone(),
            name,
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
            logging: true,
        }
    }

    /// Build a stack from its `[stack.<name>]` section.
    ///
    /// Relative template paths are resolved against `root`.
    pub fn from_config(name: &str, cfg: &StackConfig, namespace: &str, root: &Path) -> Self {
        let mut stack = Stack::new(name).with_namespace(namespace);
        stack.description = cfg.description.clone();
        stack.requires = cfg.requires.clone();
        stack.required_by = cfg.required_by.clone();
        stack.enabled = cfg.enabled;
        stack.locked = cfg.locked;
        stack.recreate_failed = cfg.recreate_failed;
        stack.template_path = cfg.template_path.as_ref().map(|p| {
            let p = PathBuf::from(p);
            if p.is_relative() { root.join(p) } else { p }
        });
        stack.parameters = cfg.parameters.clone();
        stack.deploy = cfg.deploy.clone();
        stack.destroy = cfg.destroy.clone();
        stack.check = cfg.check.clone();
        stack
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.fqn = if namespace.is_empty() {
            self.name.clone()
        } else {
            format!("{namespace}-{}", self.name)
        };
        self
    }

    pub fn requires(mut self, dep: &str) -> Self {
        self.requires.push(dep.to_string());
        self
    }

    pub fn required_by(mut self, parent: &str) -> Self {
        self.required_by.push(parent.to_string());
        self
    }

    /// Render the template body with `${param}` tokens substituted from
    /// `parameters`. Unknown tokens are left untouched.
    ///
    /// Without a template, a JSON description of the stack is rendered.
    pub fn render_template(&self) -> Result<String> {
        let Some(path) = &self.template_path else {
            let doc = json!({
                "name": self.name,
                "fqn": self.fqn,
                "description": self.description,
                "requires": self.requires,
                "required_by": self.required_by,
                "parameters": self.parameters,
            });
            return Ok(serde_json::to_string_pretty(&doc)?);
        };

        let body = fs::read_to_string(path)
            .with_context(|| format!("reading template for stack '{}' at {:?}", self.name, path))?;

        let rendered = PARAM_TOKEN.replace_all(&body, |caps: &Captures| {
            self.parameters
                .get(&caps[1])
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        });
        Ok(rendered.into_owned())
    }
}

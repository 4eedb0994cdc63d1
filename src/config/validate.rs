// src/config/validate.rs

use std::time::Duration;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{CfnginError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CfnginError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let poll_interval = validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.stack, poll_interval))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<Duration> {
    ensure_has_stacks(cfg)?;
    let poll_interval = validate_global_config(cfg)?;
    validate_stack_dependencies(cfg)?;
    validate_dag(cfg)?;
    Ok(poll_interval)
}

fn ensure_has_stacks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.stack.is_empty() {
        return Err(CfnginError::ConfigError(
            "config must contain at least one [stack.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<Duration> {
    let namespace = &cfg.config.namespace;
    if namespace.chars().any(char::is_whitespace) {
        return Err(CfnginError::ConfigError(format!(
            "[config].namespace must not contain whitespace (got '{namespace}')"
        )));
    }

    parse_duration(&cfg.config.poll_interval).map_err(|e| {
        CfnginError::ConfigError(format!("[config].poll_interval is invalid: {e}"))
    })
}

fn validate_stack_dependencies(cfg: &RawConfigFile) -> Result<()> {
    for (name, stack) in cfg.stack.iter() {
        let deps = stack
            .requires
            .iter()
            .map(|d| ("requires", d))
            .chain(stack.required_by.iter().map(|d| ("required_by", d)));

        for (field, dep) in deps {
            if !cfg.stack.contains_key(dep) {
                return Err(CfnginError::ConfigError(format!(
                    "stack '{name}' has unknown dependency '{dep}' in `{field}`"
                )));
            }
            if dep == name {
                return Err(CfnginError::ConfigError(format!(
                    "stack '{name}' cannot depend on itself in `{field}`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(cfg: &RawConfigFile) -> Result<()> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for name in cfg.stack.keys() {
        graph.add_node(name.as_str());
    }

    for (name, stack) in cfg.stack.iter() {
        for dep in stack.requires.iter() {
            graph.add_edge(dep.as_str(), name.as_str(), ());
        }
        for parent in stack.required_by.iter() {
            graph.add_edge(name.as_str(), parent.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(CfnginError::DagCycle(format!(
            "cycle detected in stack graph involving stack '{}'",
            cycle.node_id()
        ))),
    }
}

/// Parse `<digits><unit>` where unit is `ms`, `s`, `m` or `h`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| "duration missing unit suffix".to_string())?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;

    let secs_per = match unit_part.trim().to_lowercase().as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        unit => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };

    value
        .checked_mul(secs_per)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration too large: '{s}'"))
}

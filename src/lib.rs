// src/lib.rs

pub mod actions;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod dag;
pub mod errors;
pub mod logging;
pub mod plan;
pub mod provider;
pub mod stack;
pub mod types;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::actions::{ActionContext, deploy_plan, destroy_plan};
use crate::cancel::CancelToken;
use crate::cli::{CliArgs, Command, RunArgs};
use crate::config::loader::load_and_validate;
use crate::config::model::ConfigFile;
use crate::dag::Walker;
use crate::plan::{Graph, Plan, Step};
use crate::provider::ShellProvider;
use crate::provider::hash::hash_store_for;

/// High-level entry point used by `main.rs`.
///
/// Loads the config, builds the requested plan and runs it with a shell
/// provider rooted at the config file's directory. Ctrl-C interrupts every
/// running step.
pub async fn run(args: CliArgs) -> Result<()> {
    let config_path = PathBuf::from(&args.config);
    let cfg = load_and_validate(&config_path)?;
    let root = config_root_dir(&config_path);
    let stacks = cfg.stacks(&root);

    match args.command {
        Command::Graph(graph_args) => {
            let graph = Graph::from_steps(stacks.into_iter().map(Step::noop))?;
            let rendered =
                actions::graph::render(&graph, graph_args.format, graph_args.reduce)?;
            println!("{rendered}");
            Ok(())
        }
        Command::Dump(dump_args) => {
            let ctx = action_context(&cfg, &root, false);
            let plan = deploy_plan(&ctx, stacks, &dump_args.stacks)?;
            let written = plan.dump(&dump_args.directory)?;
            info!(count = written.len(), "templates dumped");
            Ok(())
        }
        Command::Deploy(deploy_args) => {
            let ctx = action_context(&cfg, &root, deploy_args.run.tail);
            let plan = deploy_plan(&ctx, stacks, &deploy_args.run.stacks)?;
            if deploy_args.dry_run {
                plan.outline(None)?;
                return Ok(());
            }
            execute(&plan, &ctx, &cfg, &deploy_args.run).await
        }
        Command::Destroy(destroy_args) => {
            let ctx = action_context(&cfg, &root, destroy_args.run.tail);
            let plan = destroy_plan(&ctx, stacks, &destroy_args.run.stacks)?;
            if !destroy_args.force {
                plan.outline(Some("To execute this plan, run with \"--force\" flag."))?;
                return Ok(());
            }
            execute(&plan, &ctx, &cfg, &destroy_args.run).await
        }
    }
}

fn action_context(cfg: &ConfigFile, root: &Path, tail: bool) -> ActionContext {
    let hashes = hash_store_for(cfg.config.hash_storage_mode, root);
    let provider = ShellProvider::new(root.to_path_buf(), hashes);
    ActionContext::new(Arc::new(provider))
        .with_poll_interval(cfg.poll_interval())
        .with_tail(tail || cfg.config.tail)
}

async fn execute(plan: &Plan, ctx: &ActionContext, cfg: &ConfigFile, args: &RunArgs) -> Result<()> {
    spawn_interrupt_handler(ctx.cancel.clone());

    let concurrency = args.concurrency.unwrap_or(cfg.config.concurrency);
    let walker = Walker::from_concurrency(concurrency);
    info!(concurrency, steps = plan.graph().len(), "starting plan");

    plan.execute(&walker).await?;
    Ok(())
}

/// Ctrl-C → every callback sees the cancel and returns INTERRUPTED.
fn spawn_interrupt_handler(cancel: CancelToken) {
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            eprintln!("failed to listen for Ctrl+C: {e}");
            return;
        }
        info!("interrupt received; cancelling running steps");
        cancel.cancel();
    });
}

/// Directory containing the config file, or the working directory for a
/// bare file name.
pub fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

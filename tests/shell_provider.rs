#![cfg(unix)]

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use cfngin::actions::deploy::CREATING;
use cfngin::actions::destroy::DESTROYED;
use cfngin::actions::{ActionContext, deploy_plan, destroy_plan};
use cfngin::dag::Walker;
use cfngin::plan::Plan;
use cfngin::plan::status::{self, Status, StatusCode};
use cfngin::provider::hash::{FileHashStore, HashStore, MemoryHashStore, compute_stack_hash};
use cfngin::provider::{Provider, ShellProvider};
use cfngin::stack::Stack;
use cfngin_test_utils::{init_tracing, with_timeout};
use tempfile::tempdir;

fn context(provider: Arc<ShellProvider>) -> ActionContext {
    ActionContext::new(provider).with_poll_interval(Duration::from_millis(10))
}

fn shell_stack(name: &str) -> Stack {
    let mut stack = Stack::new(name);
    stack.deploy = Some(format!("echo deployed > {name}.out"));
    stack.destroy = Some(format!("rm {name}.out"));
    stack.check = Some(format!("test -f {name}.out"));
    stack
}

fn status_of(plan: &Plan, name: &str) -> Status {
    plan.graph().get(name).unwrap().status()
}

#[tokio::test]
async fn test_deploy_redeploy_and_destroy_lifecycle() {
    init_tracing();
    let dir = tempdir().unwrap();
    let provider = Arc::new(ShellProvider::new(
        dir.path().to_path_buf(),
        Box::new(MemoryHashStore::new()),
    ));
    let ctx = context(provider);

    // First deploy: `check` fails, so the stack is created.
    let plan = deploy_plan(&ctx, vec![shell_stack("vpc")], &[]).unwrap();
    with_timeout(plan.execute(&Walker::Serial)).await.unwrap();
    assert_eq!(status_of(&plan, "vpc"), Status::complete(CREATING));
    assert!(dir.path().join("vpc.out").is_file());

    // Nothing changed since the last successful deploy.
    let plan = deploy_plan(&ctx, vec![shell_stack("vpc")], &[]).unwrap();
    with_timeout(plan.execute(&Walker::Serial)).await.unwrap();
    assert_eq!(status_of(&plan, "vpc"), status::DID_NOT_CHANGE);

    let plan = destroy_plan(&ctx, vec![shell_stack("vpc")], &[]).unwrap();
    with_timeout(plan.execute(&Walker::Serial)).await.unwrap();
    assert_eq!(status_of(&plan, "vpc"), Status::complete(DESTROYED));
    assert!(!dir.path().join("vpc.out").exists());
}

#[tokio::test]
async fn test_failing_command_fails_step_with_exit_code() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(ShellProvider::new(
        dir.path().to_path_buf(),
        Box::new(MemoryHashStore::new()),
    ));
    let mut stack = Stack::new("vpc");
    stack.deploy = Some("exit 3".to_string());

    let plan = deploy_plan(&context(provider), vec![stack], &[]).unwrap();
    let result = with_timeout(plan.execute(&Walker::Serial)).await;

    assert!(result.is_err());
    assert_eq!(
        status_of(&plan, "vpc"),
        Status::failed("deploy command exited with code 3")
    );
}

#[tokio::test]
async fn test_commands_see_stack_environment() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(ShellProvider::new(
        dir.path().to_path_buf(),
        Box::new(MemoryHashStore::new()),
    ));
    let mut stack = Stack::new("vpc").with_namespace("dev");
    stack.parameters.insert("env".to_string(), "prod".to_string());
    stack.deploy =
        Some("echo \"$CFNGIN_STACK_FQN $CFNGIN_PARAM_ENV\" > env.out".to_string());
    stack.check = Some("test -f env.out".to_string());

    let plan = deploy_plan(&context(provider), vec![stack], &[]).unwrap();
    with_timeout(plan.execute(&Walker::Serial)).await.unwrap();

    let out = fs::read_to_string(dir.path().join("env.out")).unwrap();
    assert_eq!(out.trim(), "dev-vpc prod");
}

#[tokio::test]
async fn test_untracked_stack_without_check_is_assumed_to_exist() {
    let dir = tempdir().unwrap();
    let provider = ShellProvider::new(dir.path().to_path_buf(), Box::new(MemoryHashStore::new()));

    let remote = provider.get_stack(&Stack::new("vpc")).await.unwrap().unwrap();
    assert!(remote.status.is_completed());

    let mut checked = Stack::new("db");
    checked.check = Some("false".to_string());
    assert!(provider.get_stack(&checked).await.unwrap().is_none());
}

#[tokio::test]
async fn test_destroy_without_command_is_an_error() {
    let dir = tempdir().unwrap();
    let provider = Arc::new(ShellProvider::new(
        dir.path().to_path_buf(),
        Box::new(MemoryHashStore::new()),
    ));

    let plan = destroy_plan(&context(provider), vec![Stack::new("vpc")], &[]).unwrap();
    let result = with_timeout(plan.execute(&Walker::Serial)).await;

    assert!(result.is_err());
    let status = status_of(&plan, "vpc");
    assert_eq!(status.code(), StatusCode::Failed);
    assert!(status.reason().unwrap().contains("no destroy command"));
}

#[test]
fn test_file_hash_store_persists_sorted_entries() {
    let dir = tempdir().unwrap();
    let mut store = FileHashStore::new(dir.path().to_path_buf());

    store.save("vpc", "bbb").unwrap();
    store.save("app", "aaa").unwrap();
    assert_eq!(store.load("vpc").unwrap().as_deref(), Some("bbb"));

    let contents = fs::read_to_string(dir.path().join(".cfngin/hashes")).unwrap();
    assert_eq!(contents, "app aaa\nvpc bbb\n");

    store.remove("vpc").unwrap();
    let reopened = FileHashStore::new(dir.path().to_path_buf());
    assert_eq!(reopened.load("vpc").unwrap(), None);
    assert_eq!(reopened.load("app").unwrap().as_deref(), Some("aaa"));
}

#[test]
fn test_stack_hash_tracks_definition() {
    let dir = tempdir().unwrap();
    let template = dir.path().join("vpc.json");
    fs::write(&template, "{}").unwrap();

    let mut stack = shell_stack("vpc");
    stack.template_path = Some(template.clone());
    let original = compute_stack_hash(&stack).unwrap();
    assert_eq!(compute_stack_hash(&stack).unwrap(), original);

    fs::write(&template, "{\"changed\": true}").unwrap();
    assert_ne!(compute_stack_hash(&stack).unwrap(), original);

    let mut with_param = shell_stack("vpc");
    with_param.parameters.insert("k".to_string(), "v".to_string());
    assert_ne!(
        compute_stack_hash(&with_param).unwrap(),
        compute_stack_hash(&shell_stack("vpc")).unwrap()
    );
}

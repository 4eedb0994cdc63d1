#![allow(dead_code)]

use std::sync::Arc;

use cfngin::dag::Dag;
use cfngin::plan::{Graph, Plan, Step, StepFn};
use cfngin::stack::Stack;
use cfngin_test_utils::builders::stack;

/// `a -> b`, `a -> c`, `b -> d`, `c -> d`.
pub fn basic_dag() -> Dag {
    Dag::from_dict([
        ("a", vec!["b", "c"]),
        ("b", vec!["d"]),
        ("c", vec!["d"]),
        ("d", vec![]),
    ])
    .unwrap()
}

/// Steps built from `(name, requires)` pairs, all sharing one callback.
pub fn steps_of(layout: &[(&str, &[&str])], func: &StepFn) -> Vec<Step> {
    layout
        .iter()
        .map(|(name, deps)| Step::new(stack(name, deps), "deploy", Arc::clone(func)))
        .collect()
}

pub fn plan_of(steps: Vec<Step>) -> Plan {
    Plan::new("test plan", Graph::from_steps(steps).unwrap())
}

pub fn stacks_of(layout: &[(&str, &[&str])]) -> Vec<Stack> {
    layout.iter().map(|(name, deps)| stack(name, deps)).collect()
}

/// Index of `name` in `order`, panicking when absent.
pub fn position(order: &[String], name: &str) -> usize {
    order
        .iter()
        .position(|n| n == name)
        .unwrap_or_else(|| panic!("{name} missing from {order:?}"))
}

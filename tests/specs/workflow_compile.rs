//! Workflow compilation specs

use crate::prelude::*;

/// Two actions that each run after the other form a cycle.
#[test]
fn circular_run_after_is_rejected() {
    let def = WorkflowDefinition::new()
        .with_manual_trigger()
        .with_action("a", compose(json!(1)).run_after("b", &[ActionStatus::Succeeded]))
        .with_action("b", compose(json!(2)).run_after("a", &[ActionStatus::Succeeded]));

    let outcome = compile(&def);
    assert!(!outcome.valid);
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.message == "Circular dependency detected in runAfter"));
}

/// An empty workflow reports both missing trigger and missing action.
#[test]
fn empty_workflow_fails_compilation() {
    let outcome = compile(&WorkflowDefinition::new());
    assert!(!outcome.valid);
    let messages: Vec<&str> = outcome.errors.iter().map(|e| e.message.as_str()).collect();
    assert!(messages.contains(&"Workflow must have at least one trigger"));
    assert!(messages.contains(&"Workflow must have at least one action"));
}

#[test]
fn unknown_dependency_names_the_action_and_prereq() {
    let def = WorkflowDefinition::new().with_manual_trigger().with_action(
        "late",
        compose(json!(1)).run_after("early", &[ActionStatus::Succeeded]),
    );
    let outcome = compile(&def);
    assert!(outcome
        .errors
        .iter()
        .any(|e| e.message == "[late] Unknown dependency: early"));
}

/// The executor refuses to run an invalid definition.
#[tokio::test]
async fn executor_rejects_invalid_definitions() {
    let loom = Loom::new();
    let err = loom
        .executor()
        .run("wf", &WorkflowDefinition::new(), IndexMap::new())
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::Invalid(_)));
}

/// A valid compiled workflow has an acyclic runAfter graph; the diamond
/// shape runs every action once.
#[tokio::test]
async fn diamond_graph_executes_every_action_once() {
    let def = WorkflowDefinition::new()
        .with_manual_trigger()
        .with_action("root", compose(json!(0)))
        .with_action("left", compose(json!(1)).run_after("root", &[ActionStatus::Succeeded]))
        .with_action("right", compose(json!(2)).run_after("root", &[ActionStatus::Succeeded]))
        .with_action(
            "join",
            compose(json!("@actions('left').output"))
                .run_after("left", &[ActionStatus::Succeeded])
                .run_after("right", &[ActionStatus::Succeeded]),
        );
    assert!(compile(&def).valid);

    let loom = Loom::new();
    let run = loom.executor().run("wf", &def, IndexMap::new()).await.unwrap();
    assert_eq!(run.instance.actions.len(), 4);
    assert_eq!(run.instance.actions["join"].output, json!(1));
}

//! Loop semantics specs
//!
//! The Until-loop counting scenario plus bounded-loop behavior.

use crate::prelude::*;

fn until_loop(condition: &str, count: u64) -> Action {
    let mut body = IndexMap::new();
    body.insert(
        "body".to_string(),
        compose(json!("@variables('loopIndex')")),
    );
    let mut action = Action::new(ActionType::Until, Value::Null);
    action.condition = Some(json!(condition));
    action.actions = body;
    action.limit = Some(LoopLimit { count, timeout: None });
    action
}

/// Until-loop count: condition `loopIndex >= 4` with limit 10 records
/// exactly 4 iterations, condition met, 4 results.
#[tokio::test]
async fn until_loop_counts_exactly_four_iterations() {
    let loom = Loom::new();
    let def = single_action_workflow(
        "spin",
        until_loop("@greaterOrEquals(@variables('loopIndex'),4)", 10),
    );

    let run = loom.executor().run("wf", &def, IndexMap::new()).await.unwrap();
    let output = &run.instance.actions["spin"].output;
    assert_eq!(output["status"], json!("completed"));
    assert_eq!(output["iterations"], json!(4));
    assert_eq!(output["conditionMet"], json!(true));
    assert_eq!(output["results"].as_array().unwrap().len(), 4);
}

/// A loop that never meets its condition terminates at limit.count with
/// status max-iterations.
#[tokio::test]
async fn never_met_condition_stops_at_the_cap() {
    let loom = Loom::new();
    let def = single_action_workflow("spin", until_loop("@equals(1,2)", 6));

    let run = loom.executor().run("wf", &def, IndexMap::new()).await.unwrap();
    let output = &run.instance.actions["spin"].output;
    assert_eq!(output["status"], json!("max-iterations"));
    assert_eq!(output["iterations"], json!(6));
    assert!(output.get("conditionMet").is_none());
}

/// Iterations never exceed limit.count regardless of the condition.
#[tokio::test]
async fn iterations_are_bounded_by_limit_count() {
    let loom = Loom::new();
    for count in [1, 3, 7] {
        let def = single_action_workflow("spin", until_loop("@equals(1,2)", count));
        let run = loom.executor().run("wf", &def, IndexMap::new()).await.unwrap();
        let output = &run.instance.actions["spin"].output;
        assert!(output["iterations"].as_u64().unwrap() <= count);
    }
}

/// The loop context is visible to the body but does not leak into the
/// instance afterwards.
#[tokio::test]
async fn loop_context_does_not_leak() {
    let loom = Loom::new();
    let def = single_action_workflow(
        "spin",
        until_loop("@greaterOrEquals(@variables('loopIndex'),1)", 5),
    );
    let run = loom.executor().run("wf", &def, IndexMap::new()).await.unwrap();
    assert!(!run.instance.variables.contains_key("loopIndex"));
    assert!(!run.instance.variables.contains_key("loopCount"));
}

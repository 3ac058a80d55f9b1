//! Workflow → actor dispatch specs

use crate::prelude::*;
use loom_runtime::RuntimeDispatcher;

/// Replies with the method and args it was invoked with.
struct EchoActor;

impl Actor for EchoActor {
    fn execute(&self, cell: &mut ActorCell, input: Option<&Value>) -> Result<Value, ActorError> {
        let call = input.cloned().unwrap_or(Value::Null);
        cell.update_state(|s| {
            let n = s.get("calls").and_then(Value::as_i64).unwrap_or(0);
            s.insert("calls".to_string(), json!(n + 1));
        })?;
        Ok(json!({"echo": call["args"], "method": call["method"]}))
    }
}

fn actor_action(inputs: Value) -> Action {
    Action::new(ActionType::Actor, inputs)
}

#[tokio::test]
async fn actor_action_routes_through_the_runtime() {
    let loom = Loom::new();
    loom.register("EchoActor", ActorConfig::default(), || EchoActor);

    let def = single_action_workflow(
        "call",
        actor_action(json!({
            "actorType": "EchoActor",
            "actorId": "echo-1",
            "method": "greet",
            "args": {"who": "workflow"}
        })),
    );
    let run = loom
        .executor()
        .with_dispatcher(Arc::new(RuntimeDispatcher::new(loom.runtime.clone())))
        .run("wf", &def, IndexMap::new())
        .await
        .unwrap();

    let output = &run.instance.actions["call"].output;
    assert_eq!(output["method"], json!("greet"));
    assert_eq!(output["echo"], json!({"who": "workflow"}));

    // The call went through the journaled actor path.
    let state = loom
        .runtime
        .stores()
        .state
        .load_state(&ActorId::new("echo-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(state.get("calls"), Some(&json!(1)));
}

#[tokio::test]
async fn actor_action_without_id_routes_to_least_loaded() {
    let loom = Loom::new();
    loom.register("EchoActor", ActorConfig::default(), || EchoActor);

    let def = single_action_workflow(
        "call",
        actor_action(json!({"actorType": "EchoActor", "method": "greet", "args": 1})),
    );
    loom.executor()
        .with_dispatcher(Arc::new(RuntimeDispatcher::new(loom.runtime.clone())))
        .run("wf", &def, IndexMap::new())
        .await
        .unwrap();

    // The dispatcher minted the type's first instance id.
    let state = loom
        .runtime
        .stores()
        .state
        .load_state(&ActorId::new("echoactor-1"))
        .await
        .unwrap();
    assert!(state.is_some());
}

#[tokio::test]
async fn unknown_actor_type_fails_the_action() {
    let loom = Loom::new();
    let def = single_action_workflow(
        "call",
        actor_action(json!({"actorType": "Ghost", "args": {}})),
    );
    let err = loom
        .executor()
        .with_dispatcher(Arc::new(RuntimeDispatcher::new(loom.runtime.clone())))
        .run("wf", &def, IndexMap::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("unknown actor type"));
}

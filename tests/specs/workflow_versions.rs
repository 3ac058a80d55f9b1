//! Workflow store versioning specs

use crate::prelude::*;

fn definition() -> WorkflowDefinition {
    single_action_workflow("only", compose(json!(1)))
}

/// Create pins 1.0.0; patch, minor and major bumps follow semver; the
/// version list comes back in creation order.
#[tokio::test]
async fn semver_publish_sequence() {
    let loom = Loom::new();
    let store = loom.workflows();

    let created = store.create("wf", definition()).await.unwrap();
    assert_eq!(created.metadata.version, "1.0.0");

    loom.clock.advance(Duration::from_millis(1));
    let patch = store.publish("wf", definition(), VersionBump::Patch).await.unwrap();
    assert_eq!(patch.metadata.version, "1.0.1");

    loom.clock.advance(Duration::from_millis(1));
    let minor = store.publish("wf", definition(), VersionBump::Minor).await.unwrap();
    assert_eq!(minor.metadata.version, "1.1.0");

    loom.clock.advance(Duration::from_millis(1));
    let major = store.publish("wf", definition(), VersionBump::Major).await.unwrap();
    assert_eq!(major.metadata.version, "2.0.0");

    let id = WorkflowId::new("wf");
    let versions = store.list_versions(&id).await.unwrap();
    let listed: Vec<&str> = versions.iter().map(|v| v.metadata.version.as_str()).collect();
    assert_eq!(listed, vec!["1.0.0", "1.0.1", "1.1.0", "2.0.0"]);
    assert_eq!(store.get(&id).await.unwrap().metadata.version, "2.0.0");
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let loom = Loom::new();
    let store = loom.workflows();
    store.create("wf", definition()).await.unwrap();
    assert!(store.create("wf", definition()).await.is_err());
}

/// The stored definition round-trips through the document store intact,
/// including the verbatim `$schema`.
#[tokio::test]
async fn stored_definition_round_trips() {
    let loom = Loom::new();
    let store = loom.workflows();
    let mut def = definition();
    def.schema = Some("https://example.com/workflow.schema.json".to_string());
    store.create("wf", def.clone()).await.unwrap();

    let loaded = store.get(&WorkflowId::new("wf")).await.unwrap();
    assert_eq!(loaded.definition, def);

    // And the stored definition still compiles and runs.
    let loom2 = Loom::new();
    let run = loom2
        .executor()
        .run("wf", &loaded.definition, IndexMap::new())
        .await
        .unwrap();
    assert_eq!(run.instance.actions["only"].output, json!(1));
}

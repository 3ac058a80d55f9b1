//! Secrets resolution specs

use crate::prelude::*;

/// `@secret('api-key')` resolves through the configured store.
#[tokio::test]
async fn secret_expression_resolves() {
    let loom = Loom::new();
    let secrets = loom.secrets();
    secrets
        .set_secret("api-key", "ABC", Default::default())
        .await
        .unwrap();

    let def = single_action_workflow("reveal", compose(json!("@secret('api-key')")));
    let run = loom
        .executor()
        .with_secrets(Arc::new(secrets))
        .run("wf", &def, IndexMap::new())
        .await
        .unwrap();
    assert_eq!(run.instance.actions["reveal"].output, json!("ABC"));
}

/// A missing key fails the action with a message naming the secret.
#[tokio::test]
async fn missing_secret_surfaces_not_found() {
    let loom = Loom::new();
    let def = single_action_workflow("reveal", compose(json!("@secret('ghost')")));
    let err = loom
        .executor()
        .with_secrets(Arc::new(loom.secrets()))
        .run("wf", &def, IndexMap::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Secret not found"));
}

/// Without a configured store the action fails with the exact message.
#[tokio::test]
async fn unconfigured_secrets_client_is_reported() {
    let loom = Loom::new();
    let def = single_action_workflow("reveal", compose(json!("@secret('api-key')")));
    let err = loom.executor().run("wf", &def, IndexMap::new()).await.unwrap_err();
    assert!(err.to_string().contains("No secrets client configured"));
}

/// Soft-deleted secrets stop resolving; listings never expose values.
#[tokio::test]
async fn deleted_secret_no_longer_resolves_and_listing_hides_values() {
    let loom = Loom::new();
    let secrets = loom.secrets();
    secrets.set_secret("api-key", "ABC", Default::default()).await.unwrap();
    secrets.delete_secret("api-key").await.unwrap();

    let def = single_action_workflow("reveal", compose(json!("@secret('api-key')")));
    let err = loom
        .executor()
        .with_secrets(Arc::new(secrets.clone()))
        .run("wf", &def, IndexMap::new())
        .await
        .unwrap_err();
    assert!(err.to_string().contains("Secret not found"));

    let listing = secrets.list_secrets().await.unwrap();
    let listing_json = serde_json::to_string(&listing).unwrap();
    assert!(!listing_json.contains("ABC"));
}

// End-to-end tests for the resource provider engine: durable round trips,
// tombstone semantics, and cross-replica cache refresh through the event
// feed.

use std::sync::Arc;
use std::time::Duration;

use overture_error::ProviderError;
use overture_provider::providers::model_provider;
use overture_provider::{EventBridge, EventService, InMemoryEventService, ProviderEngine};
use overture_storage::{FileStorageService, MemoryStorageService, StorageService};
use overture_types::model::{model_types, ModelDefinition};
use overture_types::{InstanceSettings, NameCheckStatus, ResourceName};

fn instance() -> InstanceSettings {
    InstanceSettings::new("inst-1", "0.9.1")
}

fn model(name: &str) -> String {
    serde_json::to_string(&ModelDefinition::new(name, model_types::COMPLETION)).unwrap()
}

async fn initialized_provider(storage: Arc<dyn StorageService>) -> ProviderEngine {
    let provider = model_provider(instance(), storage);
    provider.initialize().await.unwrap();
    provider
}

/// Polls until the engine can see the named model, or panics.
async fn wait_for_model(engine: &ProviderEngine, name: &str) -> ModelDefinition {
    for _ in 0..100 {
        if let Ok(found) = engine.get_resource(&format!("models/{name}"), "reader").await {
            return found;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("the model {name} never became visible");
}

#[tokio::test]
async fn tombstones_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();
    let storage: Arc<dyn StorageService> =
        Arc::new(FileStorageService::new(dir.path().to_path_buf()));

    {
        let provider = initialized_provider(Arc::clone(&storage)).await;
        provider
            .upsert_resource("models/gpt-main", &model("gpt-main"), "alice")
            .await
            .unwrap();
        provider.delete_resource("models/gpt-main", "alice").await.unwrap();
    }

    // A fresh engine over the same files, as after a process restart.
    let provider = initialized_provider(storage).await;
    let err = provider
        .get_resources("models/gpt-main", "alice")
        .await
        .unwrap_err();
    assert!(err.is_not_found());

    let err = provider
        .upsert_resource("models/gpt-main", &model("gpt-main"), "alice")
        .await
        .unwrap_err();
    assert!(matches!(err, ProviderError::Conflict(_)));
}

#[tokio::test]
async fn purge_action_frees_the_name_durably() {
    let storage: Arc<dyn StorageService> = Arc::new(MemoryStorageService::new());
    let provider = initialized_provider(Arc::clone(&storage)).await;

    provider
        .upsert_resource("models/gpt-main", &model("gpt-main"), "alice")
        .await
        .unwrap();
    provider.delete_resource("models/gpt-main", "alice").await.unwrap();

    let check = provider
        .execute_action(
            "models/check-name",
            &serde_json::to_string(&ResourceName {
                name: "gpt-main".to_string(),
                resource_type: None,
            })
            .unwrap(),
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(check["status"], "denied");

    provider
        .execute_action("models/gpt-main/purge", "{}", "admin")
        .await
        .unwrap();

    // The name is available again, on this replica and on a fresh one.
    let check = provider
        .execute_action(
            "models/check-name",
            &serde_json::to_string(&ResourceName {
                name: "gpt-main".to_string(),
                resource_type: None,
            })
            .unwrap(),
            "alice",
        )
        .await
        .unwrap();
    assert_eq!(
        serde_json::from_value::<overture_types::NameCheckResult>(check)
            .unwrap()
            .status,
        NameCheckStatus::Allowed
    );

    let restarted = initialized_provider(storage).await;
    let result = restarted
        .upsert_resource("models/gpt-main", &model("gpt-main"), "alice")
        .await
        .unwrap();
    assert!(!result.resource_exists);
}

#[tokio::test]
async fn replicas_converge_through_the_event_feed() {
    let storage: Arc<dyn StorageService> = Arc::new(MemoryStorageService::new());
    let events: Arc<dyn EventService> = Arc::new(InMemoryEventService::new());

    let writer = model_provider(instance(), Arc::clone(&storage))
        .with_events(Arc::clone(&events));
    writer.initialize().await.unwrap();

    let reader = Arc::new(model_provider(instance(), Arc::clone(&storage)));
    reader.initialize().await.unwrap();
    let handles = EventBridge::start(Arc::clone(&reader), Arc::clone(&events));

    writer
        .upsert_resource("models/gpt-main", &model("gpt-main"), "alice")
        .await
        .unwrap();

    let seen = wait_for_model(&reader, "gpt-main").await;
    assert_eq!(seen.base.name, "gpt-main");

    for handle in handles {
        handle.abort();
    }
}

#[tokio::test]
async fn refresh_merges_writes_from_two_replicas() {
    let storage: Arc<dyn StorageService> = Arc::new(MemoryStorageService::new());
    let events: Arc<dyn EventService> = Arc::new(InMemoryEventService::new());

    let first = Arc::new(
        model_provider(instance(), Arc::clone(&storage))
            .with_events(Arc::clone(&events)),
    );
    first.initialize().await.unwrap();
    let first_handles = EventBridge::start(Arc::clone(&first), Arc::clone(&events));

    first
        .upsert_resource("models/alpha", &model("alpha"), "alice")
        .await
        .unwrap();
    first
        .upsert_resource("models/beta", &model("beta"), "alice")
        .await
        .unwrap();

    // A second replica coming up later sees the durable state, then adds
    // its own model.
    let second = Arc::new(
        model_provider(instance(), Arc::clone(&storage))
            .with_events(Arc::clone(&events)),
    );
    second.initialize().await.unwrap();
    let second_handles = EventBridge::start(Arc::clone(&second), Arc::clone(&events));

    second
        .upsert_resource("models/gamma", &model("gamma"), "bob")
        .await
        .unwrap();

    for name in ["alpha", "beta", "gamma"] {
        wait_for_model(&first, name).await;
        wait_for_model(&second, name).await;
    }

    for handle in first_handles.into_iter().chain(second_handles) {
        handle.abort();
    }
}

#[tokio::test]
async fn listing_excludes_tombstoned_resources() {
    let storage: Arc<dyn StorageService> = Arc::new(MemoryStorageService::new());
    let provider = initialized_provider(storage).await;

    provider
        .upsert_resource("models/alpha", &model("alpha"), "alice")
        .await
        .unwrap();
    provider
        .upsert_resource("models/beta", &model("beta"), "alice")
        .await
        .unwrap();
    provider.delete_resource("models/alpha", "alice").await.unwrap();

    let listed = provider.get_resources("models", "alice").await.unwrap();
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["beta"]);
}

#[tokio::test]
async fn upsert_result_distinguishes_create_from_update() {
    let storage: Arc<dyn StorageService> = Arc::new(MemoryStorageService::new());
    let provider = initialized_provider(storage).await;

    let created = provider
        .upsert_resource("models/alpha", &model("alpha"), "alice")
        .await
        .unwrap();
    assert!(!created.resource_exists);

    let updated = provider
        .upsert_resource("models/alpha", &model("alpha"), "bob")
        .await
        .unwrap();
    assert!(updated.resource_exists);
    assert_eq!(created.object_id, updated.object_id);
}

//! End-to-end dispatch tests over a fully assembled client: storage,
//! compute, and realtime capabilities behind a real dispatcher.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use capstan_client::{
    codes, CallOptions, Capability, CapabilityContext, CapabilityError, CapabilityRegistry,
    ClientConfig, ComputeCapability, Dispatcher, MemoryRemoteStore, MemoryStore,
    RealtimeCapability, RedbStore, RemoteStore, Response, StorageCapability,
};

async fn make_client(config: ClientConfig, remote: Option<Arc<dyn RemoteStore>>) -> Dispatcher {
    let registry = CapabilityRegistry::new();
    registry
        .register(StorageCapability::new(Arc::new(MemoryStore::new()), remote))
        .unwrap();
    registry.register(ComputeCapability).unwrap();
    registry.register(RealtimeCapability).unwrap();
    Dispatcher::initialize(registry, config).await.unwrap()
}

fn expect_ok(resp: &Response) -> &Value {
    match resp {
        Response::Ok { data, .. } => data,
        Response::Error { error, .. } => panic!("expected ok envelope, got error {error:?}"),
    }
}

fn expect_error(resp: &Response) -> &capstan_core::ErrorBody {
    match resp {
        Response::Error { error, .. } => error,
        Response::Ok { data, .. } => panic!("expected error envelope, got ok {data:?}"),
    }
}

#[tokio::test]
async fn save_then_get_round_trips() {
    let client = make_client(ClientConfig::default(), None).await;

    let saved = client
        .dispatch("storage.save", json!({"key": "u1", "value": {"n": "a"}}), None)
        .await;
    let data = expect_ok(&saved);
    assert_eq!(data["key"], "u1");
    assert_eq!(data["tier"], "local");
    assert!(data["sizeBytes"].as_u64().unwrap() > 0);

    let fetched = client
        .dispatch("storage.get", json!({"key": "u1"}), None)
        .await;
    assert_eq!(expect_ok(&fetched), &json!({"n": "a"}));
}

#[tokio::test]
async fn get_missing_key_is_retryable_key_not_found() {
    let client = make_client(ClientConfig::default(), None).await;

    let resp = client
        .dispatch("storage.get", json!({"key": "missing"}), None)
        .await;
    let error = expect_error(&resp);
    assert_eq!(error.code, codes::KEY_NOT_FOUND);
    assert!(error.retryable);
}

#[tokio::test]
async fn structural_errors_are_not_retryable() {
    let client = make_client(ClientConfig::default(), None).await;

    let resp = client.dispatch("no-dot-here", Value::Null, None).await;
    let error = expect_error(&resp);
    assert_eq!(error.code, codes::INVALID_ACTION);
    assert!(!error.retryable);

    let resp = client.dispatch("unknown.save", Value::Null, None).await;
    let error = expect_error(&resp);
    assert_eq!(error.code, codes::CAPABILITY_NOT_FOUND);
    assert!(!error.retryable);

    let resp = client.dispatch("storage.compact", Value::Null, None).await;
    let error = expect_error(&resp);
    assert_eq!(error.code, codes::OPERATION_NOT_FOUND);
    assert!(!error.retryable);
}

#[tokio::test]
async fn oversized_record_warns_without_remote_and_tiers_remote_with_it() {
    let mut config = ClientConfig::default();
    config.storage.threshold_bytes = 16;

    // Without a remote tier the record stays local, with a warning.
    let client = make_client(config.clone(), None).await;
    let resp = client
        .dispatch(
            "storage.save",
            json!({"key": "big", "value": "a payload past the threshold"}),
            None,
        )
        .await;
    let data = expect_ok(&resp);
    assert_eq!(data["tier"], "local");
    assert!(!data["warning"].as_str().unwrap().is_empty());

    // With a remote tier the same record goes remote.
    let remote = Arc::new(MemoryRemoteStore::new());
    let client = make_client(config, Some(remote.clone())).await;
    let resp = client
        .dispatch(
            "storage.save",
            json!({"key": "big", "value": "a payload past the threshold"}),
            None,
        )
        .await;
    let data = expect_ok(&resp);
    assert_eq!(data["tier"], "remote");
    assert!(data.get("warning").is_none());
    assert_eq!(remote.len(), 1);
}

#[tokio::test]
async fn delete_is_idempotent_through_the_dispatcher() {
    let client = make_client(ClientConfig::default(), None).await;

    let resp = client
        .dispatch("storage.delete", json!({"key": "never-saved"}), None)
        .await;
    assert_eq!(
        expect_ok(&resp),
        &json!({"deleted": true, "key": "never-saved"})
    );
}

#[tokio::test]
async fn list_returns_local_keys_with_prefix_filter() {
    let client = make_client(ClientConfig::default(), None).await;
    for key in ["user:1", "user:2", "task:9"] {
        client
            .dispatch("storage.save", json!({"key": key, "value": true}), None)
            .await;
    }

    let resp = client
        .dispatch("storage.list", json!({"prefix": "user:"}), None)
        .await;
    assert_eq!(expect_ok(&resp), &json!({"keys": ["user:1", "user:2"]}));
}

#[tokio::test]
async fn placeholder_domains_answer_with_not_implemented() {
    let client = make_client(ClientConfig::default(), None).await;

    let resp = client.dispatch("compute.run", json!({}), None).await;
    let error = expect_error(&resp);
    assert_eq!(error.code, "NOT_IMPLEMENTED");

    let resp = client
        .dispatch("realtime.publish", json!({"topic": "t"}), None)
        .await;
    assert_eq!(expect_error(&resp).code, "NOT_IMPLEMENTED");
}

#[tokio::test(start_paused = true)]
async fn slow_operations_time_out_with_timeout_code() {
    /// Capability whose single operation never settles in time.
    struct SlowCapability;

    #[async_trait]
    impl Capability for SlowCapability {
        fn domain(&self) -> &'static str {
            "slow"
        }
        fn operations(&self) -> &'static [&'static str] {
            &["wait"]
        }
        async fn init(&self, _ctx: &CapabilityContext) -> anyhow::Result<()> {
            Ok(())
        }
        async fn invoke(&self, _operation: &str, _payload: Value) -> Result<Value, CapabilityError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(Value::Null)
        }
    }

    let registry = CapabilityRegistry::new();
    registry.register(SlowCapability).unwrap();
    let client = Dispatcher::initialize(registry, ClientConfig::default())
        .await
        .unwrap();

    let options = CallOptions {
        timeout_millis: 50,
        max_retries: 0,
    };
    let resp = client.dispatch("slow.wait", Value::Null, Some(options)).await;
    let error = expect_error(&resp);
    assert_eq!(error.code, codes::TIMEOUT);
    assert!(error.retryable);
}

#[tokio::test]
async fn redb_backed_client_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let local = Arc::new(RedbStore::open(dir.path().join("records.redb")).unwrap());

    let registry = CapabilityRegistry::new();
    registry
        .register(StorageCapability::new(local, None))
        .unwrap();
    let client = Dispatcher::initialize(registry, ClientConfig::default())
        .await
        .unwrap();

    let value = json!({"nested": {"list": [1, 2, 3], "flag": true}});
    let saved = client
        .dispatch("storage.save", json!({"key": "doc", "value": value}), None)
        .await;
    assert!(saved.is_ok());

    let fetched = client
        .dispatch("storage.get", json!({"key": "doc"}), None)
        .await;
    assert_eq!(expect_ok(&fetched), &value);
}

#[tokio::test]
async fn envelope_serializes_to_the_documented_wire_shape() {
    let client = make_client(ClientConfig::default(), None).await;

    let resp = client
        .dispatch("storage.get", json!({"key": "absent"}), None)
        .await;
    let encoded = serde_json::to_value(&resp).unwrap();

    assert_eq!(encoded["status"], "error");
    assert_eq!(encoded["error"]["code"], "KEY_NOT_FOUND");
    assert_eq!(encoded["error"]["retryable"], true);
    assert!(encoded["id"].as_str().unwrap().len() > 10);
    assert!(encoded.get("data").is_none());

    let resp = client
        .dispatch("storage.save", json!({"key": "k", "value": 1}), None)
        .await;
    let encoded = serde_json::to_value(&resp).unwrap();
    assert_eq!(encoded["status"], "ok");
    assert!(encoded["durationMillis"].is_u64());
    assert!(encoded.get("error").is_none());
}

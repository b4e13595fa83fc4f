/*
    BrokerService Integration Tests

    Drives the orchestrator against real and stubbed collaborators:
    - Authenticate over real HS256 credentials
    - CreateRoom validation, store failures and fleet-wide id uniqueness
    - SelectQos validation and the admission boundary
*/

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use roombroker_core::registry::store::{CoordinationStore, MemoryStore, StoreError};
use roombroker_core::{
    mint_credential, AdmissionPolicy, AuthOutcome, BrokerService, CreateRoomOutcome,
    CredentialValidator, Decision, QosOutcome, QosPolicy, RegistryError, RoomId, RoomIdGenerator,
    RoomRegistrar, RoomRegistry,
};

const SECRET: &str = "fleet-secret";

fn secret() -> SecretString {
    SecretString::new(SECRET.to_string())
}

/// Registrar that records calls and never reaches a store
#[derive(Default)]
struct SpyRegistrar {
    calls: AtomicUsize,
}

#[async_trait]
impl RoomRegistrar for SpyRegistrar {
    async fn register(
        &self,
        _owner_id: &str,
        _name: &str,
        _deadline: Option<Duration>,
    ) -> Result<RoomId, RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(RoomId("spy-room".to_string()))
    }
}

/// Policy that records calls and accepts everything
#[derive(Default)]
struct SpyPolicy {
    calls: AtomicUsize,
}

impl AdmissionPolicy for SpyPolicy {
    fn admit(&self, _bandwidth_kb: i32, _latency_ms: i32) -> Decision {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Decision::accept()
    }
}

/// Store whose writes always fail
struct UnreachableStore;

#[async_trait]
impl CoordinationStore for UnreachableStore {
    async fn put_if_absent(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Unavailable("Connection refused (os error 111)".to_string()))
    }

    async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("Connection refused (os error 111)".to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("Connection refused (os error 111)".to_string()))
    }
}

fn broker_with_store(store: Arc<dyn CoordinationStore>, instance: &str) -> BrokerService {
    BrokerService::new(
        Arc::new(CredentialValidator::new(&secret())),
        Arc::new(RoomRegistry::new(store, RoomIdGenerator::new(instance))),
        Arc::new(QosPolicy::default()),
    )
}

fn broker_with_spies(registrar: Arc<SpyRegistrar>, policy: Arc<SpyPolicy>) -> BrokerService {
    BrokerService::new(
        Arc::new(CredentialValidator::new(&secret())),
        registrar,
        policy,
    )
}

#[tokio::test]
async fn test_authenticate_with_fleet_secret() {
    let broker = broker_with_store(Arc::new(MemoryStore::new()), "a");
    let token = mint_credential(&secret(), "u1", None).unwrap();

    let outcome = broker.authenticate(&token);
    assert_eq!(
        outcome,
        AuthOutcome::Valid {
            user_id: "u1".to_string()
        }
    );
    assert!(outcome.is_valid());
    assert_eq!(outcome.error(), "");
}

#[tokio::test]
async fn test_authenticate_with_wrong_secret() {
    let broker = broker_with_store(Arc::new(MemoryStore::new()), "a");
    let token = mint_credential(&SecretString::new("intruder".to_string()), "u1", None).unwrap();

    let outcome = broker.authenticate(&token);
    assert!(!outcome.is_valid());
    assert_eq!(outcome.user_id(), "");
    assert_eq!(outcome.error(), "invalid token");
}

#[tokio::test]
async fn test_wrong_secret_beats_missing_claim() {
    let broker = broker_with_store(Arc::new(MemoryStore::new()), "a");
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &serde_json::json!({ "sub": "u1" }),
        &jsonwebtoken::EncodingKey::from_secret(b"intruder"),
    )
    .unwrap();

    let outcome = broker.authenticate(&token);
    assert!(!outcome.is_valid());
    assert_eq!(outcome.error(), "invalid token");
}

#[tokio::test]
async fn test_create_room_against_healthy_store() {
    let store = MemoryStore::new();
    let broker = broker_with_store(Arc::new(store.clone()), "a");

    let outcome = broker.create_room("u1", "lobby", None).await;
    assert!(matches!(outcome, CreateRoomOutcome::Created { .. }));
    assert!(!outcome.room_id().is_empty());
    assert_eq!(outcome.error(), "");
    assert_eq!(store.len(), 1);
}

#[tokio::test]
async fn test_create_room_requires_both_fields() {
    let registrar = Arc::new(SpyRegistrar::default());
    let broker = broker_with_spies(registrar.clone(), Arc::new(SpyPolicy::default()));

    for (user_id, room_name) in [("", "lobby"), ("u1", ""), ("", "")] {
        let outcome = broker.create_room(user_id, room_name, None).await;
        assert_eq!(outcome.error(), "userId and roomName required");
        assert_eq!(outcome.room_id(), "");
    }
    assert_eq!(registrar.calls.load(Ordering::SeqCst), 0);

    broker.create_room("u1", "lobby", None).await;
    assert_eq!(registrar.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unreachable_store_keeps_serving() {
    let broker = broker_with_store(Arc::new(UnreachableStore), "a");

    let outcome = broker.create_room("u1", "lobby", None).await;
    assert_eq!(outcome.room_id(), "");
    assert_eq!(
        outcome.error(),
        "store unavailable: Connection refused (os error 111)"
    );

    // Later calls still get answers
    let token = mint_credential(&secret(), "u2", None).unwrap();
    assert!(broker.authenticate(&token).is_valid());
    assert!(broker.select_qos("room-1", 2000, 20).accepted());
    assert!(!broker.create_room("u2", "again", None).await.error().is_empty());
}

#[tokio::test]
async fn test_select_qos_requires_room_id() {
    let policy = Arc::new(SpyPolicy::default());
    let broker = broker_with_spies(Arc::new(SpyRegistrar::default()), policy.clone());

    let outcome = broker.select_qos("", 2000, 20);
    assert_eq!(
        outcome,
        QosOutcome::Invalid {
            reason: "roomId required".to_string()
        }
    );
    assert!(!outcome.accepted());
    assert_eq!(policy.calls.load(Ordering::SeqCst), 0);

    broker.select_qos("room-1", 2000, 20);
    assert_eq!(policy.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_select_qos_scenarios() {
    let broker = broker_with_store(Arc::new(MemoryStore::new()), "a");

    let rejected = broker.select_qos("room-1", 500, 50);
    assert!(!rejected.accepted());
    assert_eq!(rejected.error(), "QoS parameters out of policy");

    let accepted = broker.select_qos("room-1", 2000, 20);
    assert!(accepted.accepted());
    assert_eq!(accepted.error(), "");

    assert!(broker.select_qos("room-1", 1000, 100).accepted());
    assert!(!broker.select_qos("room-1", 1000, 101).accepted());
    assert!(!broker.select_qos("room-1", 999, 100).accepted());
}

#[tokio::test]
async fn test_select_qos_ignores_whether_room_exists() {
    let broker = broker_with_store(Arc::new(MemoryStore::new()), "a");
    assert!(broker.select_qos("never-registered", 2000, 20).accepted());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_create_room_ids_unique() {
    // Two "replicas" sharing one store, hammered in parallel
    let store: Arc<dyn CoordinationStore> = Arc::new(MemoryStore::new());
    let replicas = [
        broker_with_store(store.clone(), "replica1"),
        broker_with_store(store.clone(), "replica2"),
    ];

    let mut handles = Vec::new();
    for task in 0..128 {
        let broker = replicas[task % 2].clone();
        handles.push(tokio::spawn(async move {
            let mut ids = Vec::new();
            for n in 0..16 {
                let outcome = broker
                    .create_room(&format!("user{}", task), &format!("room{}", n), None)
                    .await;
                assert_eq!(outcome.error(), "");
                ids.push(outcome.room_id().to_string());
            }
            ids
        }));
    }

    let ids: Vec<String> = futures::future::join_all(handles)
        .await
        .into_iter()
        .flat_map(|ids| ids.unwrap())
        .collect();

    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(ids.len(), 128 * 16);
    assert_eq!(unique.len(), ids.len());
}

#[tokio::test(start_paused = true)]
async fn test_create_room_deadline_reports_failure() {
    struct SlowStore;

    #[async_trait]
    impl CoordinationStore for SlowStore {
        async fn put_if_absent(&self, _: &str, _: &str) -> Result<bool, StoreError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(true)
        }

        async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
            Ok(None)
        }

        async fn ping(&self) -> Result<(), StoreError> {
            Ok(())
        }
    }

    let broker = broker_with_store(Arc::new(SlowStore), "a");
    let outcome = broker
        .create_room("u1", "lobby", Some(Duration::from_millis(100)))
        .await;
    assert_eq!(outcome.room_id(), "");
    assert!(outcome.error().contains("timed out"));
}

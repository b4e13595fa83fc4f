//! End-to-end tests over a real tonic server on an ephemeral port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tonic::transport::Channel;
use tonic::Request;

use roombroker_api::proto::room_broker_client::RoomBrokerClient;
use roombroker_api::proto::{AuthenticateRequest, CreateRoomRequest, SelectQosRequest};
use roombroker_api::{broker_over, build_broker, serve, StartupError};
use roombroker_core::config::Config;
use roombroker_core::registry::store::{CoordinationStore, StoreError};
use roombroker_core::mint_credential;

const SECRET: &str = "e2e-secret";

struct TestServer {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl TestServer {
    async fn start(store_url: &str) -> Self {
        let vars = [
            ("ROOMBROKER_STORE_URL", store_url.to_string()),
            ("ROOMBROKER_JWT_SECRET", SECRET.to_string()),
            ("ROOMBROKER_INSTANCE_ID", "e2e".to_string()),
        ];
        let config = Config::from_lookup(|name| {
            vars.iter()
                .find(|(key, _)| *key == name)
                .map(|(_, value)| value.clone())
        })
        .unwrap();

        let broker = build_broker(&config).await.unwrap();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            serve(listener, broker, async {
                let _ = rx.await;
            })
            .await
            .unwrap();
        });

        Self {
            addr,
            shutdown: Some(tx),
            handle,
        }
    }

    async fn client(&self) -> RoomBrokerClient<Channel> {
        RoomBrokerClient::connect(format!("http://{}", self.addr))
            .await
            .unwrap()
    }

    async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        let _ = self.handle.await;
    }
}

fn token(secret: &str, user_id: &str) -> String {
    mint_credential(&SecretString::new(secret.to_string()), user_id, None).unwrap()
}

#[tokio::test]
async fn test_authenticate_roundtrip() {
    let server = TestServer::start("memory://").await;
    let mut client = server.client().await;

    let response = client
        .authenticate(AuthenticateRequest {
            token: token(SECRET, "u1"),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(response.valid);
    assert_eq!(response.user_id, "u1");
    assert_eq!(response.error, "");

    let response = client
        .authenticate(AuthenticateRequest {
            token: token("wrong-secret", "u1"),
        })
        .await
        .unwrap()
        .into_inner();
    assert!(!response.valid);
    assert_eq!(response.error, "invalid token");

    server.stop().await;
}

#[tokio::test]
async fn test_create_room_roundtrip() {
    let server = TestServer::start("memory://").await;
    let mut client = server.client().await;

    let mut request = Request::new(CreateRoomRequest {
        user_id: "u1".to_string(),
        room_name: "lobby".to_string(),
    });
    request.set_timeout(Duration::from_secs(2));
    let created = client.create_room(request).await.unwrap().into_inner();
    assert!(!created.room_id.is_empty());
    assert_eq!(created.error, "");

    let second = client
        .create_room(CreateRoomRequest {
            user_id: "u1".to_string(),
            room_name: "lobby".to_string(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_ne!(second.room_id, created.room_id);

    let missing = client
        .create_room(CreateRoomRequest {
            user_id: String::new(),
            room_name: "lobby".to_string(),
        })
        .await
        .unwrap()
        .into_inner();
    assert_eq!(missing.room_id, "");
    assert_eq!(missing.error, "userId and roomName required");

    server.stop().await;
}

#[tokio::test]
async fn test_select_qos_roundtrip() {
    let server = TestServer::start("memory://").await;
    let mut client = server.client().await;

    let cases = [
        ("room-1", 500, 50, false, "QoS parameters out of policy"),
        ("room-1", 2000, 20, true, ""),
        ("room-1", 1000, 100, true, ""),
        ("room-1", 1000, 101, false, "QoS parameters out of policy"),
        ("room-1", 999, 100, false, "QoS parameters out of policy"),
        ("", 2000, 20, false, "roomId required"),
    ];

    for (room_id, bandwidth_kb, latency_ms, accepted, error) in cases {
        let response = client
            .select_qos(SelectQosRequest {
                room_id: room_id.to_string(),
                bandwidth_kb,
                latency_ms,
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(response.accepted, accepted, "{room_id} {bandwidth_kb} {latency_ms}");
        assert_eq!(response.error, error);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_startup_rejects_unsupported_store() {
    let mut config = Config::default();
    config.store.url = Some("etcd://127.0.0.1:2379".to_string());
    config.credential.jwt_secret = Some(SecretString::new(SECRET.to_string()));

    assert!(build_broker(&config).await.is_err());
}

/// Store that opened fine but stopped answering
struct DeadStore;

#[async_trait]
impl CoordinationStore for DeadStore {
    async fn put_if_absent(&self, _: &str, _: &str) -> Result<bool, StoreError> {
        Ok(true)
    }

    async fn get(&self, _: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("Connection refused (os error 111)".to_string()))
    }
}

#[tokio::test]
async fn test_startup_fails_when_store_does_not_answer() {
    let mut config = Config::default();
    config.credential.jwt_secret = Some(SecretString::new(SECRET.to_string()));

    let result = broker_over(&config, Arc::new(DeadStore)).await;
    assert!(matches!(
        result,
        Err(StartupError::Store(StoreError::Unavailable(_)))
    ));
}

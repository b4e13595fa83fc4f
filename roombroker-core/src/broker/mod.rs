//! Broker orchestration
//!
//! [`BrokerService`] maps each protocol operation onto exactly one
//! collaborator and shapes the result. Business-level failures come back as
//! outcome values, never as errors.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::credential::{AuthFailure, CredentialValidator, Identity};
use crate::qos::{Decision, QosPolicy};
use crate::registry::{CoordinationStore, RegistryError, RoomId, RoomRegistry};

mod outcome;

pub use outcome::{AuthOutcome, CreateRoomOutcome, QosOutcome};

/// Returned by CreateRoom when either field is empty
pub const ROOM_FIELDS_REQUIRED: &str = "userId and roomName required";

/// Returned by SelectQos when the room id is empty
pub const ROOM_ID_REQUIRED: &str = "roomId required";

/// Turns a bearer credential into an identity
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, credential: &str) -> Result<Identity, AuthFailure>;
}

/// Persists new rooms
#[async_trait]
pub trait RoomRegistrar: Send + Sync {
    async fn register(
        &self,
        owner_id: &str,
        name: &str,
        deadline: Option<Duration>,
    ) -> Result<RoomId, RegistryError>;
}

/// Admission decision over a QoS proposal
pub trait AdmissionPolicy: Send + Sync {
    fn admit(&self, bandwidth_kb: i32, latency_ms: i32) -> Decision;
}

impl IdentityVerifier for CredentialValidator {
    fn verify(&self, credential: &str) -> Result<Identity, AuthFailure> {
        self.validate(credential)
    }
}

#[async_trait]
impl RoomRegistrar for RoomRegistry {
    async fn register(
        &self,
        owner_id: &str,
        name: &str,
        deadline: Option<Duration>,
    ) -> Result<RoomId, RegistryError> {
        self.create_room(owner_id, name, deadline).await
    }
}

impl AdmissionPolicy for QosPolicy {
    fn admit(&self, bandwidth_kb: i32, latency_ms: i32) -> Decision {
        self.evaluate(bandwidth_kb, latency_ms)
    }
}

/// Stateless orchestrator behind the three broker operations
#[derive(Clone)]
pub struct BrokerService {
    verifier: Arc<dyn IdentityVerifier>,
    registrar: Arc<dyn RoomRegistrar>,
    policy: Arc<dyn AdmissionPolicy>,
}

impl BrokerService {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        registrar: Arc<dyn RoomRegistrar>,
        policy: Arc<dyn AdmissionPolicy>,
    ) -> Self {
        Self {
            verifier,
            registrar,
            policy,
        }
    }

    /// Wire the production collaborators from configuration
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CoordinationStore>,
    ) -> Result<Self, ConfigError> {
        let validator =
            CredentialValidator::with_expiry(config.jwt_secret()?, config.credential.require_expiry);
        let registry = RoomRegistry::from_config(store, config);
        let policy = QosPolicy::from(&config.qos);

        Ok(Self::new(
            Arc::new(validator),
            Arc::new(registry),
            Arc::new(policy),
        ))
    }

    pub fn authenticate(&self, token: &str) -> AuthOutcome {
        match self.verifier.verify(token) {
            Ok(identity) => {
                counter!("broker.authenticate.total", "result" => "valid").increment(1);
                debug!(user_id = %identity.user_id, "credential accepted");
                AuthOutcome::Valid {
                    user_id: identity.user_id,
                }
            }
            Err(failure) => {
                counter!("broker.authenticate.total", "result" => "invalid").increment(1);
                debug!(reason = %failure, "credential refused");
                AuthOutcome::Invalid {
                    reason: failure.to_string(),
                }
            }
        }
    }

    pub async fn create_room(
        &self,
        user_id: &str,
        room_name: &str,
        deadline: Option<Duration>,
    ) -> CreateRoomOutcome {
        if user_id.is_empty() || room_name.is_empty() {
            return CreateRoomOutcome::Failed {
                reason: ROOM_FIELDS_REQUIRED.to_string(),
            };
        }

        match self.registrar.register(user_id, room_name, deadline).await {
            Ok(room_id) => {
                counter!("broker.rooms.created").increment(1);
                info!(user_id, room_id = %room_id, "room created");
                CreateRoomOutcome::Created { room_id }
            }
            Err(e) => {
                counter!("broker.rooms.failed").increment(1);
                CreateRoomOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    /// Admission is room-agnostic: the room id is checked for presence only
    pub fn select_qos(&self, room_id: &str, bandwidth_kb: i32, latency_ms: i32) -> QosOutcome {
        if room_id.is_empty() {
            return QosOutcome::Invalid {
                reason: ROOM_ID_REQUIRED.to_string(),
            };
        }

        let decision = self.policy.admit(bandwidth_kb, latency_ms);
        let accepted = if decision.accepted { "true" } else { "false" };
        counter!("broker.qos.decisions", "accepted" => accepted).increment(1);
        debug!(room_id, bandwidth_kb, latency_ms, accepted = decision.accepted, "qos evaluated");
        QosOutcome::Decided(decision)
    }
}

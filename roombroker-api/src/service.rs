use tonic::{Request, Response, Status};

use roombroker_core::{AuthOutcome, BrokerService, CreateRoomOutcome, QosOutcome};

use crate::deadline;
use crate::proto::*;

/// tonic adapter over [`BrokerService`]
///
/// Every handler answers `Ok`; rejections are carried in the response body.
pub struct RoomBrokerService {
    broker: BrokerService,
}

impl RoomBrokerService {
    pub fn new(broker: BrokerService) -> Self {
        Self { broker }
    }
}

impl From<AuthOutcome> for AuthenticateResponse {
    fn from(outcome: AuthOutcome) -> Self {
        match outcome {
            AuthOutcome::Valid { user_id } => AuthenticateResponse {
                valid: true,
                user_id,
                error: String::new(),
            },
            AuthOutcome::Invalid { reason } => AuthenticateResponse {
                valid: false,
                user_id: String::new(),
                error: reason,
            },
        }
    }
}

impl From<CreateRoomOutcome> for CreateRoomResponse {
    fn from(outcome: CreateRoomOutcome) -> Self {
        match outcome {
            CreateRoomOutcome::Created { room_id } => CreateRoomResponse {
                room_id: room_id.into_string(),
                error: String::new(),
            },
            CreateRoomOutcome::Failed { reason } => CreateRoomResponse {
                room_id: String::new(),
                error: reason,
            },
        }
    }
}

impl From<QosOutcome> for SelectQosResponse {
    fn from(outcome: QosOutcome) -> Self {
        SelectQosResponse {
            accepted: outcome.accepted(),
            error: outcome.error().to_string(),
        }
    }
}

#[tonic::async_trait]
impl room_broker_server::RoomBroker for RoomBrokerService {
    async fn authenticate(
        &self,
        request: Request<AuthenticateRequest>,
    ) -> Result<Response<AuthenticateResponse>, Status> {
        let req = request.into_inner();

        let outcome = self.broker.authenticate(&req.token);

        Ok(Response::new(outcome.into()))
    }

    async fn create_room(
        &self,
        request: Request<CreateRoomRequest>,
    ) -> Result<Response<CreateRoomResponse>, Status> {
        let deadline = deadline::from_metadata(request.metadata());
        let req = request.into_inner();

        let outcome = self
            .broker
            .create_room(&req.user_id, &req.room_name, deadline)
            .await;

        Ok(Response::new(outcome.into()))
    }

    async fn select_qos(
        &self,
        request: Request<SelectQosRequest>,
    ) -> Result<Response<SelectQosResponse>, Status> {
        let req = request.into_inner();

        let outcome = self
            .broker
            .select_qos(&req.room_id, req.bandwidth_kb, req.latency_ms);

        Ok(Response::new(outcome.into()))
    }
}

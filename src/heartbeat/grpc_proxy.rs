use crate::api::TabletId;
use crate::grpc::grpc_coordinator_client::GrpcCoordinatorClient;
use crate::grpc::ProtoDeleteNotServingTabletReq;
use crate::heartbeat::convert::{request_to_proto, response_from_proto};
use crate::heartbeat::{CoordinatorProxy, HeartbeatError, HeartbeatRequest, HeartbeatResponse};
use tonic::transport::{Channel, Endpoint};

pub struct GrpcCoordinatorProxy {
    logger: slog::Logger,
    inner: GrpcCoordinatorClient<Channel>,
}

impl GrpcCoordinatorProxy {
    pub async fn connect(logger: slog::Logger, addr: &str) -> Result<Self, HeartbeatError> {
        let url = format!("http://{}", addr);
        let endpoint = Endpoint::from_shared(url.clone()).map_err(|_| HeartbeatError::InvalidAddress(url.clone()))?;
        slog::info!(logger, "Connecting to coordinator {} ...", url);
        let connection = endpoint.connect().await?;

        Ok(GrpcCoordinatorProxy {
            logger,
            inner: GrpcCoordinatorClient::new(connection),
        })
    }
}

#[async_trait::async_trait]
impl CoordinatorProxy for GrpcCoordinatorProxy {
    async fn heartbeat(&self, request: HeartbeatRequest) -> Result<HeartbeatResponse, HeartbeatError> {
        let rpc_request = request_to_proto(&request);
        slog::debug!(self.logger, "ClientWire - {:?}", rpc_request);
        // Tonic clients need `&mut`; clones share the channel.
        let rpc_reply = self.inner.clone().heartbeat(rpc_request).await?.into_inner();
        slog::debug!(self.logger, "ClientWire - {:?}", rpc_reply);
        Ok(response_from_proto(rpc_reply))
    }

    async fn delete_not_serving_tablet(&self, tablet_id: &TabletId) -> Result<(), HeartbeatError> {
        let rpc_request = ProtoDeleteNotServingTabletReq {
            tablet_id: tablet_id.as_str().to_string(),
        };
        let rpc_reply = self
            .inner
            .clone()
            .delete_not_serving_tablet(rpc_request)
            .await?
            .into_inner();
        if rpc_reply.error.is_empty() {
            Ok(())
        } else {
            Err(HeartbeatError::Rejected(rpc_reply.error))
        }
    }
}

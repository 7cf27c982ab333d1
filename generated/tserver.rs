#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoOpId {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(uint64, tag = "2")]
    pub index: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoPartition {
    #[prost(bytes = "vec", tag = "1")]
    pub partition_key_start: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub partition_key_end: ::prost::alloc::vec::Vec<u8>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoKeyBounds {
    #[prost(bytes = "vec", tag = "1")]
    pub lower: ::prost::alloc::vec::Vec<u8>,
    #[prost(bytes = "vec", tag = "2")]
    pub upper: ::prost::alloc::vec::Vec<u8>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoSuperBlock {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub table_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub table_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub partition: ::core::option::Option<ProtoPartition>,
    #[prost(message, optional, tag = "5")]
    pub key_bounds: ::core::option::Option<ProtoKeyBounds>,
    #[prost(enumeration = "ProtoTabletDataState", tag = "6")]
    pub data_state: i32,
    #[prost(string, tag = "7")]
    pub data_root_dir: ::prost::alloc::string::String,
    #[prost(string, tag = "8")]
    pub wal_root_dir: ::prost::alloc::string::String,
    #[prost(bool, tag = "9")]
    pub hidden: bool,
    #[prost(string, tag = "10")]
    pub split_parent_tablet_id: ::prost::alloc::string::String,
    #[prost(string, repeated, tag = "11")]
    pub split_child_tablet_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(message, optional, tag = "12")]
    pub split_op_id: ::core::option::Option<ProtoOpId>,
    /// Only set once the replica has been deleted or tombstoned.
    #[prost(message, optional, tag = "13")]
    pub tombstone_last_logged_op_id: ::core::option::Option<ProtoOpId>,
    #[prost(bool, tag = "14")]
    pub post_split_compaction_pending: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoRaftPeer {
    #[prost(string, tag = "1")]
    pub permanent_uuid: ::prost::alloc::string::String,
    #[prost(enumeration = "ProtoMemberType", tag = "2")]
    pub member_type: i32,
    #[prost(string, tag = "3")]
    pub host: ::prost::alloc::string::String,
    #[prost(uint32, tag = "4")]
    pub port: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoRaftConfig {
    /// -1 when the config has never been committed through the log.
    #[prost(int64, tag = "1")]
    pub opid_index: i64,
    #[prost(message, repeated, tag = "2")]
    pub peers: ::prost::alloc::vec::Vec<ProtoRaftPeer>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoConsensusMetadata {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub peer_uuid: ::prost::alloc::string::String,
    #[prost(uint64, tag = "3")]
    pub current_term: u64,
    #[prost(message, optional, tag = "4")]
    pub committed_config: ::core::option::Option<ProtoRaftConfig>,
    #[prost(string, tag = "5")]
    pub split_parent_tablet_id: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoLogEntry {
    #[prost(uint64, tag = "1")]
    pub term: u64,
    #[prost(uint64, tag = "2")]
    pub index: u64,
    #[prost(bytes = "vec", tag = "3")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoConsensusState {
    #[prost(uint64, tag = "1")]
    pub current_term: u64,
    #[prost(string, tag = "2")]
    pub leader_uuid: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "3")]
    pub config: ::core::option::Option<ProtoRaftConfig>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoReportedTablet {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    #[prost(enumeration = "ProtoRuntimeState", tag = "2")]
    pub state: i32,
    #[prost(enumeration = "ProtoTabletDataState", tag = "3")]
    pub data_state: i32,
    #[prost(message, optional, tag = "4")]
    pub committed_consensus_state: ::core::option::Option<ProtoConsensusState>,
    #[prost(string, tag = "5")]
    pub error: ::prost::alloc::string::String,
    #[prost(bool, tag = "6")]
    pub should_disable_lb_move: bool,
    #[prost(string, tag = "7")]
    pub fs_data_dir: ::prost::alloc::string::String,
    #[prost(bool, tag = "8")]
    pub is_hidden: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoTabletReport {
    #[prost(bool, tag = "1")]
    pub is_incremental: bool,
    #[prost(message, repeated, tag = "2")]
    pub updated_tablets: ::prost::alloc::vec::Vec<ProtoReportedTablet>,
    #[prost(string, repeated, tag = "3")]
    pub removed_tablet_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
    #[prost(uint64, tag = "4")]
    pub sequence_number: u64,
    #[prost(uint32, tag = "5")]
    pub remaining_tablet_count: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoTabletReportUpdates {
    #[prost(uint64, tag = "1")]
    pub sequence_number: u64,
    #[prost(string, repeated, tag = "2")]
    pub tablet_ids: ::prost::alloc::vec::Vec<::prost::alloc::string::String>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoServerRegistration {
    #[prost(string, tag = "1")]
    pub host: ::prost::alloc::string::String,
    #[prost(uint32, tag = "2")]
    pub port: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoHeartbeatReq {
    #[prost(string, tag = "1")]
    pub ts_uuid: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "2")]
    pub registration: ::core::option::Option<ProtoServerRegistration>,
    #[prost(message, optional, tag = "3")]
    pub tablet_report: ::core::option::Option<ProtoTabletReport>,
    #[prost(uint32, tag = "4")]
    pub num_live_tablets: u32,
    #[prost(uint32, tag = "5")]
    pub leader_count: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoHeartbeatResp {
    #[prost(bool, tag = "1")]
    pub leader_master: bool,
    #[prost(bool, tag = "2")]
    pub needs_reregister: bool,
    #[prost(bool, tag = "3")]
    pub needs_full_tablet_report: bool,
    #[prost(message, optional, tag = "4")]
    pub tablet_report: ::core::option::Option<ProtoTabletReportUpdates>,
    #[prost(uint32, tag = "5")]
    pub tablet_report_limit: u32,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoDeleteNotServingTabletReq {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoDeleteNotServingTabletResp {
    #[prost(string, tag = "1")]
    pub error: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoTabletServerError {
    #[prost(enumeration = "ProtoErrorCode", tag = "1")]
    pub code: i32,
    #[prost(string, tag = "2")]
    pub message: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoCreateTabletReq {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub table_id: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub table_name: ::prost::alloc::string::String,
    #[prost(message, optional, tag = "4")]
    pub partition: ::core::option::Option<ProtoPartition>,
    #[prost(message, optional, tag = "5")]
    pub config: ::core::option::Option<ProtoRaftConfig>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoCreateTabletResp {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoTabletServerError>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoDeleteTabletReq {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    #[prost(enumeration = "ProtoTabletDataState", tag = "2")]
    pub delete_type: i32,
    /// proto3 has no presence for scalars, so presence is carried explicitly.
    #[prost(bool, tag = "3")]
    pub has_cas_config_opid_index: bool,
    #[prost(int64, tag = "4")]
    pub cas_config_opid_index_less_or_equal: i64,
    #[prost(bool, tag = "5")]
    pub hide_only: bool,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoDeleteTabletResp {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoTabletServerError>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoStartRemoteBootstrapReq {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub bootstrap_peer_uuid: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub source_private_addr: ::prost::alloc::string::String,
    #[prost(string, tag = "4")]
    pub source_broadcast_addr: ::prost::alloc::string::String,
    #[prost(uint64, tag = "5")]
    pub caller_term: u64,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoStartRemoteBootstrapResp {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoTabletServerError>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoFetchTabletFilesReq {
    #[prost(string, tag = "1")]
    pub tablet_id: ::prost::alloc::string::String,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoTabletFile {
    /// false for data files, true for log segments.
    #[prost(bool, tag = "1")]
    pub is_wal: bool,
    #[prost(string, tag = "2")]
    pub relative_path: ::prost::alloc::string::String,
    #[prost(bytes = "vec", tag = "3")]
    pub data: ::prost::alloc::vec::Vec<u8>,
}
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ProtoFetchTabletFilesResp {
    #[prost(message, optional, tag = "1")]
    pub error: ::core::option::Option<ProtoTabletServerError>,
    #[prost(message, optional, tag = "2")]
    pub superblock: ::core::option::Option<ProtoSuperBlock>,
    #[prost(message, optional, tag = "3")]
    pub consensus_metadata: ::core::option::Option<ProtoConsensusMetadata>,
    #[prost(message, repeated, tag = "4")]
    pub files: ::prost::alloc::vec::Vec<ProtoTabletFile>,
}
// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoTabletDataState {
    TabletDataUnknown = 0,
    TabletDataInitStarted = 1,
    TabletDataCopying = 2,
    TabletDataReady = 3,
    TabletDataSplitCompleted = 4,
    TabletDataTombstoned = 5,
    TabletDataDeleted = 6,
}
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoMemberType {
    MemberTypeUnknown = 0,
    Voter = 1,
    Observer = 2,
    PreVoter = 3,
    PreObserver = 4,
}
// ---------------------------------------------------------------------------
// Coordinator heartbeats
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoRuntimeState {
    NotStarted = 0,
    Bootstrapping = 1,
    Running = 2,
    Failed = 3,
    Shutdown = 4,
}
// ---------------------------------------------------------------------------
// Tablet administration
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum ProtoErrorCode {
    UnknownError = 0,
    TabletNotFound = 1,
    TabletNotRunning = 2,
    CasFailed = 3,
    IllegalState = 4,
    AlreadyPresent = 5,
    InvalidArgument = 6,
    ShutdownInProgress = 7,
}
#[doc = r" Generated client implementations."]
pub mod grpc_coordinator_client {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    pub struct GrpcCoordinatorClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl GrpcCoordinatorClient<tonic::transport::Channel> {
        #[doc = r" Attempt to create a new client by connecting to a given endpoint."]
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: std::convert::TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> GrpcCoordinatorClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::ResponseBody: Body + HttpBody + Send + 'static,
        T::Error: Into<StdError>,
        <T::ResponseBody as HttpBody>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = tonic::client::Grpc::with_interceptor(inner, interceptor);
            Self { inner }
        }
        pub async fn heartbeat(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoHeartbeatReq>,
        ) -> Result<tonic::Response<super::ProtoHeartbeatResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static("/tserver.GrpcCoordinator/Heartbeat");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn delete_not_serving_tablet(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoDeleteNotServingTabletReq>,
        ) -> Result<tonic::Response<super::ProtoDeleteNotServingTabletResp>, tonic::Status>
        {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/tserver.GrpcCoordinator/DeleteNotServingTablet",
            );
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
    impl<T: Clone> Clone for GrpcCoordinatorClient<T> {
        fn clone(&self) -> Self {
            Self {
                inner: self.inner.clone(),
            }
        }
    }
    impl<T> std::fmt::Debug for GrpcCoordinatorClient<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "GrpcCoordinatorClient {{ ... }}")
        }
    }
}
#[doc = r" Generated client implementations."]
pub mod grpc_tablet_admin_client {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    pub struct GrpcTabletAdminClient<T> {
        inner: tonic::client::Grpc<T>,
    }
    impl GrpcTabletAdminClient<tonic::transport::Channel> {
        #[doc = r" Attempt to create a new client by connecting to a given endpoint."]
        pub async fn connect<D>(dst: D) -> Result<Self, tonic::transport::Error>
        where
            D: std::convert::TryInto<tonic::transport::Endpoint>,
            D::Error: Into<StdError>,
        {
            let conn = tonic::transport::Endpoint::new(dst)?.connect().await?;
            Ok(Self::new(conn))
        }
    }
    impl<T> GrpcTabletAdminClient<T>
    where
        T: tonic::client::GrpcService<tonic::body::BoxBody>,
        T::ResponseBody: Body + HttpBody + Send + 'static,
        T::Error: Into<StdError>,
        <T::ResponseBody as HttpBody>::Error: Into<StdError> + Send,
    {
        pub fn new(inner: T) -> Self {
            let inner = tonic::client::Grpc::new(inner);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = tonic::client::Grpc::with_interceptor(inner, interceptor);
            Self { inner }
        }
        pub async fn create_tablet(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoCreateTabletReq>,
        ) -> Result<tonic::Response<super::ProtoCreateTabletResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                http::uri::PathAndQuery::from_static("/tserver.GrpcTabletAdmin/CreateTablet");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn delete_tablet(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoDeleteTabletReq>,
        ) -> Result<tonic::Response<super::ProtoDeleteTabletResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                http::uri::PathAndQuery::from_static("/tserver.GrpcTabletAdmin/DeleteTablet");
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn start_remote_bootstrap(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoStartRemoteBootstrapReq>,
        ) -> Result<tonic::Response<super::ProtoStartRemoteBootstrapResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path = http::uri::PathAndQuery::from_static(
                "/tserver.GrpcTabletAdmin/StartRemoteBootstrap",
            );
            self.inner.unary(request.into_request(), path, codec).await
        }
        pub async fn fetch_tablet_files(
            &mut self,
            request: impl tonic::IntoRequest<super::ProtoFetchTabletFilesReq>,
        ) -> Result<tonic::Response<super::ProtoFetchTabletFilesResp>, tonic::Status> {
            self.inner.ready().await.map_err(|e| {
                tonic::Status::new(
                    tonic::Code::Unknown,
                    format!("Service was not ready: {}", e.into()),
                )
            })?;
            let codec = tonic::codec::ProstCodec::default();
            let path =
                http::uri::PathAndQuery::from_static("/tserver.GrpcTabletAdmin/FetchTabletFiles");
            self.inner.unary(request.into_request(), path, codec).await
        }
    }
    impl<T: Clone> Clone for GrpcTabletAdminClient<T> {
        fn clone(&self) -> Self {
            Self {
                inner: self.inner.clone(),
            }
        }
    }
    impl<T> std::fmt::Debug for GrpcTabletAdminClient<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "GrpcTabletAdminClient {{ ... }}")
        }
    }
}
#[doc = r" Generated server implementations."]
pub mod grpc_coordinator_server {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    #[doc = "Generated trait containing gRPC methods that should be implemented for use with GrpcCoordinatorServer."]
    #[async_trait]
    pub trait GrpcCoordinator: Send + Sync + 'static {
        async fn heartbeat(
            &self,
            request: tonic::Request<super::ProtoHeartbeatReq>,
        ) -> Result<tonic::Response<super::ProtoHeartbeatResp>, tonic::Status>;
        async fn delete_not_serving_tablet(
            &self,
            request: tonic::Request<super::ProtoDeleteNotServingTabletReq>,
        ) -> Result<tonic::Response<super::ProtoDeleteNotServingTabletResp>, tonic::Status>;
    }
    #[derive(Debug)]
    pub struct GrpcCoordinatorServer<T: GrpcCoordinator> {
        inner: _Inner<T>,
    }
    struct _Inner<T>(Arc<T>, Option<tonic::Interceptor>);
    impl<T: GrpcCoordinator> GrpcCoordinatorServer<T> {
        pub fn new(inner: T) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, None);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, Some(interceptor.into()));
            Self { inner }
        }
    }
    impl<T, B> Service<http::Request<B>> for GrpcCoordinatorServer<T>
    where
        T: GrpcCoordinator,
        B: HttpBody + Send + Sync + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = Never;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/tserver.GrpcCoordinator/Heartbeat" => {
                    #[allow(non_camel_case_types)]
                    struct HeartbeatSvc<T: GrpcCoordinator>(pub Arc<T>);
                    impl<T: GrpcCoordinator> tonic::server::UnaryService<super::ProtoHeartbeatReq> for HeartbeatSvc<T> {
                        type Response = super::ProtoHeartbeatResp;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoHeartbeatReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).heartbeat(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = HeartbeatSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/tserver.GrpcCoordinator/DeleteNotServingTablet" => {
                    #[allow(non_camel_case_types)]
                    struct DeleteNotServingTabletSvc<T: GrpcCoordinator>(pub Arc<T>);
                    impl<T: GrpcCoordinator>
                        tonic::server::UnaryService<super::ProtoDeleteNotServingTabletReq>
                        for DeleteNotServingTabletSvc<T>
                    {
                        type Response = super::ProtoDeleteNotServingTabletResp;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoDeleteNotServingTabletReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut =
                                async move { (*inner).delete_not_serving_tablet(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = DeleteNotServingTabletSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(tonic::body::BoxBody::empty())
                        .unwrap())
                }),
            }
        }
    }
    impl<T: GrpcCoordinator> Clone for GrpcCoordinatorServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self { inner }
        }
    }
    impl<T: GrpcCoordinator> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(self.0.clone(), self.1.clone())
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: GrpcCoordinator> tonic::transport::NamedService for GrpcCoordinatorServer<T> {
        const NAME: &'static str = "tserver.GrpcCoordinator";
    }
}
#[doc = r" Generated server implementations."]
pub mod grpc_tablet_admin_server {
    #![allow(unused_variables, dead_code, missing_docs)]
    use tonic::codegen::*;
    #[doc = "Generated trait containing gRPC methods that should be implemented for use with GrpcTabletAdminServer."]
    #[async_trait]
    pub trait GrpcTabletAdmin: Send + Sync + 'static {
        async fn create_tablet(
            &self,
            request: tonic::Request<super::ProtoCreateTabletReq>,
        ) -> Result<tonic::Response<super::ProtoCreateTabletResp>, tonic::Status>;
        async fn delete_tablet(
            &self,
            request: tonic::Request<super::ProtoDeleteTabletReq>,
        ) -> Result<tonic::Response<super::ProtoDeleteTabletResp>, tonic::Status>;
        async fn start_remote_bootstrap(
            &self,
            request: tonic::Request<super::ProtoStartRemoteBootstrapReq>,
        ) -> Result<tonic::Response<super::ProtoStartRemoteBootstrapResp>, tonic::Status>;
        async fn fetch_tablet_files(
            &self,
            request: tonic::Request<super::ProtoFetchTabletFilesReq>,
        ) -> Result<tonic::Response<super::ProtoFetchTabletFilesResp>, tonic::Status>;
    }
    #[derive(Debug)]
    pub struct GrpcTabletAdminServer<T: GrpcTabletAdmin> {
        inner: _Inner<T>,
    }
    struct _Inner<T>(Arc<T>, Option<tonic::Interceptor>);
    impl<T: GrpcTabletAdmin> GrpcTabletAdminServer<T> {
        pub fn new(inner: T) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, None);
            Self { inner }
        }
        pub fn with_interceptor(inner: T, interceptor: impl Into<tonic::Interceptor>) -> Self {
            let inner = Arc::new(inner);
            let inner = _Inner(inner, Some(interceptor.into()));
            Self { inner }
        }
    }
    impl<T, B> Service<http::Request<B>> for GrpcTabletAdminServer<T>
    where
        T: GrpcTabletAdmin,
        B: HttpBody + Send + Sync + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = Never;
        type Future = BoxFuture<Self::Response, Self::Error>;
        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }
        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            let inner = self.inner.clone();
            match req.uri().path() {
                "/tserver.GrpcTabletAdmin/CreateTablet" => {
                    #[allow(non_camel_case_types)]
                    struct CreateTabletSvc<T: GrpcTabletAdmin>(pub Arc<T>);
                    impl<T: GrpcTabletAdmin>
                        tonic::server::UnaryService<super::ProtoCreateTabletReq>
                        for CreateTabletSvc<T>
                    {
                        type Response = super::ProtoCreateTabletResp;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoCreateTabletReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).create_tablet(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = CreateTabletSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/tserver.GrpcTabletAdmin/DeleteTablet" => {
                    #[allow(non_camel_case_types)]
                    struct DeleteTabletSvc<T: GrpcTabletAdmin>(pub Arc<T>);
                    impl<T: GrpcTabletAdmin>
                        tonic::server::UnaryService<super::ProtoDeleteTabletReq>
                        for DeleteTabletSvc<T>
                    {
                        type Response = super::ProtoDeleteTabletResp;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoDeleteTabletReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).delete_tablet(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = DeleteTabletSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/tserver.GrpcTabletAdmin/StartRemoteBootstrap" => {
                    #[allow(non_camel_case_types)]
                    struct StartRemoteBootstrapSvc<T: GrpcTabletAdmin>(pub Arc<T>);
                    impl<T: GrpcTabletAdmin>
                        tonic::server::UnaryService<super::ProtoStartRemoteBootstrapReq>
                        for StartRemoteBootstrapSvc<T>
                    {
                        type Response = super::ProtoStartRemoteBootstrapResp;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoStartRemoteBootstrapReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).start_remote_bootstrap(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = StartRemoteBootstrapSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                "/tserver.GrpcTabletAdmin/FetchTabletFiles" => {
                    #[allow(non_camel_case_types)]
                    struct FetchTabletFilesSvc<T: GrpcTabletAdmin>(pub Arc<T>);
                    impl<T: GrpcTabletAdmin>
                        tonic::server::UnaryService<super::ProtoFetchTabletFilesReq>
                        for FetchTabletFilesSvc<T>
                    {
                        type Response = super::ProtoFetchTabletFilesResp;
                        type Future = BoxFuture<tonic::Response<Self::Response>, tonic::Status>;
                        fn call(
                            &mut self,
                            request: tonic::Request<super::ProtoFetchTabletFilesReq>,
                        ) -> Self::Future {
                            let inner = self.0.clone();
                            let fut = async move { (*inner).fetch_tablet_files(request).await };
                            Box::pin(fut)
                        }
                    }
                    let inner = self.inner.clone();
                    let fut = async move {
                        let interceptor = inner.1.clone();
                        let inner = inner.0;
                        let method = FetchTabletFilesSvc(inner);
                        let codec = tonic::codec::ProstCodec::default();
                        let mut grpc = if let Some(interceptor) = interceptor {
                            tonic::server::Grpc::with_interceptor(codec, interceptor)
                        } else {
                            tonic::server::Grpc::new(codec)
                        };
                        let res = grpc.unary(method, req).await;
                        Ok(res)
                    };
                    Box::pin(fut)
                }
                _ => Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(tonic::body::BoxBody::empty())
                        .unwrap())
                }),
            }
        }
    }
    impl<T: GrpcTabletAdmin> Clone for GrpcTabletAdminServer<T> {
        fn clone(&self) -> Self {
            let inner = self.inner.clone();
            Self { inner }
        }
    }
    impl<T: GrpcTabletAdmin> Clone for _Inner<T> {
        fn clone(&self) -> Self {
            Self(self.0.clone(), self.1.clone())
        }
    }
    impl<T: std::fmt::Debug> std::fmt::Debug for _Inner<T> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "{:?}", self.0)
        }
    }
    impl<T: GrpcTabletAdmin> tonic::transport::NamedService for GrpcTabletAdminServer<T> {
        const NAME: &'static str = "tserver.GrpcTabletAdmin";
    }
}

//! # Reflection Client
//!
//! A client implementation for `grpc.reflection.v1`.
//!
//! The backend is asked for the file containing the target service; the
//! returned descriptor's imports are then chased recursively until the whole
//! schema tree of the service is assembled. The resulting descriptor set is
//! turned into a [`DescriptorPool`] from which the service descriptor is
//! extracted.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use crate::BoxError;
use http_body::Body as HttpBody;
use prost::Message;
use prost_reflect::{DescriptorPool, ServiceDescriptor};
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::client::GrpcService;
use tonic::transport::Channel;
use tonic_reflection::pb::v1::{
    ServerReflectionRequest, ServerReflectionResponse,
    server_reflection_client::ServerReflectionClient, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum ReflectionError {
    #[error(
        "failed to open a reflection stream, the backend may not support reflection: '{0}'"
    )]
    StreamInit(#[source] tonic::Status),

    #[error("the reflection stream returned an error status: '{0}'")]
    Stream(#[source] tonic::Status),

    #[error("reflection stream closed before resolution finished")]
    StreamClosed,

    #[error("internal error: failed to send a request on the reflection stream")]
    SendFailed,

    #[error("the reflection service reported error code {code}: {message}")]
    Server { code: i32, message: String },

    #[error("protocol error: received unexpected response type: {0}")]
    UnexpectedResponse(String),

    #[error("failed to decode file descriptor: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("backend returned an inconsistent descriptor set: {0}")]
    InvalidDescriptorSet(String),

    #[error("service '{0}' is not advertised by the backend")]
    ServiceNotAdvertised(String),
}

// The host field of reflection requests is undocumented and not enforced by
// known server implementations, so it is left empty.
const EMPTY_HOST: &str = "";

/// A client for the gRPC Server Reflection Protocol, scoped to the single
/// lookup the gateway needs: service name to service descriptor.
pub struct ReflectionClient<S = Channel> {
    inner: ServerReflectionClient<S>,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        Self {
            inner: ServerReflectionClient::new(service),
        }
    }

    /// Resolves the descriptor of the named service over the live connection.
    ///
    /// This performs the full reflection exchange (the file containing the
    /// symbol, plus every transitive dependency) and fails if the backend
    /// does not advertise the service.
    pub async fn resolve_service(
        &mut self,
        service_name: &str,
    ) -> Result<ServiceDescriptor, ReflectionError> {
        let fd_set = self.file_descriptor_set(service_name).await?;
        let pool = DescriptorPool::from_file_descriptor_set(fd_set)
            .map_err(|err| ReflectionError::InvalidDescriptorSet(err.to_string()))?;
        pool.get_service_by_name(service_name)
            .ok_or_else(|| ReflectionError::ServiceNotAdvertised(service_name.to_owned()))
    }

    /// Collects the descriptor of the file containing `symbol` and of every
    /// file it transitively imports.
    async fn file_descriptor_set(
        &mut self,
        symbol: &str,
    ) -> Result<FileDescriptorSet, ReflectionError> {
        let (tx, rx) = mpsc::channel(16);
        let mut responses = self
            .inner
            .server_reflection_info(ReceiverStream::new(rx))
            .await
            .map_err(ReflectionError::StreamInit)?
            .into_inner();

        tx.send(file_containing_symbol(symbol))
            .await
            .map_err(|_| ReflectionError::SendFailed)?;

        let mut files: HashMap<String, FileDescriptorProto> = HashMap::new();
        let mut requested: HashSet<String> = HashSet::new();
        // One request is in flight; every unseen import queues another.
        let mut pending = 1usize;

        while pending > 0 {
            let response = responses
                .message()
                .await
                .map_err(ReflectionError::Stream)?
                .ok_or(ReflectionError::StreamClosed)?;
            pending -= 1;

            for raw in descriptor_batch(response)? {
                let descriptor = FileDescriptorProto::decode(raw.as_slice())?;
                let Some(name) = descriptor.name.clone() else {
                    continue;
                };
                if files.contains_key(&name) {
                    continue;
                }
                for dependency in &descriptor.dependency {
                    if !files.contains_key(dependency) && requested.insert(dependency.clone()) {
                        tx.send(file_by_filename(dependency))
                            .await
                            .map_err(|_| ReflectionError::SendFailed)?;
                        pending += 1;
                    }
                }
                files.insert(name, descriptor);
            }
        }

        Ok(FileDescriptorSet {
            file: files.into_values().collect(),
        })
    }
}

fn file_containing_symbol(symbol: &str) -> ServerReflectionRequest {
    ServerReflectionRequest {
        host: EMPTY_HOST.to_owned(),
        message_request: Some(MessageRequest::FileContainingSymbol(symbol.to_owned())),
    }
}

fn file_by_filename(filename: &str) -> ServerReflectionRequest {
    ServerReflectionRequest {
        host: EMPTY_HOST.to_owned(),
        message_request: Some(MessageRequest::FileByFilename(filename.to_owned())),
    }
}

fn descriptor_batch(response: ServerReflectionResponse) -> Result<Vec<Vec<u8>>, ReflectionError> {
    match response.message_response {
        Some(MessageResponse::FileDescriptorResponse(batch)) => Ok(batch.file_descriptor_proto),
        Some(MessageResponse::ErrorResponse(err)) => Err(ReflectionError::Server {
            code: err.error_code,
            message: err.error_message,
        }),
        Some(other) => Err(ReflectionError::UnexpectedResponse(format!("{other:?}"))),
        None => Err(ReflectionError::UnexpectedResponse("empty message".into())),
    }
}

//! # Stub
//!
//! A thin wrapper over `tonic`'s generic client performing exactly one unary
//! exchange per call. The HTTP/2 path is assembled at runtime from the
//! method descriptor, and caller-supplied metadata is attached as request
//! headers.
//!
//! The return shape separates the two failure worlds the gateway must keep
//! distinguishable: an outer error means the request never reached the
//! backend; an inner `Err(Status)` means the exchange happened and the status
//! carries what the backend (or the transport) reported. Retries, if any,
//! belong to the caller.
use super::codec::DynamicCodec;
use crate::BoxError;
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor};
use std::str::FromStr;
use tonic::{
    client::GrpcService,
    metadata::{
        MetadataKey, MetadataValue,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
    transport::Channel,
};

/// Request headers forwarded to the backend as gRPC metadata.
pub type Metadata = Vec<(String, String)>;

#[derive(Debug, thiserror::Error)]
pub enum StubError {
    #[error("internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
}

/// A unary gRPC client over runtime-resolved method descriptors.
pub struct Stub<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> Stub<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a single unary call against `method`.
    ///
    /// # Returns
    /// * `Ok(Ok(message))` - The call completed and the backend answered OK.
    /// * `Ok(Err(status))` - The call completed with a non-OK status.
    /// * `Err(StubError)` - The request could not be issued.
    pub async fn unary(
        &mut self,
        method: &MethodDescriptor,
        input: DynamicMessage,
        metadata: &Metadata,
    ) -> Result<Result<DynamicMessage, tonic::Status>, StubError> {
        self.client
            .ready()
            .await
            .map_err(|err| StubError::ClientNotReady(err.into()))?;

        let codec = DynamicCodec::new(method.output());
        let path = http_path(method);
        let request = build_request(input, metadata)?;

        match self.client.unary(request, path, codec).await {
            Ok(response) => Ok(Ok(response.into_inner())),
            Err(status) => Ok(Err(status)),
        }
    }
}

fn http_path(method: &MethodDescriptor) -> http::uri::PathAndQuery {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).expect("valid gRPC path")
}

fn build_request(
    input: DynamicMessage,
    metadata: &Metadata,
) -> Result<tonic::Request<DynamicMessage>, StubError> {
    let mut request = tonic::Request::new(input);
    for (k, v) in metadata {
        let key = MetadataKey::from_str(k).map_err(|source| StubError::InvalidMetadataKey {
            key: k.clone(),
            source,
        })?;
        let val =
            MetadataValue::from_str(v).map_err(|source| StubError::InvalidMetadataValue {
                key: k.clone(),
                source,
            })?;
        request.metadata_mut().insert(key, val);
    }
    Ok(request)
}

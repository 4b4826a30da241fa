//! # Dynamic Client
//!
//! The per-request pipeline of the gateway. One [`DynamicClient`] serves one
//! inbound request and is then discarded; it owns the backend connection, the
//! descriptors resolved over reflection, and the in-flight messages.
//!
//! The lifecycle is a fixed forward sequence:
//!
//! ```text
//! connect -> resolve service -> find method -> allocate messages
//!         -> decode input -> invoke -> encode output -> close
//! ```
//!
//! Every stage is gated on the sticky error: the first failure is recorded in
//! [`DynamicClient::err`] and every later stage returns without doing work, so
//! the reported failure is always the first cause rather than a cascade.
//! [`DynamicClient::close`] releases the connection and discards the per-call
//! state on every exit path, error or not.
use crate::BoxError;
use crate::grpc::client::{Metadata, Stub, StubError};
use crate::grpc::codec;
use crate::reflection::client::{ReflectionClient, ReflectionError};
use crate::registry::records::ServiceUrl;
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor, ServiceDescriptor};
use std::error::Error;
use tonic::client::GrpcService;
use tonic::transport::{Channel, Endpoint};

/// Errors a gateway call can end in. The variants keep three worlds apart:
/// schema-resolution problems, local transport problems, and statuses the
/// backend itself reported, so callers can map each to a protocol status.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("failed to connect to '{url}': {source}")]
    Connect {
        url: String,
        #[source]
        source: tonic::transport::Error,
    },
    #[error("reflection resolution failed: '{0}'")]
    Reflection(#[from] ReflectionError),
    #[error("method '{method}' not found on service '{service}'")]
    MethodNotFound { service: String, method: String },
    #[error("invalid request payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
    #[error("gRPC request error: '{0}'")]
    Request(#[from] StubError),
    #[error("transport failure during call: '{0}'")]
    Transport(#[source] tonic::Status),
    #[error("{}", backend_message(.0))]
    Backend(tonic::Status),
    #[error("failed to encode response payload: {0}")]
    ResponseEncoding(#[source] serde_json::Error),
}

fn backend_message(status: &tonic::Status) -> String {
    format!(
        "backend returned status code {}: {}",
        status.code() as i32,
        status.message()
    )
}

impl CallError {
    /// The status reported by the backend, when the call got that far.
    pub fn backend_status(&self) -> Option<&tonic::Status> {
        match self {
            CallError::Backend(status) => Some(status),
            _ => None,
        }
    }
}

/// A dynamic gRPC client performing reflection, serving a single request.
pub struct DynamicClient<S = Channel> {
    service: Option<S>,
    service_descriptor: Option<ServiceDescriptor>,
    method_descriptor: Option<MethodDescriptor>,
    input_message: Option<DynamicMessage>,
    output_message: Option<DynamicMessage>,
    err: Option<CallError>,
}

impl DynamicClient<Channel> {
    /// Dials `url` and returns a client bound to that connection.
    ///
    /// A failed dial is recorded as the sticky error rather than returned:
    /// the pipeline short-circuits from then on and [`DynamicClient::call`]
    /// reports the dial failure as the first cause.
    pub async fn connect(url: &ServiceUrl) -> Self {
        let endpoint = match Endpoint::new(url.to_string()) {
            Ok(endpoint) => endpoint,
            Err(source) => {
                return Self::failed(CallError::Connect {
                    url: url.to_string(),
                    source,
                });
            }
        };
        match endpoint.connect().await {
            Ok(channel) => Self::from_service(channel),
            Err(source) => Self::failed(CallError::Connect {
                url: url.to_string(),
                source,
            }),
        }
    }
}

impl<S> DynamicClient<S> {
    /// Creates a client over an existing service, e.g. an in-process router.
    pub fn from_service(service: S) -> Self {
        Self {
            service: Some(service),
            service_descriptor: None,
            method_descriptor: None,
            input_message: None,
            output_message: None,
            err: None,
        }
    }

    fn failed(err: CallError) -> Self {
        Self {
            service: None,
            service_descriptor: None,
            method_descriptor: None,
            input_message: None,
            output_message: None,
            err: Some(err),
        }
    }

    /// The first error encountered across the pipeline, if any. Once set it
    /// is never overwritten by later stages.
    pub fn err(&self) -> Option<&CallError> {
        self.err.as_ref()
    }

    /// The decoded output message of a successful invocation. Reports no
    /// message once the client is closed or when the call failed.
    pub fn output(&self) -> Option<&DynamicMessage> {
        self.output_message.as_ref()
    }

    pub fn is_connected(&self) -> bool {
        self.service.is_some()
    }

    /// Releases the connection and discards the per-call descriptors and
    /// messages. Runs even when the sticky error is set: the connection must
    /// be released on every exit path. Idempotent.
    pub fn close(&mut self) {
        self.service = None;
        self.service_descriptor = None;
        self.method_descriptor = None;
        self.input_message = None;
        self.output_message = None;
    }
}

impl<S> DynamicClient<S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Performs the gRPC call after doing reflection to obtain type
    /// information, returning the backend's response as JSON bytes.
    ///
    /// The connection is closed before returning, on success and failure
    /// alike; the returned error is always the first failure of the sequence.
    pub async fn call(
        &mut self,
        service_name: &str,
        method_name: &str,
        body: &[u8],
        metadata: &Metadata,
    ) -> Result<Vec<u8>, CallError> {
        self.load_descriptors(service_name, method_name).await;
        self.unmarshal_input(body);
        self.invoke(metadata).await;
        let response = self.marshal_output();
        self.close();
        match self.err.take() {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }

    async fn load_descriptors(&mut self, service_name: &str, method_name: &str) {
        self.resolve_service(service_name).await;
        self.find_method(service_name, method_name);
        self.load_messages();
    }

    async fn resolve_service(&mut self, service_name: &str) {
        if self.err.is_some() {
            return;
        }
        let Some(service) = self.service.clone() else {
            return;
        };
        let mut reflection = ReflectionClient::new(service);
        match reflection.resolve_service(service_name).await {
            Ok(descriptor) => self.service_descriptor = Some(descriptor),
            Err(err) => self.err = Some(err.into()),
        }
    }

    fn find_method(&mut self, service_name: &str, method_name: &str) {
        if self.err.is_some() {
            return;
        }
        let Some(descriptor) = &self.service_descriptor else {
            return;
        };
        match descriptor.methods().find(|m| m.name() == method_name) {
            Some(method) => self.method_descriptor = Some(method),
            None => {
                self.err = Some(CallError::MethodNotFound {
                    service: service_name.to_owned(),
                    method: method_name.to_owned(),
                });
            }
        }
    }

    fn load_messages(&mut self) {
        if self.err.is_some() {
            return;
        }
        let Some(method) = &self.method_descriptor else {
            return;
        };
        self.input_message = Some(DynamicMessage::new(method.input()));
        self.output_message = Some(DynamicMessage::new(method.output()));
    }

    fn unmarshal_input(&mut self, body: &[u8]) {
        if self.err.is_some() {
            return;
        }
        let Some(method) = &self.method_descriptor else {
            return;
        };
        match codec::message_from_json(method.input(), body) {
            Ok(message) => self.input_message = Some(message),
            Err(err) => self.err = Some(CallError::InvalidPayload(err)),
        }
    }

    async fn invoke(&mut self, metadata: &Metadata) {
        if self.err.is_some() {
            return;
        }
        let (Some(service), Some(method), Some(input)) = (
            self.service.clone(),
            self.method_descriptor.clone(),
            self.input_message.take(),
        ) else {
            return;
        };
        let mut stub = Stub::new(service);
        match stub.unary(&method, input, metadata).await {
            Ok(Ok(output)) => self.output_message = Some(output),
            Ok(Err(status)) => {
                self.output_message = None;
                self.err = Some(classify_status(status));
            }
            Err(err) => {
                self.output_message = None;
                self.err = Some(err.into());
            }
        }
    }

    fn marshal_output(&mut self) -> Vec<u8> {
        if self.err.is_some() {
            return Vec::new();
        }
        let Some(output) = &self.output_message else {
            return Vec::new();
        };
        match codec::message_to_json(output) {
            Ok(bytes) => bytes,
            Err(err) => {
                self.err = Some(CallError::ResponseEncoding(err));
                Vec::new()
            }
        }
    }
}

/// A status carrying an error source was synthesized locally by the transport
/// layer; a sourceless status was parsed from the backend's trailers.
fn classify_status(status: tonic::Status) -> CallError {
    if status.source().is_some() {
        CallError::Transport(status)
    } else {
        CallError::Backend(status)
    }
}

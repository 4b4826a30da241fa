//! Shared fixtures for the integration tests: a hand-assembled descriptor set
//! for a small echo service, and a minimal in-process gRPC backend built on
//! the dynamic codec. Assembling the descriptors programmatically keeps the
//! test suite free of a protoc build step.
#![allow(dead_code)]

use pontic_core::grpc::codec::DynamicCodec;
use prost_reflect::{DescriptorPool, DynamicMessage, MethodDescriptor};
use prost_types::{
    DescriptorProto, FieldDescriptorProto, FileDescriptorProto, FileDescriptorSet,
    MethodDescriptorProto, ServiceDescriptorProto,
    field_descriptor_proto::{Label, Type},
};
use std::convert::Infallible;
use std::future::{Ready, ready};
use std::task::{Context, Poll};
use tonic::body::Body;
use tonic::codegen::{BoxFuture, Service};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::service::Routes;

/// The descriptor set a real `echo.proto` would compile to: one service with
/// a well-behaved `UnaryEcho` method and a `Fail` method the backend rejects.
pub fn file_descriptor_set() -> FileDescriptorSet {
    let message = |name: &str| DescriptorProto {
        name: Some(name.to_owned()),
        field: vec![FieldDescriptorProto {
            name: Some("message".to_owned()),
            json_name: Some("message".to_owned()),
            number: Some(1),
            label: Some(Label::Optional as i32),
            r#type: Some(Type::String as i32),
            ..Default::default()
        }],
        ..Default::default()
    };
    let method = |name: &str| MethodDescriptorProto {
        name: Some(name.to_owned()),
        input_type: Some(".echo.EchoRequest".to_owned()),
        output_type: Some(".echo.EchoResponse".to_owned()),
        ..Default::default()
    };
    FileDescriptorSet {
        file: vec![FileDescriptorProto {
            name: Some("echo.proto".to_owned()),
            package: Some("echo".to_owned()),
            syntax: Some("proto3".to_owned()),
            message_type: vec![message("EchoRequest"), message("EchoResponse")],
            service: vec![ServiceDescriptorProto {
                name: Some("EchoService".to_owned()),
                method: vec![method("UnaryEcho"), method("Fail")],
                ..Default::default()
            }],
            ..Default::default()
        }],
    }
}

pub fn descriptor_pool() -> DescriptorPool {
    DescriptorPool::from_file_descriptor_set(file_descriptor_set()).expect("valid descriptor set")
}

/// An in-process gRPC server exposing the echo service plus v1 reflection.
pub fn routes() -> Routes {
    let encoded = prost::Message::encode_to_vec(&file_descriptor_set());
    let reflection = tonic_reflection::server::Builder::configure()
        .register_encoded_file_descriptor_set(&encoded)
        .build_v1()
        .expect("reflection service");
    Routes::new(reflection).add_service(EchoServer {
        pool: descriptor_pool(),
    })
}

/// A backend speaking through `DynamicCodec`, shaped like the servers tonic
/// generates: route on the HTTP/2 path, then run the method through
/// `tonic::server::Grpc`.
#[derive(Clone)]
pub struct EchoServer {
    pool: DescriptorPool,
}

impl NamedService for EchoServer {
    const NAME: &'static str = "echo.EchoService";
}

impl Service<http::Request<Body>> for EchoServer {
    type Response = http::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Body>) -> Self::Future {
        let service = self
            .pool
            .get_service_by_name(Self::NAME)
            .expect("echo service registered");
        let method_name = req
            .uri()
            .path()
            .rsplit('/')
            .next()
            .unwrap_or_default()
            .to_owned();
        let Some(method) = service.methods().find(|m| m.name() == method_name) else {
            return Box::pin(async move {
                Ok(http::Response::builder()
                    .status(200)
                    .header("grpc-status", tonic::Code::Unimplemented as i32)
                    .header(http::header::CONTENT_TYPE, "application/grpc")
                    .body(Body::default())
                    .expect("static response"))
            });
        };
        Box::pin(async move {
            let codec = DynamicCodec::new(method.input());
            let mut grpc = Grpc::new(codec);
            let fail = method.name() == "Fail";
            let response = if fail {
                grpc.unary(FailEcho, req).await
            } else {
                grpc.unary(UnaryEcho { method }, req).await
            };
            Ok(response)
        })
    }
}

/// Echoes the `message` field of the request back in the response.
struct UnaryEcho {
    method: MethodDescriptor,
}

impl UnaryService<DynamicMessage> for UnaryEcho {
    type Response = DynamicMessage;
    type Future = Ready<Result<tonic::Response<Self::Response>, tonic::Status>>;

    fn call(&mut self, request: tonic::Request<DynamicMessage>) -> Self::Future {
        let input = request.into_inner();
        let mut output = DynamicMessage::new(self.method.output());
        if let Some(value) = input.get_field_by_name("message") {
            output.set_field_by_name("message", value.into_owned());
        }
        ready(Ok(tonic::Response::new(output)))
    }
}

/// Rejects every call with `InvalidArgument`.
struct FailEcho;

impl UnaryService<DynamicMessage> for FailEcho {
    type Response = DynamicMessage;
    type Future = Ready<Result<tonic::Response<Self::Response>, tonic::Status>>;

    fn call(&mut self, _request: tonic::Request<DynamicMessage>) -> Self::Future {
        ready(Err(tonic::Status::invalid_argument("fail requested")))
    }
}

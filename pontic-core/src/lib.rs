//! # Pontic Core
//!
//! `pontic-core` is the library powering the Pontic gateway. It can route a JSON
//! payload to any unary gRPC method on any backend that exposes the gRPC Server
//! Reflection Protocol, with no compile-time knowledge of the Protobuf schema.
//!
//! ## Key Components
//!
//! * **[`client::DynamicClient`]:** The per-request entry point. It dials the
//!   backend, resolves the method's schema over reflection, transcodes the JSON
//!   payload, performs the call, and transcodes the response back, accumulating
//!   the first error encountered and short-circuiting everything after it.
//! * **[`registry::records::Records`]:** The concurrent mapping from a gRPC
//!   service name and version to backend addresses, including the
//!   version-disambiguation policy.
//! * **[`registry::Resolve`]:** The capability implemented by discovery
//!   backends. The in-tree [`registry::static_source::StaticResolver`] loads an
//!   immutable mapping from a YAML file; a live cluster-discovery backend can
//!   implement the same contract by mutating a shared [`registry::records::Records`].
//!
//! ## Internal clients
//!
//! * **[`grpc::client::Stub`]:** A unary gRPC client moving runtime-typed
//!   messages through a dynamic codec.
//! * **[`reflection::client::ReflectionClient`]:** A client for
//!   `grpc.reflection.v1` that assembles the transitive descriptor set of a
//!   service and hands back its descriptor.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` to ensure that
//! consumers use compatible versions of these underlying dependencies.
pub mod client;
pub mod grpc;
pub mod reflection;
pub mod registry;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

//! # Service Registry
//!
//! This module maps logical gRPC service names (and optional version labels) to
//! concrete backend addresses.
//!
//! The data lives in [`records::Records`], a concurrency-safe structure shared
//! between the request path (reads) and whichever discovery backend feeds it
//! (writes). Two kinds of discovery backend exist:
//!
//! 1. **[`static_source::StaticResolver`]**: loads an immutable mapping from a
//!    YAML file once at startup.
//! 2. **A dynamic backend** (not part of this crate): watches live cluster
//!    topology and keeps a shared [`records::Records`] current through
//!    [`records::Records::set_record`], [`records::Records::remove_record`] and
//!    [`records::Records::clear_records`], the only mutation surface.
//!
//! Both are consumed through the [`Resolve`] trait.
pub mod records;
pub mod static_source;

use records::{ResolveError, ServiceUrl};

/// Capability implemented by discovery backends: map a `(service, version)`
/// pair to the address of a single backend.
///
/// An empty `version` means the caller did not specify one; resolution then
/// succeeds only when the registry holds exactly one version of the service.
pub trait Resolve {
    fn resolve(&self, service: &str, version: &str) -> Result<ServiceUrl, ResolveError>;
}

//! # Server Reflection
//!
//! This module contains the logic necessary to interact with the gRPC Server
//! Reflection Protocol.
//!
//! It lets the gateway query a backend for its own Protobuf schema at request
//! time, so no descriptors need to be compiled in or configured ahead of time.
pub mod client;

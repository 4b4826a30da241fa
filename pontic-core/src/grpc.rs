//! # Generic gRPC transport
//!
//! Message transcoding and the unary stub. Neither component knows the shape
//! of the data it carries: schemas arrive at request time as
//! `prost_reflect::MessageDescriptor`s obtained over reflection.
pub mod client;
pub mod codec;

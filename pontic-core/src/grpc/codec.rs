//! # Message Codec
//!
//! Two translations live here:
//!
//! 1. **JSON <-> message**: [`message_from_json`] populates a runtime-typed
//!    message from JSON text against a schema descriptor; [`message_to_json`]
//!    serializes one back following the proto3 JSON mapping. Decoding is
//!    strict: unknown fields and type mismatches are errors, so malformed
//!    client input is reported rather than silently dropped.
//! 2. **Message <-> wire**: [`DynamicCodec`] implements `tonic::codec::Codec`
//!    over [`DynamicMessage`], letting `tonic` transport messages whose types
//!    exist only at runtime.
use prost::Message;
use prost_reflect::{DynamicMessage, MessageDescriptor};
use tonic::{
    Status,
    codec::{Codec, DecodeBuf, Decoder, EncodeBuf, Encoder},
};

/// Decodes a JSON payload into a message instance bound to `descriptor`.
///
/// Unknown fields, type mismatches, and trailing garbage are all decode
/// errors.
pub fn message_from_json(
    descriptor: MessageDescriptor,
    payload: &[u8],
) -> Result<DynamicMessage, serde_json::Error> {
    let mut deserializer = serde_json::Deserializer::from_slice(payload);
    let message = DynamicMessage::deserialize(descriptor, &mut deserializer)?;
    deserializer.end()?;
    Ok(message)
}

/// Serializes `message` to JSON text following the schema's JSON mapping
/// rules (default-valued fields are omitted).
pub fn message_to_json(message: &DynamicMessage) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(message)
}

/// A codec bridging [`DynamicMessage`] and the Protobuf wire format.
///
/// Only decoding needs a schema: a `DynamicMessage` to be encoded already
/// carries its own descriptor. A client hands the method's output descriptor
/// here; a server would hand the input descriptor.
pub struct DynamicCodec {
    descriptor: MessageDescriptor,
}

impl DynamicCodec {
    /// `descriptor` describes the messages this codec decodes off the wire.
    pub fn new(descriptor: MessageDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Codec for DynamicCodec {
    type Encode = DynamicMessage;
    type Decode = DynamicMessage;

    type Encoder = DynamicEncoder;
    type Decoder = DynamicDecoder;

    fn encoder(&mut self) -> Self::Encoder {
        DynamicEncoder
    }

    fn decoder(&mut self) -> Self::Decoder {
        DynamicDecoder(self.descriptor.clone())
    }
}

/// Writes a message's Protobuf bytes into the gRPC frame buffer.
pub struct DynamicEncoder;

impl Encoder for DynamicEncoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn encode(&mut self, item: Self::Item, dst: &mut EncodeBuf<'_>) -> Result<(), Self::Error> {
        item.encode_raw(dst);
        Ok(())
    }
}

/// Reads Protobuf bytes off the wire into a fresh message of the configured
/// schema.
pub struct DynamicDecoder(MessageDescriptor);

impl Decoder for DynamicDecoder {
    type Item = DynamicMessage;
    type Error = Status;

    fn decode(&mut self, src: &mut DecodeBuf<'_>) -> Result<Option<Self::Item>, Self::Error> {
        let mut message = DynamicMessage::new(self.0.clone());
        message
            .merge(src)
            .map_err(|err| Status::internal(format!("failed to decode Protobuf bytes: {err}")))?;
        Ok(Some(message))
    }
}

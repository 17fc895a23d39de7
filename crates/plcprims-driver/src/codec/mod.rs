//! Protocol message codecs.
//!
//! A [`Codec`] turns one field of a request into one command payload and
//! reads reply payloads back. Framing is not its concern: payloads go through
//! the frame codec on their way to and from the transport.

mod df1;

use bytes::{Bytes, BytesMut};
use plcprims_field::{FieldDescriptor, PlcValue, RequestKind, TransactionId};

use crate::error::CodecError;

pub use df1::Df1Codec;

/// One outbound command: a single field, tagged with its transaction id.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub transaction_id: TransactionId,
    pub kind: RequestKind,
    pub field: FieldDescriptor,
    /// Value to store, for writes.
    pub value: Option<PlcValue>,
}

/// What a reply answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Read,
    Write,
}

/// A structurally decoded reply.
///
/// Value interpretation is deferred until the matching pending entry, and
/// with it the field's data type, is known.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub transaction_id: TransactionId,
    pub kind: ReplyKind,
    pub status: u8,
    pub data: Bytes,
}

/// A protocol variant, chosen when the driver is constructed.
pub trait Codec: Send + Sync + 'static {
    /// Check that a field (and its value, for writes) can be encoded.
    ///
    /// Called for every field of a request before any id is assigned, so a
    /// rejected request leaves no trace in the table or on the wire.
    fn validate(
        &self,
        kind: RequestKind,
        field: &FieldDescriptor,
        value: Option<&PlcValue>,
    ) -> Result<(), CodecError>;

    /// Append the payload for `command` to `dst`.
    fn encode(&self, command: &Command, dst: &mut BytesMut) -> Result<(), CodecError>;

    /// Parse a reply far enough to correlate it.
    fn decode(&self, payload: &[u8]) -> Result<Reply, CodecError>;

    /// Interpret reply data as the field's data type.
    fn decode_value(&self, field: &FieldDescriptor, data: &[u8]) -> Result<PlcValue, CodecError>;
}

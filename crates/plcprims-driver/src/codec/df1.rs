use bytes::{Buf, BufMut, Bytes, BytesMut};
use plcprims_field::{Address, DataType, FieldDescriptor, PlcValue, RequestKind};

use super::{Codec, Command, Reply, ReplyKind};
use crate::error::CodecError;

const CMD_UNPROTECTED_READ: u8 = 0x01;
const CMD_UNPROTECTED_WRITE: u8 = 0x08;
const REPLY_FLAG: u8 = 0x40;
const STATUS_NONE: u8 = 0x00;

/// cmd + status + tns
const HEADER_LEN: usize = 4;
/// header + address + size
const READ_REQUEST_LEN: usize = HEADER_LEN + 3;
/// header + address
const WRITE_REQUEST_MIN: usize = HEADER_LEN + 2;

/// Allen-Bradley DF1 unprotected read/write commands.
///
/// Layout, all multi-byte fields big-endian:
///
/// ```text
/// read request   01 00 <tns:2> <addr:2> <size:1>
/// write request  08 00 <tns:2> <addr:2> <data..>
/// read reply     41 <sts> <tns:2> <data..>
/// write reply    48 <sts> <tns:2>
/// ```
///
/// Only offset addresses are encodable. Reply data is interpreted for
/// `INTEGER` (signed 16-bit) and `BIT`; other types fail closed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Df1Codec;

impl Df1Codec {
    /// Parse a request payload back into a command.
    ///
    /// The wire carries no type tag, so the data type is recovered from the
    /// element size (reads) or data length (writes). The field is named
    /// after its address.
    pub fn decode_command(&self, payload: &[u8]) -> Result<Command, CodecError> {
        let mut buf = payload;
        let (needed, kind) = match buf.first().copied() {
            Some(CMD_UNPROTECTED_READ) => (READ_REQUEST_LEN, RequestKind::Read),
            Some(CMD_UNPROTECTED_WRITE) => (WRITE_REQUEST_MIN, RequestKind::Write),
            Some(other) => return Err(CodecError::UnknownCommand(other)),
            None => return Err(truncated(HEADER_LEN, 0)),
        };
        if buf.len() < needed {
            return Err(truncated(needed, buf.len()));
        }

        buf.advance(2);
        let transaction_id = buf.get_u16();
        let address = buf.get_u16();

        let (data_type, value) = match kind {
            RequestKind::Read => {
                let size = buf.get_u8();
                let data_type = DataType::from_byte_len(u16::from(size))
                    .ok_or(CodecError::InvalidSize(size))?;
                (data_type, None)
            }
            RequestKind::Write => {
                let data_type = u8::try_from(buf.len())
                    .ok()
                    .and_then(|len| DataType::from_byte_len(u16::from(len)))
                    .ok_or(CodecError::InvalidSize(buf.len().min(u8::MAX as usize) as u8))?;
                let value = match data_type {
                    DataType::Bit => PlcValue::Bool(buf[0] != 0),
                    DataType::Integer => PlcValue::Integer(i64::from(buf.get_i16())),
                    _ => PlcValue::Raw(buf.to_vec()),
                };
                (data_type, Some(value))
            }
        };

        let field = FieldDescriptor::new(
            address.to_string(),
            Address::Offset(u32::from(address)),
            data_type,
        )?;

        Ok(Command {
            transaction_id,
            kind,
            field,
            value,
        })
    }

    fn target(&self, field: &FieldDescriptor) -> Result<(u16, u16), CodecError> {
        let data_type = field.data_type();
        let width = data_type
            .byte_len()
            .ok_or(CodecError::UnsupportedDataType(data_type))?;
        let offset = match field.address() {
            Address::Offset(offset) => *offset,
            other => return Err(CodecError::UnsupportedOperation(other.kind())),
        };
        let address = u16::try_from(offset).map_err(|_| CodecError::AddressOutOfRange(offset))?;
        Ok((address, width))
    }

    fn put_value(
        &self,
        field: &FieldDescriptor,
        value: Option<&PlcValue>,
        dst: &mut BytesMut,
    ) -> Result<(), CodecError> {
        let data_type = field.data_type();
        let value = value.ok_or_else(|| CodecError::MissingValue(field.name().to_string()))?;
        match (data_type, value) {
            (DataType::Integer, PlcValue::Integer(v)) => {
                let word = i16::try_from(*v).map_err(|_| CodecError::ValueOutOfRange {
                    value: *v,
                    data_type,
                })?;
                dst.put_i16(word);
            }
            (DataType::Bit, PlcValue::Bool(b)) => dst.put_u8(u8::from(*b)),
            (DataType::Float, _) => {
                return Err(CodecError::NotImplemented("FLOAT writes".to_string()));
            }
            _ => return Err(CodecError::ValueTypeMismatch(data_type)),
        }
        Ok(())
    }
}

impl Codec for Df1Codec {
    fn validate(
        &self,
        kind: RequestKind,
        field: &FieldDescriptor,
        value: Option<&PlcValue>,
    ) -> Result<(), CodecError> {
        self.target(field)?;
        if kind == RequestKind::Write {
            self.put_value(field, value, &mut BytesMut::with_capacity(4))?;
        }
        Ok(())
    }

    fn encode(&self, command: &Command, dst: &mut BytesMut) -> Result<(), CodecError> {
        let (address, width) = self.target(&command.field)?;
        // Build into scratch space so a rejected value leaves `dst` untouched.
        let mut body = BytesMut::with_capacity(READ_REQUEST_LEN + 4);
        match command.kind {
            RequestKind::Read => {
                body.put_u8(CMD_UNPROTECTED_READ);
                body.put_u8(STATUS_NONE);
                body.put_u16(command.transaction_id);
                body.put_u16(address);
                body.put_u8(width as u8);
            }
            RequestKind::Write => {
                body.put_u8(CMD_UNPROTECTED_WRITE);
                body.put_u8(STATUS_NONE);
                body.put_u16(command.transaction_id);
                body.put_u16(address);
                self.put_value(&command.field, command.value.as_ref(), &mut body)?;
            }
        }
        tracing::debug!(
            tns = command.transaction_id,
            address,
            field = command.field.name(),
            kind = ?command.kind,
            "encoded DF1 command"
        );
        dst.extend_from_slice(&body);
        Ok(())
    }

    fn decode(&self, payload: &[u8]) -> Result<Reply, CodecError> {
        if payload.len() < HEADER_LEN {
            return Err(truncated(HEADER_LEN, payload.len()));
        }
        let mut buf = payload;
        let command = buf.get_u8();
        let status = buf.get_u8();
        let transaction_id = buf.get_u16();
        let kind = match command {
            c if c == CMD_UNPROTECTED_READ | REPLY_FLAG => ReplyKind::Read,
            c if c == CMD_UNPROTECTED_WRITE | REPLY_FLAG => ReplyKind::Write,
            other => return Err(CodecError::UnknownCommand(other)),
        };
        Ok(Reply {
            transaction_id,
            kind,
            status,
            data: Bytes::copy_from_slice(buf),
        })
    }

    fn decode_value(&self, field: &FieldDescriptor, data: &[u8]) -> Result<PlcValue, CodecError> {
        match field.data_type() {
            DataType::Integer => {
                let word: [u8; 2] = data
                    .try_into()
                    .map_err(|_| truncated(2, data.len()))?;
                Ok(PlcValue::Integer(i64::from(i16::from_be_bytes(word))))
            }
            DataType::Bit => match data {
                [byte] => Ok(PlcValue::Bool(*byte != 0)),
                _ => Err(truncated(1, data.len())),
            },
            other => Err(CodecError::NotImplemented(format!("decoding {other} values"))),
        }
    }
}

fn truncated(needed: usize, available: usize) -> CodecError {
    CodecError::Truncated { needed, available }
}

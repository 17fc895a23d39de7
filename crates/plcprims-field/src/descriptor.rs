use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FieldError, Result};

/// Wire data type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Bit,
    Integer,
    Float,
    BitString,
    ByteString,
    Timer,
    Counter,
    Control,
    Array,
    Bcd,
}

impl DataType {
    const ALL: [DataType; 10] = [
        DataType::Bit,
        DataType::Integer,
        DataType::Float,
        DataType::BitString,
        DataType::ByteString,
        DataType::Timer,
        DataType::Counter,
        DataType::Control,
        DataType::Array,
        DataType::Bcd,
    ];

    /// Fixed wire width in bytes, or `None` for types without one.
    ///
    /// There is deliberately no fallback width: a `None` here must stop
    /// encoding rather than guess.
    pub fn byte_len(self) -> Option<u16> {
        match self {
            DataType::Bit => Some(1),
            DataType::Integer => Some(2),
            DataType::Float => Some(4),
            _ => None,
        }
    }

    /// Recover the type from a fixed wire width.
    pub fn from_byte_len(len: u16) -> Option<Self> {
        match len {
            1 => Some(DataType::Bit),
            2 => Some(DataType::Integer),
            4 => Some(DataType::Float),
            _ => None,
        }
    }

    /// Upper-case name used in address strings.
    pub fn name(self) -> &'static str {
        match self {
            DataType::Bit => "BIT",
            DataType::Integer => "INTEGER",
            DataType::Float => "FLOAT",
            DataType::BitString => "BIT_STRING",
            DataType::ByteString => "BYTE_STRING",
            DataType::Timer => "TIMER",
            DataType::Counter => "COUNTER",
            DataType::Control => "CONTROL",
            DataType::Array => "ARRAY",
            DataType::Bcd => "BCD",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DataType {
    type Err = FieldError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|ty| ty.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| FieldError::UnknownDataType(wanted.to_string()))
    }
}

/// How a field is located in controller memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressKind {
    /// Numeric byte/word offset.
    Offset,
    /// Symbolic file/element path such as `N7:0`.
    Logical,
}

/// Protocol-specific location of a field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Address {
    Offset(u32),
    Logical(String),
}

impl Address {
    pub fn kind(&self) -> AddressKind {
        match self {
            Address::Offset(_) => AddressKind::Offset,
            Address::Logical(_) => AddressKind::Logical,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Offset(offset) => write!(f, "{offset}"),
            Address::Logical(path) => f.write_str(path),
        }
    }
}

/// Immutable description of one addressable value.
///
/// The name is chosen by the caller to key results; it never goes on the
/// wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DescriptorFields")]
pub struct FieldDescriptor {
    name: String,
    address: Address,
    data_type: DataType,
}

// Deserialized form, checked through `FieldDescriptor::new`.
#[derive(Deserialize)]
struct DescriptorFields {
    name: String,
    address: Address,
    data_type: DataType,
}

impl TryFrom<DescriptorFields> for FieldDescriptor {
    type Error = FieldError;

    fn try_from(fields: DescriptorFields) -> Result<Self> {
        FieldDescriptor::new(fields.name, fields.address, fields.data_type)
    }
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, address: Address, data_type: DataType) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(FieldError::EmptyName);
        }
        Ok(Self {
            name,
            address,
            data_type,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn address_kind(&self) -> AddressKind {
        self.address.kind()
    }

    pub fn data_type(&self) -> DataType {
        self.data_type
    }
}

impl fmt::Display for FieldDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}:{}", self.name, self.address, self.data_type)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_widths() {
        assert_eq!(DataType::Bit.byte_len(), Some(1));
        assert_eq!(DataType::Integer.byte_len(), Some(2));
        assert_eq!(DataType::Float.byte_len(), Some(4));
        assert_eq!(DataType::Timer.byte_len(), None);
        assert_eq!(DataType::ByteString.byte_len(), None);
    }

    #[test]
    fn width_roundtrips_for_fixed_types() {
        for ty in DataType::ALL {
            if let Some(len) = ty.byte_len() {
                assert_eq!(DataType::from_byte_len(len), Some(ty));
            }
        }
        assert_eq!(DataType::from_byte_len(3), None);
    }

    #[test]
    fn parses_type_names_case_insensitively() {
        assert_eq!("integer".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!("BIT_STRING".parse::<DataType>().unwrap(), DataType::BitString);
        assert_eq!(
            "WORD".parse::<DataType>().unwrap_err(),
            FieldError::UnknownDataType("WORD".to_string())
        );
    }

    #[test]
    fn descriptor_exposes_kind() {
        let field =
            FieldDescriptor::new("DB1/DB100", Address::Offset(100), DataType::Integer).unwrap();
        assert_eq!(field.address_kind(), AddressKind::Offset);
        assert_eq!(field.to_string(), "DB1/DB100=100:INTEGER");

        let logical =
            FieldDescriptor::new("n7", Address::Logical("N7:0".into()), DataType::Integer).unwrap();
        assert_eq!(logical.address_kind(), AddressKind::Logical);
    }

    #[test]
    fn empty_name_rejected() {
        let err = FieldDescriptor::new("", Address::Offset(0), DataType::Bit).unwrap_err();
        assert_eq!(err, FieldError::EmptyName);
    }

    #[test]
    fn serde_uses_wire_names() {
        let field = FieldDescriptor::new("tank", Address::Offset(7), DataType::BitString).unwrap();
        let json = serde_json::to_string(&field).unwrap();
        assert_eq!(
            json,
            r#"{"name":"tank","address":{"offset":7},"data_type":"BIT_STRING"}"#
        );
        let back: FieldDescriptor = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn deserializing_empty_name_fails() {
        let json = r#"{"name":"","address":{"offset":7},"data_type":"BIT"}"#;
        let err = serde_json::from_str::<FieldDescriptor>(json).unwrap_err();
        assert!(err.to_string().contains("field name must not be empty"));
    }
}

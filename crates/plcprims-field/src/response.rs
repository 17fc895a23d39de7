use std::fmt;

use serde::{Deserialize, Serialize};

/// Correlation number chosen by the initiator and echoed by the responder.
pub type TransactionId = u16;

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlcValue {
    Bool(bool),
    Integer(i64),
    Float(f32),
    Raw(Vec<u8>),
}

impl PlcValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PlcValue::Integer(v) => Some(*v),
            PlcValue::Bool(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PlcValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for PlcValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlcValue::Bool(v) => write!(f, "{v}"),
            PlcValue::Integer(v) => write!(f, "{v}"),
            PlcValue::Float(v) => write!(f, "{v}"),
            PlcValue::Raw(bytes) => {
                for byte in bytes {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

/// Per-field status reported by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseCode {
    Ok,
    /// Non-zero protocol status byte.
    Remote(u8),
}

impl ResponseCode {
    pub fn from_status(status: u8) -> Self {
        if status == 0 {
            ResponseCode::Ok
        } else {
            ResponseCode::Remote(status)
        }
    }

    pub fn is_ok(self) -> bool {
        self == ResponseCode::Ok
    }
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseCode::Ok => f.write_str("OK"),
            ResponseCode::Remote(status) => write!(f, "REMOTE_ERROR(0x{status:02x})"),
        }
    }
}

/// Result of one wire exchange for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOutcome {
    pub transaction_id: TransactionId,
    pub code: ResponseCode,
    /// Present only when `code` is [`ResponseCode::Ok`] and the exchange
    /// returned data.
    pub value: Option<PlcValue>,
}

/// Field-keyed results of a request, in request order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Response {
    fields: Vec<(String, FieldOutcome)>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, outcome: FieldOutcome) {
        self.fields.push((name.into(), outcome));
    }

    pub fn get(&self, name: &str) -> Option<&FieldOutcome> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, outcome)| outcome)
    }

    /// The value of a field that completed with [`ResponseCode::Ok`].
    pub fn value(&self, name: &str) -> Option<&PlcValue> {
        self.get(name).and_then(|outcome| outcome.value.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldOutcome)> {
        self.fields
            .iter()
            .map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn transaction_ids(&self) -> Vec<TransactionId> {
        self.fields
            .iter()
            .map(|(_, outcome)| outcome.transaction_id)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_lookup_by_name() {
        let mut response = Response::new();
        response.push(
            "DB1/DB100",
            FieldOutcome {
                transaction_id: 7,
                code: ResponseCode::Ok,
                value: Some(PlcValue::Integer(42)),
            },
        );
        response.push(
            "DB1/DB102",
            FieldOutcome {
                transaction_id: 8,
                code: ResponseCode::Remote(0x10),
                value: None,
            },
        );

        assert_eq!(response.value("DB1/DB100"), Some(&PlcValue::Integer(42)));
        assert_eq!(response.value("DB1/DB102"), None);
        assert_eq!(response.get("DB1/DB102").unwrap().code, ResponseCode::Remote(0x10));
        assert_eq!(response.transaction_ids(), vec![7, 8]);
        assert!(response.get("missing").is_none());
    }

    #[test]
    fn status_byte_mapping() {
        assert!(ResponseCode::from_status(0).is_ok());
        assert_eq!(ResponseCode::from_status(0x10), ResponseCode::Remote(0x10));
        assert_eq!(ResponseCode::Remote(0x10).to_string(), "REMOTE_ERROR(0x10)");
    }

    #[test]
    fn value_display() {
        assert_eq!(PlcValue::Integer(-3).to_string(), "-3");
        assert_eq!(PlcValue::Raw(vec![0x00, 0x2a]).to_string(), "002a");
        assert_eq!(PlcValue::Bool(true).as_i64(), Some(1));
    }
}

use std::collections::HashSet;

use crate::descriptor::FieldDescriptor;
use crate::error::{FieldError, Result};
use crate::response::PlcValue;

/// Direction of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Read,
    Write,
}

/// One field of a request; writes carry the value to store.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestItem {
    field: FieldDescriptor,
    value: Option<PlcValue>,
}

impl RequestItem {
    pub fn field(&self) -> &FieldDescriptor {
        &self.field
    }

    pub fn value(&self) -> Option<&PlcValue> {
        self.value.as_ref()
    }
}

/// An ordered, non-empty set of fields to read or write.
///
/// Transaction ids are not part of the request; the driver assigns them at
/// submission time.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    kind: RequestKind,
    items: Vec<RequestItem>,
}

impl Request {
    /// Start building a read request.
    pub fn read() -> ReadRequestBuilder {
        ReadRequestBuilder::default()
    }

    /// Start building a write request.
    pub fn write() -> WriteRequestBuilder {
        WriteRequestBuilder::default()
    }

    pub fn kind(&self) -> RequestKind {
        self.kind
    }

    pub fn items(&self) -> &[RequestItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(|item| item.field.name())
    }

    fn build(kind: RequestKind, items: Vec<RequestItem>) -> Result<Self> {
        if items.is_empty() {
            return Err(FieldError::EmptyRequest);
        }
        let mut seen = HashSet::with_capacity(items.len());
        for item in &items {
            if !seen.insert(item.field.name()) {
                return Err(FieldError::DuplicateField(item.field.name().to_string()));
            }
        }
        Ok(Self { kind, items })
    }
}

#[derive(Debug, Default)]
pub struct ReadRequestBuilder {
    items: Vec<RequestItem>,
}

impl ReadRequestBuilder {
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.items.push(RequestItem { field, value: None });
        self
    }

    pub fn build(self) -> Result<Request> {
        Request::build(RequestKind::Read, self.items)
    }
}

#[derive(Debug, Default)]
pub struct WriteRequestBuilder {
    items: Vec<RequestItem>,
}

impl WriteRequestBuilder {
    pub fn field(mut self, field: FieldDescriptor, value: PlcValue) -> Self {
        self.items.push(RequestItem {
            field,
            value: Some(value),
        });
        self
    }

    pub fn build(self) -> Result<Request> {
        Request::build(RequestKind::Write, self.items)
    }
}

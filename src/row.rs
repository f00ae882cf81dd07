use crate::value::Value;

/// One column value of one row.
///
/// Wire bytes are kept undecoded until an accessor asks for a typed value.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Null,
    /// Text protocol: the value as the server rendered it
    Text(Box<[u8]>),
    /// Binary protocol: the encoded value, length prefix included for variable-width types
    Binary(Box<[u8]>),
    /// A value supplied by the client, e.g. for an inserted row
    Typed(Value),
}

impl Field {
    pub fn is_null(&self) -> bool {
        matches!(self, Field::Null | Field::Typed(Value::Null))
    }
}

impl From<Value> for Field {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Field::Null,
            value => Field::Typed(value),
        }
    }
}

/// Decoded row. Never modified once stored; updates replace the whole row.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    fields: Vec<Field>,
}

impl Row {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Field by 0-based index
    pub fn get(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn into_fields(self) -> Vec<Field> {
        self.fields
    }
}

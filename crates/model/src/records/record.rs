use crate::core::value::Value;

/// JSON-safe record restricted to the stream's schema properties.
pub type ConformedRecord = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldValue {
    pub name: String,
    pub value: Value,
}

/// One source row: column names mapped to source-native values, in the
/// order the query returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawRecord {
    pub field_values: Vec<FieldValue>,
}

impl RawRecord {
    pub fn new(field_values: Vec<FieldValue>) -> Self {
        Self { field_values }
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.field_values.push(FieldValue {
            name: name.into(),
            value: value.into(),
        });
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.push(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.field_values
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.field_values
            .iter()
            .map(|f| (f.name.as_str(), &f.value))
    }

    pub fn len(&self) -> usize {
        self.field_values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.field_values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for RawRecord {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            field_values: iter
                .into_iter()
                .map(|(name, value)| FieldValue {
                    name: name.into(),
                    value,
                })
                .collect(),
        }
    }
}

use crate::error::SchemaError;
use serde_json::{Map, Value as JsonValue, json};

/// `format` annotation carried by string-typed properties.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StringFormat {
    DateTime,
    Date,
    Time,
    Other(String),
}

impl StringFormat {
    pub fn as_str(&self) -> &str {
        match self {
            StringFormat::DateTime => "date-time",
            StringFormat::Date => "date",
            StringFormat::Time => "time",
            StringFormat::Other(s) => s,
        }
    }

    fn parse(s: &str) -> Self {
        match s {
            "date-time" => StringFormat::DateTime,
            "date" => StringFormat::Date,
            "time" => StringFormat::Time,
            other => StringFormat::Other(other.to_string()),
        }
    }
}

/// The declared shape of one schema node.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    String(Option<StringFormat>),
    Number,
    Integer,
    Boolean,
    Object(ObjectSchema),
    Array(Box<SchemaType>),
    /// No `type` declared; values pass through untouched.
    Any,
}

/// A node of the schema tree: a type variant plus its nullability.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaType {
    pub kind: TypeKind,
    pub nullable: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub schema: SchemaType,
}

/// Ordered set of named properties.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ObjectSchema {
    pub properties: Vec<Property>,
}

impl SchemaType {
    pub fn new(kind: TypeKind) -> Self {
        Self {
            kind,
            nullable: true,
        }
    }

    pub fn string() -> Self {
        Self::new(TypeKind::String(None))
    }

    pub fn date_time() -> Self {
        Self::new(TypeKind::String(Some(StringFormat::DateTime)))
    }

    pub fn date() -> Self {
        Self::new(TypeKind::String(Some(StringFormat::Date)))
    }

    pub fn time() -> Self {
        Self::new(TypeKind::String(Some(StringFormat::Time)))
    }

    pub fn number() -> Self {
        Self::new(TypeKind::Number)
    }

    pub fn integer() -> Self {
        Self::new(TypeKind::Integer)
    }

    pub fn boolean() -> Self {
        Self::new(TypeKind::Boolean)
    }

    pub fn object(schema: ObjectSchema) -> Self {
        Self::new(TypeKind::Object(schema))
    }

    pub fn array(items: SchemaType) -> Self {
        Self::new(TypeKind::Array(Box::new(items)))
    }

    pub fn with_nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self.kind, TypeKind::Boolean)
    }

    /// Render this node as a JSON Schema document.
    pub fn to_json_schema(&self) -> JsonValue {
        let type_name = match &self.kind {
            TypeKind::String(_) => "string",
            TypeKind::Number => "number",
            TypeKind::Integer => "integer",
            TypeKind::Boolean => "boolean",
            TypeKind::Object(_) => "object",
            TypeKind::Array(_) => "array",
            TypeKind::Any => return json!({}),
        };

        let mut types = vec![JsonValue::from(type_name)];
        if self.nullable {
            types.push(JsonValue::from("null"));
        }

        let mut node = Map::new();
        node.insert("type".into(), JsonValue::Array(types));

        match &self.kind {
            TypeKind::String(Some(format)) => {
                node.insert("format".into(), format.as_str().into());
            }
            TypeKind::Object(object) => {
                node.insert("properties".into(), object.properties_json());
            }
            TypeKind::Array(items) => {
                node.insert("items".into(), items.to_json_schema());
            }
            _ => {}
        }

        JsonValue::Object(node)
    }

    /// Parse a JSON Schema node. `path` names the node in error messages.
    pub fn from_json_schema(node: &JsonValue, path: &str) -> Result<Self, SchemaError> {
        let obj = node
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(path.to_string()))?;

        if let Some(JsonValue::Array(variants)) = obj.get("anyOf") {
            return Self::from_any_of(variants, path);
        }

        let (type_name, nullable) = match obj.get("type") {
            None => return Ok(Self::new(TypeKind::Any)),
            Some(JsonValue::String(t)) => (t.clone(), t == "null"),
            Some(JsonValue::Array(types)) => {
                let mut names = types.iter().filter_map(JsonValue::as_str);
                let nullable = types.iter().any(|t| t.as_str() == Some("null"));
                let primary = names
                    .find(|t| *t != "null")
                    .ok_or_else(|| SchemaError::InvalidTypeDeclaration(path.to_string()))?;
                (primary.to_string(), nullable)
            }
            Some(other) => {
                return Err(SchemaError::InvalidTypeDeclaration(format!(
                    "{path}: {other}"
                )));
            }
        };

        let kind = match type_name.as_str() {
            "string" => TypeKind::String(
                obj.get("format")
                    .and_then(JsonValue::as_str)
                    .map(StringFormat::parse),
            ),
            "number" => TypeKind::Number,
            "integer" => TypeKind::Integer,
            "boolean" => TypeKind::Boolean,
            "object" => TypeKind::Object(ObjectSchema::from_json_schema(node, path)?),
            "array" => {
                let items = obj
                    .get("items")
                    .ok_or_else(|| SchemaError::MissingItems(path.to_string()))?;
                TypeKind::Array(Box::new(Self::from_json_schema(
                    items,
                    &format!("{path}[]"),
                )?))
            }
            "null" => TypeKind::Any,
            other => return Err(SchemaError::UnsupportedType(other.to_string())),
        };

        Ok(Self { kind, nullable })
    }

    fn from_any_of(variants: &[JsonValue], path: &str) -> Result<Self, SchemaError> {
        let nullable = variants
            .iter()
            .any(|v| v.get("type").and_then(JsonValue::as_str) == Some("null"));

        let primary = variants
            .iter()
            .find(|v| v.get("type").and_then(JsonValue::as_str) != Some("null"));

        match primary {
            Some(variant) => {
                let mut schema = Self::from_json_schema(variant, path)?;
                schema.nullable |= nullable;
                Ok(schema)
            }
            None => Ok(Self::new(TypeKind::Any)),
        }
    }
}

impl ObjectSchema {
    pub fn new(properties: Vec<Property>) -> Self {
        Self { properties }
    }

    pub fn with_property(mut self, name: impl Into<String>, schema: SchemaType) -> Self {
        self.properties.push(Property {
            name: name.into(),
            schema,
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&SchemaType> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.schema)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.properties.iter().map(|p| p.name.as_str())
    }

    fn properties_json(&self) -> JsonValue {
        let props = self
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.schema.to_json_schema()))
            .collect::<Map<_, _>>();
        JsonValue::Object(props)
    }

    /// Render as a top-level stream schema. Non-nullable properties are listed
    /// under `required`.
    pub fn to_json_schema(&self) -> JsonValue {
        let required = self
            .properties
            .iter()
            .filter(|p| !p.schema.nullable)
            .map(|p| JsonValue::from(p.name.clone()))
            .collect::<Vec<_>>();

        json!({
            "type": "object",
            "properties": self.properties_json(),
            "required": required,
        })
    }

    /// Read the `properties` of an object schema node.
    pub fn from_json_schema(node: &JsonValue, path: &str) -> Result<Self, SchemaError> {
        let obj = node
            .as_object()
            .ok_or_else(|| SchemaError::NotAnObject(path.to_string()))?;

        let mut properties = Vec::new();
        if let Some(props) = obj.get("properties") {
            let props = props
                .as_object()
                .ok_or_else(|| SchemaError::NotAnObject(format!("{path}.properties")))?;
            for (name, child) in props {
                let child_path = if path.is_empty() {
                    name.clone()
                } else {
                    format!("{path}.{name}")
                };
                properties.push(Property {
                    name: name.clone(),
                    schema: SchemaType::from_json_schema(child, &child_path)?,
                });
            }
        }

        Ok(Self { properties })
    }
}

use model::core::schema::SchemaType;

/// Ordered substring lookup from a declared column type name to its schema
/// type. Earlier entries win, so `datetime` maps before `date` and `time`.
const TYPE_LOOKUP: &[(&str, fn() -> SchemaType)] = &[
    ("timestamp", SchemaType::date_time),
    ("datetime", SchemaType::date_time),
    ("date", SchemaType::date),
    ("int", SchemaType::integer),
    ("number", SchemaType::number),
    ("decimal", SchemaType::number),
    ("double", SchemaType::number),
    ("float", SchemaType::number),
    ("string", SchemaType::string),
    ("text", SchemaType::string),
    ("char", SchemaType::string),
    ("bool", SchemaType::boolean),
    ("variant", SchemaType::string),
    ("time", SchemaType::time),
    ("multipleof", SchemaType::number),
    ("object", SchemaType::string),
];

/// Schema type for a declared column type name; unknown names are strings.
pub fn schema_type_for(type_name: &str) -> SchemaType {
    let needle = type_name.to_lowercase();
    TYPE_LOOKUP
        .iter()
        .find(|(name, _)| needle.contains(name))
        .map(|(_, make)| make())
        .unwrap_or_else(SchemaType::string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_common_type_names() {
        assert_eq!(schema_type_for("DATETIME"), SchemaType::date_time());
        assert_eq!(schema_type_for("timestamp(6)"), SchemaType::date_time());
        assert_eq!(schema_type_for("date"), SchemaType::date());
        assert_eq!(schema_type_for("time"), SchemaType::time());
        assert_eq!(schema_type_for("bigint unsigned"), SchemaType::integer());
        assert_eq!(schema_type_for("decimal(10,4)"), SchemaType::number());
        assert_eq!(schema_type_for("varchar(255)"), SchemaType::string());
        assert_eq!(schema_type_for("boolean"), SchemaType::boolean());
        assert_eq!(schema_type_for("multipleOf"), SchemaType::number());
    }

    #[test]
    fn unknown_names_fall_back_to_string() {
        assert_eq!(schema_type_for("geometry"), SchemaType::string());
        assert_eq!(schema_type_for(""), SchemaType::string());
    }
}

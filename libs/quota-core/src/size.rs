use serde_json::Value;

/// Byte size of a resource representation: the length of its JSON
/// serialization.
pub fn object_size(value: &Value) -> u64 {
    serde_json::to_string(value)
        .map(|raw| raw.len() as u64)
        .unwrap_or(0)
}

/// Size of an optional representation; an absent representation weighs
/// nothing.
pub fn optional_size(value: Option<&Value>) -> u64 {
    value.map(object_size).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_object_size_matches_serialized_length() {
        let value = json!({"id": "abc", "title": "hello"});
        let expected = serde_json::to_string(&value).unwrap().len() as u64;
        assert_eq!(object_size(&value), expected);
    }

    #[test]
    fn test_optional_size_of_none_is_zero() {
        assert_eq!(optional_size(None), 0);
    }

    #[test]
    fn test_empty_object_still_has_braces() {
        assert_eq!(object_size(&json!({})), 2);
    }
}

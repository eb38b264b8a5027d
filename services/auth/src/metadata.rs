//! Codec between caller-owned user metadata and its stored JSON form

use serde_json::Value;
use std::collections::BTreeMap;

use crate::error::{AuthError, AuthResult};

/// Open key/value data a host application attaches to a user.
///
/// Keys are kept sorted so the encoded form is canonical.
pub type Metadata = BTreeMap<String, Value>;

const EMPTY_OBJECT: &str = "{}";

/// Encode metadata for storage.
///
/// Absent or empty metadata encodes to `{}`, never to `null`.
pub fn encode(metadata: Option<&Metadata>) -> AuthResult<String> {
    match metadata {
        Some(map) if !map.is_empty() => {
            serde_json::to_string(map).map_err(AuthError::MetadataCorrupt)
        }
        _ => Ok(EMPTY_OBJECT.to_string()),
    }
}

/// Decode stored metadata.
///
/// A column that was never populated (`None`) or holds JSON `null` decodes to
/// an empty map. Anything that is not a JSON object is `MetadataCorrupt`.
pub fn decode<B: AsRef<[u8]>>(raw: Option<B>) -> AuthResult<Metadata> {
    let Some(raw) = raw else {
        return Ok(Metadata::new());
    };

    let decoded: Option<Metadata> =
        serde_json::from_slice(raw.as_ref()).map_err(AuthError::MetadataCorrupt)?;

    Ok(decoded.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_empty_and_absent_encode_to_empty_object() {
        assert_eq!(encode(None).unwrap(), "{}");
        assert_eq!(encode(Some(&Metadata::new())).unwrap(), "{}");
    }

    #[test]
    fn test_round_trip_preserves_nested_values() {
        let mut metadata = Metadata::new();
        metadata.insert("plan".to_string(), json!("pro"));
        metadata.insert("seats".to_string(), json!(12));
        metadata.insert("beta".to_string(), json!(true));
        metadata.insert(
            "billing".to_string(),
            json!({ "country": "CM", "tags": ["vat", 3.5, null] }),
        );

        let encoded = encode(Some(&metadata)).unwrap();
        assert_eq!(decode(Some(encoded.as_bytes())).unwrap(), metadata);
        assert_eq!(decode(Some(encode(None).unwrap())).unwrap(), Metadata::new());
    }

    #[test]
    fn test_encoding_is_canonical() {
        let mut forward = Metadata::new();
        forward.insert("a".to_string(), json!(1));
        forward.insert("b".to_string(), json!(2));

        let mut reverse = Metadata::new();
        reverse.insert("b".to_string(), json!(2));
        reverse.insert("a".to_string(), json!(1));

        assert_eq!(encode(Some(&forward)).unwrap(), r#"{"a":1,"b":2}"#);
        assert_eq!(
            encode(Some(&forward)).unwrap(),
            encode(Some(&reverse)).unwrap()
        );
    }

    #[test]
    fn test_absent_or_null_source_decodes_to_empty() {
        assert!(decode(None::<&[u8]>).unwrap().is_empty());
        assert!(decode(Some("null")).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_source_is_corrupt() {
        for raw in ["{not json", "[1, 2]", "\"text\"", ""] {
            let err = decode(Some(raw)).unwrap_err();
            assert!(
                matches!(err, AuthError::MetadataCorrupt(_)),
                "{raw:?} should be corrupt"
            );
        }
    }
}

//! Keystore shape validation
//!
//! A keystore is only shape-checked here. Its cryptographic integrity is not
//! known until the chain client attempts decryption with a password.

use serde_json::Value;

/// Message shown once a keystore passes the shape check
pub const VALID_KEYSTORE_MSG: &str = "It is valid keystore. input your password.";

/// Fields every keystore must carry
const REQUIRED_FIELDS: [&str; 4] = ["version", "id", "address", "crypto"];

/// Check that `raw` parses as JSON and carries a truthy `version`, `id`,
/// `address` and `crypto`.
///
/// Never fails: unparseable text is simply invalid.
pub fn validate(raw: &str) -> bool {
    let parsed: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            tracing::debug!(error = %e, "Keystore is not valid JSON");
            return false;
        }
    };

    REQUIRED_FIELDS
        .iter()
        .all(|field| parsed.get(field).is_some_and(is_truthy))
}

/// Declared address of a keystore that passed [`validate`]
pub fn declared_address(raw: &str) -> Option<String> {
    let parsed: Value = serde_json::from_str(raw).ok()?;
    parsed
        .get("address")
        .and_then(|v| v.as_str())
        .map(str::to_string)
}

// Objects count as present even when empty; `crypto: {}` is accepted.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{"version":3,"id":"abc","address":"0x1","crypto":{}}"#;

    #[test]
    fn accepts_minimal_keystore() {
        assert!(validate(MINIMAL));
        assert_eq!(declared_address(MINIMAL).as_deref(), Some("0x1"));
    }

    #[test]
    fn rejects_unparseable_text() {
        assert!(!validate("{not json"));
        assert!(!validate(""));
        assert!(!validate("[1, 2"));
    }

    #[test]
    fn rejects_each_missing_field() {
        for missing in REQUIRED_FIELDS {
            let mut value: Value = serde_json::from_str(MINIMAL).unwrap();
            value.as_object_mut().unwrap().remove(missing);
            assert!(!validate(&value.to_string()), "missing {missing}");
        }
    }

    #[test]
    fn rejects_falsy_fields() {
        assert!(!validate(r#"{"version":0,"id":"abc","address":"0x1","crypto":{}}"#));
        assert!(!validate(r#"{"version":3,"id":"","address":"0x1","crypto":{}}"#));
        assert!(!validate(r#"{"version":3,"id":"abc","address":null,"crypto":{}}"#));
        assert!(!validate(r#"{"version":3,"id":"abc","address":"0x1","crypto":false}"#));
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(!validate("3"));
        assert!(!validate(r#""keystore""#));
        assert!(!validate("[]"));
    }
}

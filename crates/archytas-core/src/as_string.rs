//! Serde codec for fields documented with `#[api(as_string)]`.
//!
//! The value is written through `Display` as a JSON string and read back
//! through `FromStr`. Reading also accepts a bare JSON number or boolean, so
//! clients that send `5` instead of `"5"` are not rejected.
//!
//! ```
//! use archytas_core::Reflect;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize, Reflect)]
//! struct Todo {
//!     #[serde(with = "archytas_core::as_string")]
//!     #[api(as_string)]
//!     id: i64,
//! }
//!
//! let todo: Todo = serde_json::from_str(r#"{"id":"42"}"#).unwrap();
//! assert_eq!(todo.id, 42);
//! assert_eq!(serde_json::to_string(&todo).unwrap(), r#"{"id":"42"}"#);
//! ```

use std::fmt::Display;
use std::str::FromStr;

use serde::{de, Deserialize, Deserializer, Serializer};
use serde_json::Value;

/// Writes `value` as a JSON string.
pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
where
    T: Display,
    S: Serializer,
{
    serializer.collect_str(value)
}

/// Reads a JSON string, number or boolean and parses it as `T`.
pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
where
    T: FromStr,
    T::Err: Display,
    D: Deserializer<'de>,
{
    let text = match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => {
            return Err(de::Error::custom(format!(
                "expected a string or a number, found {other}"
            )))
        }
    };
    text.parse().map_err(de::Error::custom)
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Row {
        #[serde(with = "super")]
        id: u64,
    }

    #[test]
    fn test_writes_a_string() {
        let json = serde_json::to_value(Row { id: u64::MAX }).unwrap();
        assert_eq!(json, serde_json::json!({"id": "18446744073709551615"}));
    }

    #[test]
    fn test_reads_strings_and_numbers() {
        let row: Row = serde_json::from_str(r#"{"id":"7"}"#).unwrap();
        assert_eq!(row, Row { id: 7 });
        let row: Row = serde_json::from_str(r#"{"id":7}"#).unwrap();
        assert_eq!(row, Row { id: 7 });
    }

    #[test]
    fn test_rejects_unparsable_values() {
        let err = serde_json::from_str::<Row>(r#"{"id":"seven"}"#).unwrap_err();
        assert!(err.to_string().contains("invalid digit"));
        assert!(serde_json::from_str::<Row>(r#"{"id":null}"#).is_err());
    }
}

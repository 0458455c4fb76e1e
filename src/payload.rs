//! Ordered JSON request bodies.

use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};

/// A JSON object body with insertion-ordered keys.
///
/// Later writes to the same key replace earlier ones, both for
/// [`Payload::insert`] and [`Payload::merge`].
///
/// # Examples
///
/// ```
/// use fxiaoke::Payload;
///
/// let mut params = Payload::new();
/// params.insert("triggerWorkFlow", &false)?;
///
/// let mut body = Payload::new()
///     .with("dataObjectApiName", "AccountObj")?
///     .with("triggerWorkFlow", true)?;
/// body.merge(params);
///
/// assert_eq!(
///     body.into_value().to_string(),
///     r#"{"dataObjectApiName":"AccountObj","triggerWorkFlow":false}"#
/// );
/// # Ok::<(), fxiaoke::Error>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Payload {
    fields: Map<String, Value>,
}

impl Payload {
    /// Creates an empty payload.
    pub fn new() -> Self {
        Self::default()
    }

    /// Converts any value that serializes to a JSON object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if serialization fails or the value is
    /// not an object.
    pub fn from_serializable<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        match to_value(value)? {
            Value::Object(fields) => Ok(Self { fields }),
            other => Err(Error::Serialization(format!(
                "expected a JSON object, got {}",
                other
            ))),
        }
    }

    /// Sets `key` to `value`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serialization`] if `value` cannot be serialized.
    pub fn insert<T: Serialize + ?Sized>(&mut self, key: impl Into<String>, value: &T) -> Result<()> {
        self.fields.insert(key.into(), to_value(value)?);
        Ok(())
    }

    /// Chaining form of [`Payload::insert`].
    pub fn with<T: Serialize>(mut self, key: impl Into<String>, value: T) -> Result<Self> {
        self.insert(key, &value)?;
        Ok(self)
    }

    /// Sets `key` to an already-built JSON value.
    pub fn insert_value(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Copies every entry of `other` into `self`; `other` wins on collisions.
    pub fn merge(&mut self, other: Payload) {
        for (key, value) in other.fields {
            self.fields.insert(key, value);
        }
    }

    /// Returns the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the string stored under `key`, if it is a string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.fields.iter()
    }

    /// Consumes the payload, returning it as a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Serializes the payload to bytes.
    pub fn to_vec(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(&self.fields).map_err(|e| Error::Serialization(e.to_string()))
    }
}

impl From<Map<String, Value>> for Payload {
    fn from(fields: Map<String, Value>) -> Self {
        Self { fields }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Payload {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preserves_insertion_order() {
        let payload = Payload::new()
            .with("zeta", 1)
            .unwrap()
            .with("alpha", 2)
            .unwrap()
            .with("mid", 3)
            .unwrap();

        let keys: Vec<&str> = payload.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_merge_last_writer_wins() {
        let mut base: Payload = [("a", json!(1)), ("b", json!(2))].into_iter().collect();
        let extra: Payload = [("b", json!("override")), ("c", json!(true))]
            .into_iter()
            .collect();

        base.merge(extra);

        assert_eq!(
            base.into_value(),
            json!({"a": 1, "b": "override", "c": true})
        );
    }

    #[test]
    fn test_from_serializable_rejects_non_objects() {
        #[derive(Serialize)]
        struct Owner {
            #[serde(rename = "ownerId")]
            owner_id: Vec<String>,
        }

        let payload = Payload::from_serializable(&Owner {
            owner_id: vec!["FSUID_1".to_string()],
        })
        .unwrap();
        assert_eq!(payload.get("ownerId"), Some(&json!(["FSUID_1"])));

        let err = Payload::from_serializable(&vec![1, 2, 3]).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }
}

//! # Conditions
//!
//! Attribute conditions narrow a permission to requests whose context carries
//! matching values. Values are a closed scalar variant so that equality is
//! unambiguous: strings, numbers, and booleans.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::error::{RbacError, RbacResult};

/// A scalar attribute value used in conditions and request contexts.
///
/// Numbers compare by value, so `3` and `3.0` are equal. Values of different
/// kinds are never equal: the string `"3"` is not the number `3`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarValue {
    /// String value.
    String(String),
    /// Numeric value.
    Number(serde_json::Number),
    /// Boolean value.
    Bool(bool),
}

impl ScalarValue {
    /// Convert a JSON value into a scalar, if it is one.
    ///
    /// Returns `None` for null, arrays and objects.
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) => Some(ScalarValue::String(s.clone())),
            serde_json::Value::Number(n) => Some(ScalarValue::Number(n.clone())),
            serde_json::Value::Bool(b) => Some(ScalarValue::Bool(*b)),
            _ => None,
        }
    }
}

impl PartialEq for ScalarValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (ScalarValue::String(a), ScalarValue::String(b)) => a == b,
            (ScalarValue::Number(a), ScalarValue::Number(b)) => {
                NumericKey::of(a) == NumericKey::of(b)
            }
            (ScalarValue::Bool(a), ScalarValue::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ScalarValue {}

impl Hash for ScalarValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ScalarValue::String(s) => s.hash(state),
            ScalarValue::Number(n) => NumericKey::of(n).hash(state),
            ScalarValue::Bool(b) => b.hash(state),
        }
    }
}

/// Canonical form of a JSON number for equality and hashing.
///
/// Integral values collapse to `Integer` whatever their JSON spelling;
/// everything else keeps its `f64` bit pattern.
#[derive(Debug, PartialEq, Eq, Hash)]
enum NumericKey {
    Integer(i128),
    Float(u64),
}

impl NumericKey {
    fn of(n: &serde_json::Number) -> Self {
        if let Some(i) = n.as_i64() {
            return NumericKey::Integer(i128::from(i));
        }
        if let Some(u) = n.as_u64() {
            return NumericKey::Integer(i128::from(u));
        }
        let f = n.as_f64().unwrap_or(f64::NAN);
        // Integral floats inside the i128 range collapse onto the integer form.
        if f.fract() == 0.0 && f.abs() < 1e38 {
            NumericKey::Integer(f as i128)
        } else {
            NumericKey::Float(f.to_bits())
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::String(s) => write!(f, "{s:?}"),
            ScalarValue::Number(n) => write!(f, "{n}"),
            ScalarValue::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::String(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::String(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Number(value.into())
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

/// Attribute conditions attached to a permission.
///
/// Ordered so that two permissions with the same conditions compare and hash
/// identically regardless of authoring order.
pub type Conditions = BTreeMap<String, ScalarValue>;

/// Request-time attributes checked against permission conditions.
///
/// # Example
///
/// ```
/// use carebase_rbac::condition::RequestContext;
///
/// let ctx = RequestContext::new().with("departmentId", "D1");
/// assert_eq!(ctx.len(), 1);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RequestContext {
    attributes: BTreeMap<String, ScalarValue>,
}

impl RequestContext {
    /// Create an empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ScalarValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an attribute.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ScalarValue>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Look up an attribute.
    pub fn get(&self, key: &str) -> Option<&ScalarValue> {
        self.attributes.get(key)
    }

    /// Number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Build a context from a raw JSON object.
    ///
    /// # Errors
    ///
    /// Returns `RbacError::DecisionFault` if the document is not an object or
    /// if any attribute value is not a scalar.
    ///
    /// # Example
    ///
    /// ```
    /// use carebase_rbac::condition::RequestContext;
    /// use serde_json::json;
    ///
    /// let ctx = RequestContext::from_json(&json!({"departmentId": "D1", "shift": 2})).unwrap();
    /// assert_eq!(ctx.len(), 2);
    ///
    /// assert!(RequestContext::from_json(&json!({"tags": ["a", "b"]})).is_err());
    /// ```
    pub fn from_json(value: &serde_json::Value) -> RbacResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            RbacError::DecisionFault("request context must be a JSON object".to_string())
        })?;

        let mut ctx = Self::new();
        for (key, raw) in object {
            let scalar = ScalarValue::from_json(raw).ok_or_else(|| {
                RbacError::DecisionFault(format!(
                    "context attribute `{key}` is not a scalar value"
                ))
            })?;
            ctx.attributes.insert(key.clone(), scalar);
        }
        Ok(ctx)
    }
}

impl<K, V> FromIterator<(K, V)> for RequestContext
where
    K: Into<String>,
    V: Into<ScalarValue>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut ctx = Self::new();
        for (k, v) in iter {
            ctx.insert(k, v);
        }
        ctx
    }
}

/// Checks permission conditions against a request context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// Check whether `conditions` are satisfied by `context`.
    ///
    /// - No conditions (or an empty map) always pass.
    /// - Conditions without a context never pass.
    /// - Otherwise every condition key must be present in the context with a
    ///   strictly equal value.
    pub fn satisfies(conditions: Option<&Conditions>, context: Option<&RequestContext>) -> bool {
        let conditions = match conditions {
            Some(c) if !c.is_empty() => c,
            _ => return true,
        };
        let Some(context) = context else {
            return false;
        };

        conditions
            .iter()
            .all(|(key, expected)| context.get(key) == Some(expected))
    }
}

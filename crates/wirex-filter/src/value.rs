use std::cmp::Ordering;
use std::fmt;

use crate::version::Version;

/// A typed attribute value carried by a capability.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Value {
    String(String),
    Long(i64),
    Version(Version),
    List(Vec<Value>),
}

impl Value {
    /// Returns the string content if this is a string value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the version if this is a version value
    pub fn as_version(&self) -> Option<&Version> {
        match self {
            Value::Version(v) => Some(v),
            _ => None,
        }
    }

    /// Compare this value with a filter operand, coercing the operand to
    /// this value's type. Returns `None` when the operand cannot be coerced
    /// or the value is a list.
    pub(crate) fn compare_operand(&self, operand: &str) -> Option<Ordering> {
        match self {
            Value::String(s) => Some(s.as_str().cmp(operand)),
            Value::Long(n) => operand.trim().parse::<i64>().ok().map(|o| n.cmp(&o)),
            Value::Version(v) => Version::parse(operand).ok().map(|o| v.cmp(&o)),
            Value::List(_) => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Long(n)
    }
}

impl From<Version> for Value {
    fn from(v: Version) -> Self {
        Value::Version(v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Long(n) => write!(f, "{}", n),
            Value::Version(v) => write!(f, "{}", v),
            Value::List(items) => {
                let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
                write!(f, "{}", parts.join(","))
            }
        }
    }
}

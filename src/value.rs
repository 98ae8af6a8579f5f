//! The tagged-union runtime value and the case-insensitive variable
//! registry it is stored in.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A tagged sum over the four value kinds the registry can hold. The tag
/// is authoritative: every read that expects a specific arm checks it and
/// fails rather than coercing silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Value {
    Int(i64),
    Double(f64),
    Bool(bool),
    String(String),
}

/// The `Wint`/`Wdouble`/`Wbool`/`Wstring` type tags used at the scripting
/// boundary (`setValue`'s third argument, and `CommandResult::value_tag`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueTag {
    Wint,
    Wdouble,
    Wbool,
    Wstring,
}

impl ValueTag {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "Wint" => Some(ValueTag::Wint),
            "Wdouble" => Some(ValueTag::Wdouble),
            "Wbool" => Some(ValueTag::Wbool),
            "Wstring" => Some(ValueTag::Wstring),
            _ => None,
        }
    }
}

impl std::fmt::Display for ValueTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValueTag::Wint => "Wint",
            ValueTag::Wdouble => "Wdouble",
            ValueTag::Wbool => "Wbool",
            ValueTag::Wstring => "Wstring",
        };
        write!(f, "{}", s)
    }
}

impl Value {
    pub fn tag(&self) -> ValueTag {
        match self {
            Value::Int(_) => ValueTag::Wint,
            Value::Double(_) => ValueTag::Wdouble,
            Value::Bool(_) => ValueTag::Wbool,
            Value::String(_) => ValueTag::Wstring,
        }
    }

    /// Parse `text` as the given tag. Used by `setValue(key, text, type)`.
    pub fn parse(text: &str, tag: ValueTag) -> Option<Value> {
        match tag {
            ValueTag::Wint => text.trim().parse::<i64>().ok().map(Value::Int),
            ValueTag::Wdouble => text.trim().parse::<f64>().ok().map(Value::Double),
            ValueTag::Wbool => match text.trim().to_ascii_lowercase().as_str() {
                "true" => Some(Value::Bool(true)),
                "false" => Some(Value::Bool(false)),
                _ => None,
            },
            ValueTag::Wstring => Some(Value::String(text.to_string())),
        }
    }

    /// Reduce a value to a number for use in a numeric expression context:
    /// int/double pass through, bool is 0/1, string fails.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Double(d) => Some(*d),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::String(_) => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(n) => Some(*n != 0),
            Value::Double(d) => Some(*d != 0.0),
            Value::String(_) => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Invariant-culture display: numbers use `.` as the decimal
    /// separator and no thousands grouping.
    pub fn display(&self) -> String {
        match self {
            Value::Int(n) => n.to_string(),
            Value::Double(d) => {
                if d.fract() == 0.0 && d.is_finite() {
                    format!("{:.0}", d)
                } else {
                    d.to_string()
                }
            }
            Value::Bool(b) => if *b { "True".to_string() } else { "False".to_string() },
            Value::String(s) => s.clone(),
        }
    }

    /// Re-quote a value as a literal suitable for substitution back into
    /// an expression: strings are wrapped in `"`, everything else uses
    /// its display form.
    pub fn as_literal(&self) -> String {
        match self {
            Value::String(s) => format!("\"{}\"", s),
            other => other.display(),
        }
    }
}

/// A case-insensitive map from variable name to tagged `Value`. Values
/// are copied in and out — there is no aliasing between a registry entry
/// and the caller's value.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    entries: HashMap<String, Value>,
}

impl Registry {
    pub fn new() -> Self {
        Self { entries: HashMap::new() }
    }

    fn normalize(name: &str) -> String {
        name.to_ascii_lowercase()
    }

    pub fn set(&mut self, name: &str, value: Value) {
        self.entries.insert(Self::normalize(name), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(&Self::normalize(name))
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.entries.remove(&Self::normalize(name)).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn enumerate(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        let mut reg = Registry::new();
        reg.set("Counter", Value::Int(1));
        assert_eq!(reg.get("COUNTER"), Some(&Value::Int(1)));
    }

    #[test]
    fn set_overwrites() {
        let mut reg = Registry::new();
        reg.set("x", Value::Int(1));
        reg.set("x", Value::Int(2));
        assert_eq!(reg.get("x"), Some(&Value::Int(2)));
    }

    #[test]
    fn remove_is_total() {
        let mut reg = Registry::new();
        reg.set("x", Value::Int(1));
        assert!(reg.remove("x"));
        assert!(!reg.remove("x"));
        assert_eq!(reg.get("x"), None);
    }

    #[test]
    fn bool_reduces_to_zero_or_one_for_numeric_context() {
        assert_eq!(Value::Bool(true).as_number(), Some(1.0));
        assert_eq!(Value::Bool(false).as_number(), Some(0.0));
    }

    #[test]
    fn string_has_no_numeric_reduction() {
        assert_eq!(Value::String("hi".into()).as_number(), None);
    }

    #[test]
    fn parse_value_respects_tag() {
        assert_eq!(Value::parse("100", ValueTag::Wint), Some(Value::Int(100)));
        assert_eq!(Value::parse("true", ValueTag::Wbool), Some(Value::Bool(true)));
        assert_eq!(Value::parse("nope", ValueTag::Wint), None);
    }

    #[test]
    fn display_uses_dot_separator() {
        assert_eq!(Value::Double(9.0).display(), "9");
        assert_eq!(Value::Double(9.5).display(), "9.5");
    }
}

//! Raw and typed configuration values.
//!
//! Providers hand back raw TOML values: the file stores return whatever the
//! document holds, the environment provider returns strings. Coercion turns a
//! raw value into the declared shape or fails loudly; it never guesses.

use crate::error::{ConfigError, Result};
use crate::spec::ValueKind;

/// The value currency of the crate. Raw provider output and coerced results
/// share this representation; coercion normalizes, it does not convert types.
pub type ConfigValue = toml::Value;

/// Short single-line rendering of a raw value for error messages. Long
/// values are elided so a misplaced blob never floods a terminal.
pub(crate) fn value_repr(value: &ConfigValue) -> String {
    let repr = match value {
        ConfigValue::String(s) => format!("string {:?}", s),
        ConfigValue::Integer(i) => format!("integer {}", i),
        ConfigValue::Float(f) => format!("float {}", f),
        ConfigValue::Boolean(b) => format!("bool {}", b),
        ConfigValue::Datetime(d) => format!("datetime {}", d),
        ConfigValue::Array(a) => format!("sequence of {} values", a.len()),
        ConfigValue::Table(t) => format!("mapping with {} keys", t.len()),
    };
    if repr.chars().count() > 80 {
        let cut: String = repr.chars().take(79).collect();
        format!("{}…", cut)
    } else {
        repr
    }
}

fn invalid(argument: &str, kind: &ValueKind, found: &ConfigValue) -> ConfigError {
    ConfigError::InvalidType {
        argument: argument.to_string(),
        expected: kind.describe(),
        found: value_repr(found),
    }
}

/// Coerces a raw provider value into the declared scalar or sequence kind.
///
/// Rules:
/// - a value already of the declared kind passes through unchanged;
/// - bools and numbers additionally accept their string literal forms
///   (`"true"`/`"false"`, Rust integer/float literal syntax), which is how
///   the environment provider delivers everything;
/// - integers widen to float, floats never narrow to integer;
/// - sequences must already be parsed arrays, a raw string is never split;
/// - record kinds are resolved shape-by-shape by the resolver, a record
///   reaching this function means a structured value sits in a scalar slot.
pub fn coerce(raw: ConfigValue, kind: &ValueKind, argument: &str) -> Result<ConfigValue> {
    match kind {
        ValueKind::Text => match raw {
            ConfigValue::String(_) => Ok(raw),
            other => Err(invalid(argument, kind, &other)),
        },
        ValueKind::Bool => match raw {
            ConfigValue::Boolean(_) => Ok(raw),
            ConfigValue::String(s) => match s.as_str() {
                "true" => Ok(ConfigValue::Boolean(true)),
                "false" => Ok(ConfigValue::Boolean(false)),
                _ => Err(invalid(argument, kind, &ConfigValue::String(s))),
            },
            other => Err(invalid(argument, kind, &other)),
        },
        ValueKind::Integer => match raw {
            ConfigValue::Integer(_) => Ok(raw),
            ConfigValue::String(s) => s
                .parse::<i64>()
                .map(ConfigValue::Integer)
                .map_err(|_| invalid(argument, kind, &ConfigValue::String(s.clone()))),
            other => Err(invalid(argument, kind, &other)),
        },
        ValueKind::Float => match raw {
            ConfigValue::Float(_) => Ok(raw),
            ConfigValue::Integer(i) => Ok(ConfigValue::Float(i as f64)),
            ConfigValue::String(s) => s
                .parse::<f64>()
                .map(ConfigValue::Float)
                .map_err(|_| invalid(argument, kind, &ConfigValue::String(s.clone()))),
            other => Err(invalid(argument, kind, &other)),
        },
        ValueKind::Sequence(inner) => match raw {
            ConfigValue::Array(items) => {
                let coerced = items
                    .into_iter()
                    .map(|item| coerce(item, inner, argument))
                    .collect::<Result<Vec<_>>>()?;
                Ok(ConfigValue::Array(coerced))
            }
            other => Err(invalid(argument, kind, &other)),
        },
        ValueKind::Record(_) => Err(invalid(argument, kind, &raw)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spec::ValueKind;

    fn s(v: &str) -> ConfigValue {
        ConfigValue::String(v.to_string())
    }

    #[test]
    fn text_passes_through() {
        let out = coerce(s("hello"), &ValueKind::Text, "greeting").unwrap();
        assert_eq!(out, s("hello"));
    }

    #[test]
    fn text_rejects_numbers() {
        let err = coerce(ConfigValue::Integer(3), &ValueKind::Text, "greeting").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidType { .. }));
    }

    #[test]
    fn bool_accepts_literal_strings_only() {
        assert_eq!(
            coerce(s("true"), &ValueKind::Bool, "flag").unwrap(),
            ConfigValue::Boolean(true)
        );
        assert_eq!(
            coerce(s("false"), &ValueKind::Bool, "flag").unwrap(),
            ConfigValue::Boolean(false)
        );
        assert!(coerce(s("yes"), &ValueKind::Bool, "flag").is_err());
        assert!(coerce(s("True"), &ValueKind::Bool, "flag").is_err());
    }

    #[test]
    fn numbers_parse_from_strings() {
        assert_eq!(
            coerce(s("42"), &ValueKind::Integer, "n").unwrap(),
            ConfigValue::Integer(42)
        );
        assert_eq!(
            coerce(s("2.5"), &ValueKind::Float, "x").unwrap(),
            ConfigValue::Float(2.5)
        );
        assert!(coerce(s("2.5"), &ValueKind::Integer, "n").is_err());
        assert!(coerce(s("forty"), &ValueKind::Integer, "n").is_err());
    }

    #[test]
    fn integers_widen_to_float_but_not_back() {
        assert_eq!(
            coerce(ConfigValue::Integer(3), &ValueKind::Float, "x").unwrap(),
            ConfigValue::Float(3.0)
        );
        assert!(coerce(ConfigValue::Float(3.0), &ValueKind::Integer, "n").is_err());
    }

    #[test]
    fn sequences_pass_through_and_coerce_elements() {
        let kind = ValueKind::Sequence(Box::new(ValueKind::Text));
        let raw = ConfigValue::Array(vec![s("a"), s("b")]);
        assert_eq!(coerce(raw.clone(), &kind, "tab_names").unwrap(), raw);
    }

    #[test]
    fn raw_string_is_never_split_into_a_sequence() {
        let kind = ValueKind::Sequence(Box::new(ValueKind::Text));
        assert!(coerce(s("a,b,c"), &kind, "tab_names").is_err());
    }
}

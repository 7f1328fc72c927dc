//! Display implementations for keys and detached values

use std::fmt;

use super::{DictKey, HostValue};

impl fmt::Display for DictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DictKey::None => write!(f, "None"),
            DictKey::Bool(b) => write!(f, "{}", b),
            DictKey::Int(n) => write!(f, "{}", n),
            DictKey::Str(s) => write!(f, "{:?}", s),
        }
    }
}

/// Format a float so that integral values keep a trailing `.0`.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::None => write!(f, "None"),
            HostValue::Bool(b) => write!(f, "{}", b),
            HostValue::Int(n) => write!(f, "{}", n),
            HostValue::Float(x) => write!(f, "{}", format_float(*x)),
            HostValue::Str(s) => write!(f, "{:?}", s),
            HostValue::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            HostValue::Dict(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            HostValue::Object { type_name, attrs } => {
                write!(f, "<{}", type_name)?;
                for (name, value) in attrs {
                    write!(f, " {}={}", name, value)?;
                }
                write!(f, ">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_formatting() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(2.5), "2.5");
    }

    #[test]
    fn test_host_display() {
        let v = HostValue::List(vec![HostValue::Int(1), HostValue::from("a")]);
        assert_eq!(v.to_string(), "[1, \"a\"]");
    }
}

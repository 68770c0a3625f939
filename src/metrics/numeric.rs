//! Conversion of INFO values to numbers

use std::fmt;

use serde::Serialize;

/// Outcome of converting a raw value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    Integer(i64),
    Float(f64),
    Unparseable,
}

/// Integer first, then float. Non-finite floats are rejected.
pub fn parse_numeric(raw: &str) -> Numeric {
    if let Ok(i) = raw.parse::<i64>() {
        return Numeric::Integer(i);
    }
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() => Numeric::Float(f),
        _ => Numeric::Unparseable,
    }
}

impl Numeric {
    pub fn value(self) -> Option<MetricValue> {
        match self {
            Numeric::Integer(i) => Some(MetricValue::Integer(i)),
            Numeric::Float(f) => Some(MetricValue::Float(f)),
            Numeric::Unparseable => None,
        }
    }
}

/// Numeric value carried by a dispatched metric
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(i64),
    Float(f64),
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Integer(i) => write!(f, "{}", i),
            MetricValue::Float(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_numeric("12345"), Numeric::Integer(12345));
        assert_eq!(parse_numeric("-100"), Numeric::Integer(-100));
    }

    #[test]
    fn test_parse_float() {
        assert_eq!(parse_numeric("1.25"), Numeric::Float(1.25));
        assert_eq!(parse_numeric("1e3"), Numeric::Float(1000.0));
        // Too large for i64, still a number
        assert_eq!(
            parse_numeric("18446744073709551615"),
            Numeric::Float(18446744073709551615.0)
        );
    }

    #[test]
    fn test_parse_unparseable() {
        assert_eq!(parse_numeric("master"), Numeric::Unparseable);
        assert_eq!(parse_numeric(""), Numeric::Unparseable);
        assert_eq!(parse_numeric("1.5M"), Numeric::Unparseable);
        assert_eq!(parse_numeric("inf"), Numeric::Unparseable);
        assert_eq!(parse_numeric("NaN"), Numeric::Unparseable);
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(parse_numeric("7").value(), Some(MetricValue::Integer(7)));
        assert_eq!(parse_numeric("x").value(), None);
        assert_eq!(MetricValue::Integer(3).to_string(), "3");
        assert_eq!(MetricValue::Float(0.5).to_string(), "0.5");
    }
}

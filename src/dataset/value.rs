//! Conversion of raw CSV cells into JSON scalars
//!
//! Each column gets a single kind, inferred from every non-null cell that
//! is being serialized, so a column of `1`, `2`, `x` comes out as strings
//! rather than a mix of numbers and text.

use serde_json::{Number, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnKind {
    /// Infer the narrowest kind that fits every non-null value
    pub fn infer<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut integer = true;
        let mut float = true;
        let mut boolean = true;
        let mut any = false;

        for value in values.into_iter().flatten() {
            any = true;
            integer = integer && value.parse::<i64>().is_ok();
            float = float && parse_float(value).is_some();
            boolean = boolean && parse_bool(value).is_some();
            if !integer && !float && !boolean {
                return Self::Text;
            }
        }

        match (any, integer, float, boolean) {
            (false, ..) => Self::Text,
            (true, true, _, _) => Self::Integer,
            (true, false, true, _) => Self::Float,
            (true, false, false, true) => Self::Boolean,
            _ => Self::Text,
        }
    }

    /// Convert one cell to JSON. Null cells become `null`
    pub fn to_json(self, value: Option<&str>) -> Value {
        let Some(value) = value else {
            return Value::Null;
        };

        let converted = match self {
            Self::Integer => value.parse::<i64>().ok().map(Value::from),
            Self::Float => parse_float(value)
                .and_then(Number::from_f64)
                .map(Value::Number),
            Self::Boolean => parse_bool(value).map(Value::Bool),
            Self::Text => None,
        };

        converted.unwrap_or_else(|| Value::String(value.to_string()))
    }
}

fn parse_float(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|f| f.is_finite())
}

fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case(vec![Some("1"), Some("-20"), None], ColumnKind::Integer)]
    #[case(vec![Some("1"), Some("2.5")], ColumnKind::Float)]
    #[case(vec![Some("True"), Some("false")], ColumnKind::Boolean)]
    #[case(vec![Some("1"), Some("abc")], ColumnKind::Text)]
    #[case(vec![Some("inf")], ColumnKind::Text)]
    #[case(vec![None, None], ColumnKind::Text)]
    #[case(vec![], ColumnKind::Text)]
    fn test_infer(#[case] values: Vec<Option<&str>>, #[case] expected: ColumnKind) {
        assert_eq!(ColumnKind::infer(values), expected);
    }

    #[test]
    fn test_to_json() {
        assert_eq!(ColumnKind::Integer.to_json(Some("30")), json!(30));
        assert_eq!(ColumnKind::Float.to_json(Some("2")), json!(2.0));
        assert_eq!(ColumnKind::Boolean.to_json(Some("TRUE")), json!(true));
        assert_eq!(ColumnKind::Text.to_json(Some("30")), json!("30"));
        assert_eq!(ColumnKind::Integer.to_json(None), Value::Null);
    }
}

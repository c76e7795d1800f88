use std::fmt;

/// The value of a single field in a `FieldRecord`.
///
/// Fields are loosely typed on the wire. A decoded OpenTSDB value may be an
/// integer or a float, a StatsD modifier is a string and so on. `FieldValue`
/// keeps the distinction so encoders can write back exactly what was read.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// A boolean field
    Bool(bool),
    /// A 64-bit signed integer field
    Integer(i64),
    /// A 64-bit float field
    Float(f64),
    /// A string field
    Str(String),
}

impl FieldValue {
    /// Return the value as a string slice, if it is a string.
    pub fn as_str(&self) -> Option<&str> {
        match *self {
            FieldValue::Str(ref s) => Some(s),
            _ => None,
        }
    }

    /// Return the value as a float, if it is numeric.
    ///
    /// Integers are widened. Strings are _not_ parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match *self {
            FieldValue::Float(f) => Some(f),
            FieldValue::Integer(i) => Some(i as f64),
            _ => None,
        }
    }

    /// Strict equality used for change detection
    ///
    /// Floats are compared by their bit pattern. This makes `NaN` equal to
    /// itself and distinguishes `0.0` from `-0.0`, which is what a
    /// deduplicator wants: "is this the same thing we wrote last time?"
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (&FieldValue::Float(x), &FieldValue::Float(y)) => x.to_bits() == y.to_bits(),
            (x, y) => x == y,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Integer(i) => write!(f, "{}", i),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Str(ref s) => f.write_str(s),
        }
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> FieldValue {
        FieldValue::Str(s)
    }
}

impl<'a> From<&'a str> for FieldValue {
    fn from(s: &'a str) -> FieldValue {
        FieldValue::Str(s.to_string())
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> FieldValue {
        FieldValue::Float(x)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> FieldValue {
        FieldValue::Integer(i)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> FieldValue {
        FieldValue::Bool(b)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f64;

    #[test]
    fn display_matches_wire() {
        assert_eq!("12", FieldValue::Integer(12).to_string());
        assert_eq!("1.5", FieldValue::Float(1.5).to_string());
        assert_eq!("3", FieldValue::Float(3.0).to_string());
        assert_eq!("true", FieldValue::Bool(true).to_string());
        assert_eq!("web01", FieldValue::from("web01").to_string());
    }

    #[test]
    fn same_as_is_bitwise_for_floats() {
        let nan = FieldValue::Float(f64::NAN);
        assert!(nan != nan.clone());
        assert!(nan.same_as(&nan.clone()));
        assert!(!FieldValue::Float(0.0).same_as(&FieldValue::Float(-0.0)));
        assert!(!FieldValue::Float(5.0).same_as(&FieldValue::Integer(5)));
        assert!(FieldValue::from("a").same_as(&FieldValue::from("a")));
    }

    #[test]
    fn as_f64_widens_integers() {
        assert_eq!(Some(7.0), FieldValue::Integer(7).as_f64());
        assert_eq!(Some(0.25), FieldValue::Float(0.25).as_f64());
        assert_eq!(None, FieldValue::from("7").as_f64());
    }
}

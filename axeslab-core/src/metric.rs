//! Tagged metric values.
//!
//! Every indicator the engine produces is either a finite number or an
//! explicit "not available" marker carrying the reason. Reports serialize the
//! marker as JSON `null`; the reason is kept for human-readable summaries.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Why a metric could not be computed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// Fewer valid observations than the component's minimum-sample gate.
    InsufficientData { required: usize, actual: usize },
    /// The input has a shape the statistic is undefined for
    /// (zero variance, a single column, no valid window).
    Degenerate(&'static str),
    /// The computation ran but could not produce a finite value.
    Failed(String),
    /// Read back from a report where only `null` was stored.
    Unreported,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unavailable::InsufficientData { required, actual } => {
                write!(f, "insufficient data ({actual} < {required})")
            }
            Unavailable::Degenerate(why) => write!(f, "degenerate input: {why}"),
            Unavailable::Failed(why) => write!(f, "failed: {why}"),
            Unavailable::Unreported => write!(f, "not reported"),
        }
    }
}

/// A computed indicator or the reason it is missing.
#[derive(Debug, Clone, PartialEq)]
pub enum Metric {
    Available(f64),
    Unavailable(Unavailable),
}

impl Metric {
    /// Wrap a raw value, turning NaN/inf into `Failed`.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Metric::Available(value)
        } else {
            Metric::Unavailable(Unavailable::Failed(format!("non-finite result ({value})")))
        }
    }

    pub fn insufficient(required: usize, actual: usize) -> Self {
        Metric::Unavailable(Unavailable::InsufficientData { required, actual })
    }

    pub fn degenerate(why: &'static str) -> Self {
        Metric::Unavailable(Unavailable::Degenerate(why))
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Metric::Available(v) => Some(*v),
            Metric::Unavailable(_) => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Metric::Available(_))
    }

    pub fn reason(&self) -> Option<&Unavailable> {
        match self {
            Metric::Available(_) => None,
            Metric::Unavailable(reason) => Some(reason),
        }
    }

    /// Apply `f` to an available value, keeping the unavailable reason otherwise.
    pub fn map(self, f: impl FnOnce(f64) -> f64) -> Metric {
        match self {
            Metric::Available(v) => Metric::from_f64(f(v)),
            other => other,
        }
    }
}

impl From<Option<f64>> for Metric {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Metric::from_f64(v),
            None => Metric::Unavailable(Unavailable::Unreported),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Metric::Available(v) => write!(f, "{v:.6}"),
            Metric::Unavailable(reason) => write!(f, "not available ({reason})"),
        }
    }
}

impl Serialize for Metric {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Metric::Available(v) if v.is_finite() => serializer.serialize_f64(*v),
            _ => serializer.serialize_none(),
        }
    }
}

impl<'de> Deserialize<'de> for Metric {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<f64>::deserialize(deserializer).map(Metric::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_serializes_as_number() {
        let json = serde_json::to_string(&Metric::Available(0.25)).unwrap();
        assert_eq!(json, "0.25");
    }

    #[test]
    fn unavailable_serializes_as_null() {
        let json = serde_json::to_string(&Metric::insufficient(30, 12)).unwrap();
        assert_eq!(json, "null");
    }

    #[test]
    fn null_reads_back_as_unreported() {
        let m: Metric = serde_json::from_str("null").unwrap();
        assert_eq!(m, Metric::Unavailable(Unavailable::Unreported));
        let m: Metric = serde_json::from_str("1.5").unwrap();
        assert_eq!(m, Metric::Available(1.5));
    }

    #[test]
    fn non_finite_values_are_failures() {
        assert!(!Metric::from_f64(f64::NAN).is_available());
        assert!(!Metric::from_f64(f64::INFINITY).is_available());
        assert_eq!(Metric::from_f64(0.0).value(), Some(0.0));
    }

    #[test]
    fn zero_is_distinct_from_unavailable() {
        let zero = Metric::Available(0.0);
        let missing = Metric::insufficient(120, 40);
        assert_ne!(zero, missing);
        assert_eq!(zero.value(), Some(0.0));
        assert_eq!(missing.value(), None);
    }

    #[test]
    fn display_names_the_reason() {
        let text = Metric::insufficient(40, 12).to_string();
        assert!(text.contains("12 < 40"), "{text}");
        assert_eq!(Metric::Available(0.5).to_string(), "0.500000");
    }

    #[test]
    fn map_keeps_reason() {
        let m = Metric::degenerate("zero variance").map(|v| v * 2.0);
        assert_eq!(m, Metric::degenerate("zero variance"));
        assert_eq!(Metric::Available(2.0).map(|v| v * 2.0), Metric::Available(4.0));
    }
}

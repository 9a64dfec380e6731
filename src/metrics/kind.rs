use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::metric::Metric;
use crate::metrics::euclidean::{Cosine, Euclidean};
use crate::metrics::minkowski::{Chebyshev, Manhattan, Minkowski};

/// Runtime-selected metric, for callers that pick the metric from a
/// configuration value rather than a type parameter.
///
/// Parses from the usual names: `"euclidean"`, `"manhattan"` (also
/// `"cityblock"`, `"l1"`), `"chebyshev"`, `"cosine"`, and `"minkowski:<p>"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "name")]
pub enum MetricKind {
    #[default]
    Euclidean,
    Manhattan,
    Chebyshev,
    Cosine,
    Minkowski { p: f64 },
}

impl Metric for MetricKind {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        match *self {
            MetricKind::Euclidean => Euclidean.distance(a, b),
            MetricKind::Manhattan => Manhattan.distance(a, b),
            MetricKind::Chebyshev => Chebyshev.distance(a, b),
            MetricKind::Cosine => Cosine.distance(a, b),
            MetricKind::Minkowski { p } => Minkowski::new(p).distance(a, b),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            MetricKind::Euclidean => "euclidean",
            MetricKind::Manhattan => "manhattan",
            MetricKind::Chebyshev => "chebyshev",
            MetricKind::Cosine => "cosine",
            MetricKind::Minkowski { .. } => "minkowski",
        }
    }

    fn validate(&self) -> Result<(), String> {
        match *self {
            MetricKind::Minkowski { p } => Minkowski::new(p).validate(),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Minkowski { p } => write!(f, "minkowski:{p}"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for MetricKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        if let Some(p) = lower.strip_prefix("minkowski:") {
            let p: f64 = p
                .parse()
                .map_err(|_| format!("invalid minkowski exponent in {s:?}"))?;
            let kind = MetricKind::Minkowski { p };
            kind.validate()?;
            return Ok(kind);
        }
        match lower.as_str() {
            "euclidean" | "l2" => Ok(MetricKind::Euclidean),
            "manhattan" | "cityblock" | "l1" => Ok(MetricKind::Manhattan),
            "chebyshev" => Ok(MetricKind::Chebyshev),
            "cosine" => Ok(MetricKind::Cosine),
            _ => Err(format!("unknown metric {s:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_metric_names() {
        assert_eq!("euclidean".parse::<MetricKind>(), Ok(MetricKind::Euclidean));
        assert_eq!("CityBlock".parse::<MetricKind>(), Ok(MetricKind::Manhattan));
        assert_eq!(
            "minkowski:3".parse::<MetricKind>(),
            Ok(MetricKind::Minkowski { p: 3.0 })
        );
        assert!("minkowski:0.5".parse::<MetricKind>().is_err());
        assert!("hamming".parse::<MetricKind>().is_err());
    }

    #[test]
    fn test_kind_dispatch_matches_concrete() {
        let a = [1.0, 2.0, -1.0];
        let b = [0.5, -1.0, 3.0];
        assert_eq!(MetricKind::Euclidean.distance(&a, &b), Euclidean.distance(&a, &b));
        assert_eq!(MetricKind::Chebyshev.distance(&a, &b), 4.0);
    }

    #[test]
    fn test_display_round_trip() {
        let kind = MetricKind::Minkowski { p: 1.5 };
        assert_eq!(kind.to_string().parse::<MetricKind>(), Ok(kind));
    }
}

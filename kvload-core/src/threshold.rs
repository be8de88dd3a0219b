use crate::{ConfigError, DEFAULT_ERROR_RATE_THRESHOLD, DEFAULT_LATENCY_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Metrics a threshold can be placed on.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    /// Rate of failed requests, as a fraction of all requests.
    HttpReqFailed,
    /// Request latency in milliseconds.
    HttpReqDuration,
    /// Number of requests issued.
    HttpReqs,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HttpReqFailed => "http_req_failed",
            Self::HttpReqDuration => "http_req_duration",
            Self::HttpReqs => "http_reqs",
        }
    }

    pub fn supports(&self, aggregation: Aggregation) -> bool {
        use Aggregation::*;
        match self {
            Self::HttpReqFailed => matches!(aggregation, Rate),
            Self::HttpReqDuration => matches!(aggregation, Avg | Min | Max | Med | Percentile(_)),
            Self::HttpReqs => matches!(aggregation, Count | Rate),
        }
    }
}

impl FromStr for Metric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "http_req_failed" => Ok(Self::HttpReqFailed),
            "http_req_duration" => Ok(Self::HttpReqDuration),
            "http_reqs" => Ok(Self::HttpReqs),
            other => Err(ConfigError::UnknownMetric(other.to_string())),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Aggregation {
    Rate,
    Count,
    Avg,
    Min,
    Max,
    Med,
    /// Percentile in `[0, 100]`.
    Percentile(f64),
}

impl FromStr for Aggregation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s {
            "rate" => return Ok(Self::Rate),
            "count" => return Ok(Self::Count),
            "avg" => return Ok(Self::Avg),
            "min" => return Ok(Self::Min),
            "max" => return Ok(Self::Max),
            "med" => return Ok(Self::Med),
            _ => {}
        }

        let inner = s
            .strip_prefix("p(")
            .and_then(|rest| rest.strip_suffix(')'))
            .ok_or_else(|| format!("unknown aggregation `{s}`"))?;
        let percentile: f64 = inner
            .trim()
            .parse()
            .map_err(|_| format!("invalid percentile `{inner}`"))?;
        if !(0. ..=100.).contains(&percentile) {
            return Err(format!("percentile {percentile} is outside [0, 100]"));
        }
        Ok(Self::Percentile(percentile))
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rate => f.write_str("rate"),
            Self::Count => f.write_str("count"),
            Self::Avg => f.write_str("avg"),
            Self::Min => f.write_str("min"),
            Self::Max => f.write_str("max"),
            Self::Med => f.write_str("med"),
            Self::Percentile(p) => write!(f, "p({p})"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Comparison {
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
}

impl Comparison {
    pub fn holds(&self, observed: f64, limit: f64) -> bool {
        match self {
            Self::Lt => observed < limit,
            Self::Le => observed <= limit,
            Self::Gt => observed > limit,
            Self::Ge => observed >= limit,
            Self::Eq => observed == limit,
            Self::Ne => observed != limit,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Eq => "==",
            Self::Ne => "!=",
        }
    }

    /// Finds the operator in `expr`, returning it with the text on either side.
    fn split(expr: &str) -> Option<(&str, Self, &str)> {
        let idx = expr.find(['<', '>', '=', '!'])?;
        let (lhs, rest) = expr.split_at(idx);
        let (op, rhs) = [
            ("<=", Self::Le),
            (">=", Self::Ge),
            ("==", Self::Eq),
            ("!=", Self::Ne),
            ("<", Self::Lt),
            (">", Self::Gt),
        ]
        .into_iter()
        .find_map(|(token, op)| rest.strip_prefix(token).map(|rhs| (op, rhs)))?;
        Some((lhs, op, rhs))
    }
}

/// One pass/fail criterion, e.g. `http_req_duration: p(95)<100`.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSpec {
    pub metric: Metric,
    pub aggregation: Aggregation,
    pub comparison: Comparison,
    pub limit: f64,
}

impl ThresholdSpec {
    /// Parses a k6-style threshold expression (`rate<0.01`, `p(95)<100`) for `metric`.
    pub fn parse(metric: &str, expr: &str) -> Result<Self, ConfigError> {
        let metric: Metric = metric.parse()?;
        let invalid = |reason: String| ConfigError::InvalidThreshold {
            expr: expr.to_string(),
            reason,
        };

        let (lhs, comparison, rhs) =
            Comparison::split(expr).ok_or_else(|| invalid("missing comparison".to_string()))?;
        let aggregation: Aggregation = lhs.parse().map_err(invalid)?;
        let limit: f64 = rhs
            .trim()
            .parse()
            .map_err(|_| invalid(format!("invalid limit `{}`", rhs.trim())))?;
        if !limit.is_finite() {
            return Err(invalid("limit must be finite".to_string()));
        }

        if !metric.supports(aggregation) {
            return Err(ConfigError::UnsupportedAggregation {
                metric: metric.to_string(),
                aggregation: aggregation.to_string(),
            });
        }

        Ok(Self {
            metric,
            aggregation,
            comparison,
            limit,
        })
    }

    /// The expression part, without the metric name.
    pub fn expression(&self) -> String {
        format!("{}{}{}", self.aggregation, self.comparison.as_str(), self.limit)
    }
}

impl fmt::Display for ThresholdSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.metric, self.expression())
    }
}

/// Threshold list as written in config files: metric name to expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, Vec<String>>",
    into = "BTreeMap<String, Vec<String>>"
)]
pub struct Thresholds(Vec<ThresholdSpec>);

impl Thresholds {
    pub fn new(specs: Vec<ThresholdSpec>) -> Self {
        Self(specs)
    }

    pub fn specs(&self) -> &[ThresholdSpec] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        let mut map = BTreeMap::new();
        map.insert(
            Metric::HttpReqFailed.to_string(),
            vec![DEFAULT_ERROR_RATE_THRESHOLD.to_string()],
        );
        map.insert(
            Metric::HttpReqDuration.to_string(),
            vec![DEFAULT_LATENCY_THRESHOLD.to_string()],
        );
        // The default expressions are constants known to parse.
        Self::try_from(map).unwrap_or_else(|_| Self(vec![]))
    }
}

impl TryFrom<BTreeMap<String, Vec<String>>> for Thresholds {
    type Error = ConfigError;

    fn try_from(map: BTreeMap<String, Vec<String>>) -> Result<Self, Self::Error> {
        let mut specs = vec![];
        for (metric, exprs) in &map {
            for expr in exprs {
                specs.push(ThresholdSpec::parse(metric, expr)?);
            }
        }
        Ok(Self(specs))
    }
}

impl From<Thresholds> for BTreeMap<String, Vec<String>> {
    fn from(thresholds: Thresholds) -> Self {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for spec in thresholds.0 {
            map.entry(spec.metric.to_string())
                .or_default()
                .push(spec.expression());
        }
        map
    }
}

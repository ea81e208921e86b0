use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A field's logical type, independent of whatever native type the physical
/// adapter stores it as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalType {
    Bool,
    Int,
    Real,
    String,
    Date,
}

impl LogicalType {
    /// Whether `other` may stand in for `self` under the sloppy numeric
    /// conflation policy (int/real interchangeable, everything else exact).
    pub fn compatible_sloppy(self, other: LogicalType) -> bool {
        use LogicalType::*;
        match (self, other) {
            (Int, Real) | (Real, Int) => true,
            (a, b) => a == b,
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            LogicalType::Bool => "bool",
            LogicalType::Int => "int",
            LogicalType::Real => "real",
            LogicalType::String => "string",
            LogicalType::Date => "date",
        };
        write!(f, "{s}")
    }
}

/// The sign a numeric field's values are observed or required to carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Sign {
    Positive,
    NonNegative,
    Zero,
    NonPositive,
    Negative,
    #[serde(rename = "null")]
    AllNull,
}

/// Boundary semantics for `Min`/`Max` comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Closed,
    Open,
    Fuzzy,
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Closed
    }
}

/// A scalar value as it appears inside a constraint document: the parameter
/// of a `Min`/`Max`/`AllowedValues` constraint, or a value observed in a
/// dataset column.
// Variant order matters: `serde(untagged)` tries each in turn and keeps the
// first that parses, so `Date` must precede `Str` or every ISO date string
// would collapse to a plain string.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Bool(bool),
    Int(i64),
    Real(f64),
    Date(chrono::NaiveDate),
    Str(String),
}

impl Scalar {
    pub fn logical_type(&self) -> LogicalType {
        match self {
            Scalar::Bool(_) => LogicalType::Bool,
            Scalar::Int(_) => LogicalType::Int,
            Scalar::Real(_) => LogicalType::Real,
            Scalar::Str(_) => LogicalType::String,
            Scalar::Date(_) => LogicalType::Date,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Int(v) => Some(*v as f64),
            Scalar::Real(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Scalar::Str(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Bool(v) => write!(f, "{v}"),
            Scalar::Int(v) => write!(f, "{v}"),
            Scalar::Real(v) => write!(f, "{v}"),
            Scalar::Str(v) => write!(f, "{v}"),
            Scalar::Date(v) => write!(f, "{v}"),
        }
    }
}

impl PartialEq for Scalar {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Scalar {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Scalar::Bool(a), Scalar::Bool(b)) => a.partial_cmp(b),
            (Scalar::Str(a), Scalar::Str(b)) => a.partial_cmp(b),
            (Scalar::Date(a), Scalar::Date(b)) => a.partial_cmp(b),
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
        }
    }
}

/// A `Min` or `Max` bound: either a bare scalar (closed-precision shorthand)
/// or an explicit `{value, precision}` object, both of which this type
/// accepts on deserialisation and collapses to the latter internally.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum BoundWire {
    Bare(Scalar),
    Full { value: Scalar, #[serde(default)] precision: Precision },
}

#[derive(Debug, Clone, Serialize)]
#[serde(into = "BoundWire")]
pub struct Bound {
    pub value: Scalar,
    pub precision: Precision,
}

impl Bound {
    pub fn closed(value: Scalar) -> Self {
        Self { value, precision: Precision::Closed }
    }

    pub fn new(value: Scalar, precision: Precision) -> Self {
        Self { value, precision }
    }
}

impl From<Bound> for BoundWire {
    fn from(b: Bound) -> Self {
        match b.precision {
            Precision::Closed => BoundWire::Bare(b.value),
            p => BoundWire::Full { value: b.value, precision: p },
        }
    }
}

impl<'de> Deserialize<'de> for Bound {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let wire = BoundWire::deserialize(deserializer)?;
        Ok(match wire {
            BoundWire::Bare(value) => Bound::closed(value),
            BoundWire::Full { value, precision } => Bound::new(value, precision),
        })
    }
}

/// One constraint kind together with its parameters. Exhaustively matched by
/// the discoverer, verifier and detector so adding a kind is a compile-time
/// forcing function everywhere it must be handled.
#[derive(Debug, Clone)]
pub enum Constraint {
    Type(LogicalType),
    Min(Bound),
    Max(Bound),
    Sign(Sign),
    MinLength(usize),
    MaxLength(usize),
    MaxNulls(usize),
    NoDuplicates(bool),
    AllowedValues(Vec<Scalar>),
    Rex(Vec<String>),
}

impl Constraint {
    pub fn tag(&self) -> &'static str {
        match self {
            Constraint::Type(_) => "type",
            Constraint::Min(_) => "min",
            Constraint::Max(_) => "max",
            Constraint::Sign(_) => "sign",
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::MaxNulls(_) => "max_nulls",
            Constraint::NoDuplicates(_) => "no_duplicates",
            Constraint::AllowedValues(_) => "allowed_values",
            Constraint::Rex(_) => "rex",
        }
    }
}

/// The constraint bundle for a single field. Each kind has its own slot, so
/// the "no two constraints of the same kind" invariant holds by construction
/// rather than by a runtime check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldConstraints {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub logical_type: Option<LogicalType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<Bound>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sign: Option<Sign>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_nulls: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_duplicates: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Scalar>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rex: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl FieldConstraints {
    pub fn set(&mut self, c: Constraint) {
        match c {
            Constraint::Type(t) => self.logical_type = Some(t),
            Constraint::Min(b) => self.min = Some(b),
            Constraint::Max(b) => self.max = Some(b),
            Constraint::Sign(s) => self.sign = Some(s),
            Constraint::MinLength(n) => self.min_length = Some(n),
            Constraint::MaxLength(n) => self.max_length = Some(n),
            Constraint::MaxNulls(n) => self.max_nulls = Some(n),
            Constraint::NoDuplicates(b) => self.no_duplicates = Some(b),
            Constraint::AllowedValues(v) => self.allowed_values = Some(v),
            Constraint::Rex(v) => self.rex = Some(v),
        }
    }

    /// All constraints present on this field, in the declaration order
    /// fixed by the document schema.
    pub fn iter(&self) -> Vec<Constraint> {
        let mut out = Vec::new();
        if let Some(t) = self.logical_type {
            out.push(Constraint::Type(t));
        }
        if let Some(b) = &self.min {
            out.push(Constraint::Min(b.clone()));
        }
        if let Some(b) = &self.max {
            out.push(Constraint::Max(b.clone()));
        }
        if let Some(s) = self.sign {
            out.push(Constraint::Sign(s));
        }
        if let Some(n) = self.min_length {
            out.push(Constraint::MinLength(n));
        }
        if let Some(n) = self.max_length {
            out.push(Constraint::MaxLength(n));
        }
        if let Some(n) = self.max_nulls {
            out.push(Constraint::MaxNulls(n));
        }
        if let Some(b) = self.no_duplicates {
            out.push(Constraint::NoDuplicates(b));
        }
        if let Some(v) = &self.allowed_values {
            out.push(Constraint::AllowedValues(v.clone()));
        }
        if let Some(v) = &self.rex {
            out.push(Constraint::Rex(v.clone()));
        }
        out
    }
}

/// The relational operator of a multi-field constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MultiFieldKind {
    Lt,
    Lte,
    Eq,
    Gt,
    Gte,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiFieldConstraint {
    pub kind: MultiFieldKind,
    pub left: String,
    pub right: String,
}

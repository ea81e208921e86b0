//! Explicit configuration values threaded through discover/verify/detect
//! calls. Nothing here is read from ambient or global state.

/// Numeric type-conflation policy applied when verifying a `Type` constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeChecking {
    /// `int` and `real` are interchangeable.
    Sloppy,
    /// Logical types must match exactly.
    Strict,
}

/// Which report rows the verifier retains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    All,
    FailuresOnly,
}

/// Configuration for [`crate::discover::Discoverer`].
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    /// The `K` cap on distinct values considered for `AllowedValues`
    /// discovery and for the regex inducer's input sample.
    pub distinct_cap: usize,
    pub enable_regex_discovery: bool,
    pub alternation_cap: usize,
    pub suppress_allowed_values_above_cap: bool,
    pub min_sample_size: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            distinct_cap: 20,
            enable_regex_discovery: true,
            alternation_cap: 8,
            suppress_allowed_values_above_cap: true,
            min_sample_size: 1,
        }
    }
}

impl DiscoveryConfig {
    pub fn with_distinct_cap(mut self, cap: usize) -> Self {
        self.distinct_cap = cap;
        self
    }

    pub fn with_regex_discovery(mut self, enabled: bool) -> Self {
        self.enable_regex_discovery = enabled;
        self
    }

    pub fn with_alternation_cap(mut self, cap: usize) -> Self {
        self.alternation_cap = cap;
        self
    }
}

/// Configuration for [`crate::verify::Verifier`].
#[derive(Debug, Clone, Copy)]
pub struct VerifyPolicy {
    pub epsilon: f64,
    pub type_checking: TypeChecking,
    pub report_mode: ReportMode,
}

impl Default for VerifyPolicy {
    fn default() -> Self {
        Self { epsilon: 0.0, type_checking: TypeChecking::Sloppy, report_mode: ReportMode::All }
    }
}

impl VerifyPolicy {
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    pub fn with_type_checking(mut self, mode: TypeChecking) -> Self {
        self.type_checking = mode;
        self
    }

    pub fn with_report_mode(mut self, mode: ReportMode) -> Self {
        self.report_mode = mode;
        self
    }
}

/// Configuration for [`crate::detect::Detector`].
#[derive(Debug, Clone, Default)]
pub struct DetectionPolicy {
    pub write_all: bool,
    pub per_constraint: bool,
    pub output_fields: Option<Vec<String>>,
    pub include_index: bool,
    pub epsilon: f64,
    pub type_checking: TypeChecking,
}

impl Default for TypeChecking {
    fn default() -> Self {
        TypeChecking::Sloppy
    }
}

impl DetectionPolicy {
    pub fn with_write_all(mut self, write_all: bool) -> Self {
        self.write_all = write_all;
        self
    }

    pub fn with_per_constraint(mut self, per_constraint: bool) -> Self {
        self.per_constraint = per_constraint;
        self
    }

    pub fn with_output_fields(mut self, fields: Vec<String>) -> Self {
        self.output_fields = Some(fields);
        self
    }

    pub fn with_include_index(mut self, include: bool) -> Self {
        self.include_index = include;
        self
    }
}

//! Typed intermediate representation of the search DSL.
//!
//! The wire format is string-keyed JSON; decoding (see [`crate::syntax`])
//! turns every operator into one of the closed enums below so the renderers
//! match exhaustively and "unknown operator" only exists at the wire boundary.

use serde_json::Value;

// ============================================================================
// Where DSL
// ============================================================================

/// Logical grouping keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
    Not,
    Xor,
    Nor,
}

impl LogicalOp {
    pub const ALL: [LogicalOp; 5] = [Self::And, Self::Or, Self::Not, Self::Xor, Self::Nor];

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$and" => Some(Self::And),
            "$or" => Some(Self::Or),
            "$not" => Some(Self::Not),
            "$xor" => Some(Self::Xor),
            "$nor" => Some(Self::Nor),
            _ => None,
        }
    }

    pub fn key(self) -> &'static str {
        match self {
            Self::And => "$and",
            Self::Or => "$or",
            Self::Not => "$not",
            Self::Xor => "$xor",
            Self::Nor => "$nor",
        }
    }

    /// Operator joining the group's members.
    pub fn joiner(self) -> &'static str {
        match self {
            Self::And | Self::Not => " AND ",
            Self::Or | Self::Nor => " OR ",
            Self::Xor => " XOR ",
        }
    }

    /// Whether the joined members are wrapped in `NOT (...)`.
    pub fn negates(self) -> bool {
        matches!(self, Self::Not | Self::Nor)
    }
}

/// Range and inequality operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOp {
    Gt,
    Gte,
    Lt,
    Lte,
    Ne,
}

impl RangeOp {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$gt" => Some(Self::Gt),
            "$gte" => Some(Self::Gte),
            "$lt" => Some(Self::Lt),
            "$lte" => Some(Self::Lte),
            "$ne" => Some(Self::Ne),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::Ne => "<>",
        }
    }
}

/// Case-insensitive string pattern operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringOp {
    Contains,
    StartsWith,
    EndsWith,
}

impl StringOp {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$contains" => Some(Self::Contains),
            "$startsWith" => Some(Self::StartsWith),
            "$endsWith" => Some(Self::EndsWith),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::StartsWith => "STARTS WITH",
            Self::EndsWith => "ENDS WITH",
        }
    }
}

/// Type names accepted by `$type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyType {
    String,
    Number,
    Boolean,
    Null,
    Datetime,
    Vector,
}

impl PropertyType {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(Self::String),
            "number" => Some(Self::Number),
            "boolean" => Some(Self::Boolean),
            "null" => Some(Self::Null),
            "datetime" => Some(Self::Datetime),
            "vector" => Some(Self::Vector),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Null => "null",
            Self::Datetime => "datetime",
            Self::Vector => "vector",
        }
    }
}

/// Components of a datetime object, in significance order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatetimeComponent {
    Year,
    Month,
    Day,
    Hour,
    Minute,
    Second,
    Millisecond,
    Microsecond,
    Nanosecond,
}

impl DatetimeComponent {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "$year" => Some(Self::Year),
            "$month" => Some(Self::Month),
            "$day" => Some(Self::Day),
            "$hour" => Some(Self::Hour),
            "$minute" => Some(Self::Minute),
            "$second" => Some(Self::Second),
            "$millisecond" => Some(Self::Millisecond),
            "$microsecond" => Some(Self::Microsecond),
            "$nanosecond" => Some(Self::Nanosecond),
            _ => None,
        }
    }

    /// Field name in the query language's temporal map/accessors.
    pub fn name(self) -> &'static str {
        match self {
            Self::Year => "year",
            Self::Month => "month",
            Self::Day => "day",
            Self::Hour => "hour",
            Self::Minute => "minute",
            Self::Second => "second",
            Self::Millisecond => "millisecond",
            Self::Microsecond => "microsecond",
            Self::Nanosecond => "nanosecond",
        }
    }
}

/// A datetime given by components; always carries a year.
#[derive(Debug, Clone, PartialEq)]
pub struct DatetimeParts {
    /// Sorted by significance, year first
    pub components: Vec<(DatetimeComponent, Value)>,
}

/// Right-hand side of an equality or range comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Null,
    Literal(Value),
    Datetime(DatetimeParts),
}

/// Threshold of a vector-similarity comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum Threshold {
    /// Bare number: similarity must be at least this
    AtLeast(Value),
    /// One bound per range operator
    Range(Vec<(RangeOp, Value)>),
}

/// `{ $vector: { fn, query, threshold } }`
#[derive(Debug, Clone, PartialEq)]
pub struct VectorSearch {
    /// Fully qualified similarity function
    pub function: String,
    pub query: Vec<Value>,
    pub threshold: Threshold,
}

/// One operator inside a property-expression object.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare(RangeOp, Operand),
    In(Vec<Value>),
    NotIn(Vec<Value>),
    Text(StringOp, String),
    Exists(bool),
    Type(PropertyType),
    Vector(VectorSearch),
}

/// A decoded property expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Scalar, null or datetime-component equality
    Equals(Operand),
    /// Operator object; conditions are conjoined
    Conditions(Vec<Condition>),
}

/// Traversal direction of a relation hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RelationDirection {
    In,
    Out,
    #[default]
    Undirected,
}

/// Decoded `$relation` directive.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RelationDirective {
    pub relation_type: Option<String>,
    pub direction: RelationDirection,
}

// ============================================================================
// Aggregate DSL
// ============================================================================

/// Sort direction for ordering and collects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// `orderBy`: a bare direction (by identity) or per-field directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderBy {
    Direction(SortDirection),
    Fields(Vec<(String, SortDirection)>),
}

/// Scalar accumulators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accumulator {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Accumulator {
    pub fn function(self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Min => "min",
            Self::Max => "max",
        }
    }
}

/// `count|sum|avg|min|max` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Accumulation {
    pub function: Accumulator,
    /// User alias name, e.g. `$employee`
    pub alias: String,
    pub field: Option<String>,
    pub uniq: bool,
    pub precision: Option<u32>,
}

/// `collect` entry, possibly rolling up a nested aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct Collect {
    pub alias: String,
    pub field: Option<String>,
    pub uniq: bool,
    pub limit: Option<u64>,
    pub skip: Option<u64>,
    pub order_by: Option<OrderBy>,
    pub aggregate: Option<AggregateSpec>,
}

/// One output field of an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregate {
    Accumulate(Accumulation),
    Collect(Collect),
}

impl Aggregate {
    pub fn alias(&self) -> &str {
        match self {
            Self::Accumulate(acc) => &acc.alias,
            Self::Collect(collect) => &collect.alias,
        }
    }

    /// Nested aggregate of a collect, if any.
    pub fn nested(&self) -> Option<&AggregateSpec> {
        match self {
            Self::Collect(Collect {
                aggregate: Some(spec),
                ..
            }) => Some(spec),
            _ => None,
        }
    }
}

/// Ordered mapping from output field name to aggregate.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AggregateSpec {
    pub fields: Vec<(String, Aggregate)>,
}

impl AggregateSpec {
    /// True when some collect at any depth rolls up a nested aggregate.
    pub fn is_nested(&self) -> bool {
        self.fields.iter().any(|(_, agg)| agg.nested().is_some())
    }
}

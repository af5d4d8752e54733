//! Query structures for collection and history scans
//!
//! A closed grammar, built directly by callers (the store never parses
//! filter text):
//!
//! ```text
//! Predicate := Compare(property, op, literal)
//!            | And(Predicate*)
//!            | Or(Predicate*)
//! op        := = | != | < | <= | > | >=
//! literal   := number | string | bool
//! ```
//!
//! Properties name top-level content fields; a dotted name (`a.b`) walks
//! into nested objects.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ComparisonOp {
    /// Returns the operator symbol
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => "=",
            ComparisonOp::Ne => "!=",
            ComparisonOp::Lt => "<",
            ComparisonOp::Le => "<=",
            ComparisonOp::Gt => ">",
            ComparisonOp::Ge => ">=",
        }
    }

    /// Returns true for `<`, `<=`, `>`, `>=`
    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            ComparisonOp::Lt | ComparisonOp::Le | ComparisonOp::Gt | ComparisonOp::Ge
        )
    }

    /// Whether `actual <op> literal` holds given their ordering.
    ///
    /// `None` means the values are incomparable (NaN); only `!=` holds.
    pub fn holds(&self, ordering: Option<Ordering>) -> bool {
        match ordering {
            None => *self == ComparisonOp::Ne,
            Some(ord) => match self {
                ComparisonOp::Eq => ord == Ordering::Equal,
                ComparisonOp::Ne => ord != Ordering::Equal,
                ComparisonOp::Lt => ord == Ordering::Less,
                ComparisonOp::Le => ord != Ordering::Greater,
                ComparisonOp::Gt => ord == Ordering::Greater,
                ComparisonOp::Ge => ord != Ordering::Less,
            },
        }
    }
}

impl fmt::Display for ComparisonOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ComparisonOp {
    type Err = String;

    /// Accepts both symbols and mnemonics (`>=` or `ge`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "=" | "==" | "eq" => Ok(ComparisonOp::Eq),
            "!=" | "ne" | "neq" => Ok(ComparisonOp::Ne),
            "<" | "lt" => Ok(ComparisonOp::Lt),
            "<=" | "le" | "lte" => Ok(ComparisonOp::Le),
            ">" | "gt" => Ok(ComparisonOp::Gt),
            ">=" | "ge" | "gte" => Ok(ComparisonOp::Ge),
            other => Err(format!("unknown comparison operator '{}'", other)),
        }
    }
}

/// Literal operand. Its type selects the comparison semantics.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
}

impl Literal {
    /// Converts a JSON scalar; arrays, objects and null have no literal form.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_f64().map(Literal::Number),
            Value::String(s) => Some(Literal::String(s.clone())),
            Value::Bool(b) => Some(Literal::Bool(*b)),
            _ => None,
        }
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Literal::Number(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Literal::Number(value as f64)
    }
}

impl From<i32> for Literal {
    fn from(value: i32) -> Self {
        Literal::Number(f64::from(value))
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Literal::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Literal::String(value)
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Literal::Bool(value)
    }
}

/// Filter predicate tree
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `property <op> literal`
    Compare {
        property: String,
        op: ComparisonOp,
        literal: Literal,
    },
    /// All children must match; empty matches everything.
    And(Vec<Predicate>),
    /// Any child must match; empty matches nothing.
    Or(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(
        property: impl Into<String>,
        op: ComparisonOp,
        literal: impl Into<Literal>,
    ) -> Self {
        Predicate::Compare {
            property: property.into(),
            op,
            literal: literal.into(),
        }
    }

    pub fn eq(property: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self::compare(property, ComparisonOp::Eq, literal)
    }

    pub fn ne(property: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self::compare(property, ComparisonOp::Ne, literal)
    }

    pub fn lt(property: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self::compare(property, ComparisonOp::Lt, literal)
    }

    pub fn le(property: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self::compare(property, ComparisonOp::Le, literal)
    }

    pub fn gt(property: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self::compare(property, ComparisonOp::Gt, literal)
    }

    pub fn ge(property: impl Into<String>, literal: impl Into<Literal>) -> Self {
        Self::compare(property, ComparisonOp::Ge, literal)
    }

    pub fn and(children: Vec<Predicate>) -> Self {
        Predicate::And(children)
    }

    pub fn or(children: Vec<Predicate>) -> Self {
        Predicate::Or(children)
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }

    /// Orient an ascending ordering.
    pub fn apply(&self, ordering: Ordering) -> Ordering {
        match self {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// What a sort key orders by
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortField {
    /// Snapshot modification time (ties by commit order).
    LastModified,
    /// A content property.
    Property(String),
}

impl SortField {
    /// `last_modified` names the metadata field; anything else is content.
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name == "last_modified" {
            SortField::LastModified
        } else {
            SortField::Property(name)
        }
    }
}

/// One sort key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortKey {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortKey {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: SortField::named(field),
            direction: SortDirection::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: SortField::named(field),
            direction: SortDirection::Desc,
        }
    }
}

/// Window `[offset, end)` over a sorted result set
///
/// `Slice::new(1, 2)` selects the single document at index 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Slice {
    /// Zero-based index of the first document returned
    pub offset: usize,
    /// Exclusive end index; `None` means all remaining
    pub end: Option<usize>,
}

impl Slice {
    pub fn new(offset: usize, end: usize) -> Self {
        Self {
            offset,
            end: Some(end),
        }
    }

    /// Number of documents the window can hold, if bounded.
    pub fn limit(&self) -> Option<usize> {
        self.end.map(|end| end.saturating_sub(self.offset))
    }

    /// The whole result set.
    pub fn all() -> Self {
        Self::default()
    }

    /// Starting at `offset`, to the end.
    pub fn starting_at(offset: usize) -> Self {
        Self { offset, end: None }
    }
}

/// A complete scan request: filter, sort keys and window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    /// Filter; `None` matches every document
    pub filter: Option<Predicate>,
    /// Sort keys in priority order; empty means the default order
    /// (`last_modified` descending)
    pub sort: Vec<SortKey>,
    /// Window applied after filtering and sorting
    pub slice: Slice,
}

impl Query {
    /// Match everything, default order, no window.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, predicate: Predicate) -> Self {
        self.filter = Some(predicate);
        self
    }

    pub fn with_sort(mut self, key: SortKey) -> Self {
        self.sort.push(key);
        self
    }

    pub fn with_slice(mut self, slice: Slice) -> Self {
        self.slice = slice;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_builder() {
        let query = Query::new()
            .with_filter(Predicate::ge("rating", 4))
            .with_sort(SortKey::asc("name"))
            .with_slice(Slice::new(1, 2));

        assert_eq!(query.filter, Some(Predicate::ge("rating", 4)));
        assert_eq!(query.sort.len(), 1);
        assert_eq!(query.slice.offset, 1);
        assert_eq!(query.slice.end, Some(2));
        assert_eq!(query.slice.limit(), Some(1));
        assert_eq!(Slice::new(4, 2).limit(), Some(0));
        assert_eq!(Slice::starting_at(3).limit(), None);
    }

    #[test]
    fn test_default_query_matches_all() {
        let query = Query::new();
        assert!(query.filter.is_none());
        assert!(query.sort.is_empty());
        assert_eq!(query.slice, Slice::all());
    }

    #[test]
    fn test_op_parsing() {
        assert_eq!(">=".parse::<ComparisonOp>(), Ok(ComparisonOp::Ge));
        assert_eq!("ne".parse::<ComparisonOp>(), Ok(ComparisonOp::Ne));
        assert!("~".parse::<ComparisonOp>().is_err());
    }

    #[test]
    fn test_op_holds() {
        use std::cmp::Ordering::*;
        assert!(ComparisonOp::Le.holds(Some(Equal)));
        assert!(ComparisonOp::Le.holds(Some(Less)));
        assert!(!ComparisonOp::Lt.holds(Some(Equal)));
        assert!(ComparisonOp::Ne.holds(None));
        assert!(!ComparisonOp::Eq.holds(None));
    }

    #[test]
    fn test_literal_from_json() {
        assert_eq!(Literal::from_json(&json!(4)), Some(Literal::Number(4.0)));
        assert_eq!(Literal::from_json(&json!("x")), Some(Literal::String("x".into())));
        assert_eq!(Literal::from_json(&json!(true)), Some(Literal::Bool(true)));
        assert_eq!(Literal::from_json(&json!(null)), None);
        assert_eq!(Literal::from_json(&json!([1])), None);
    }

    #[test]
    fn test_sort_field_named() {
        assert_eq!(SortField::named("last_modified"), SortField::LastModified);
        assert_eq!(SortField::named("issued"), SortField::Property("issued".into()));
    }
}

//! Typed query builder rendering to Solr standard query syntax.

use crate::value::FieldValue;
use std::fmt;

/// Characters with meaning in the Solr standard query parser.
const SPECIAL_CHARS: &[char] = &[
    '\\', '+', '-', '!', '(', ')', ':', '^', '[', ']', '"', '{', '}', '~', '*', '?', '|', '&', ';',
    '/',
];

/// Escape a term so the query parser treats it literally.
pub fn escape(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if SPECIAL_CHARS.contains(&c) || c.is_whitespace() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

pub(crate) fn render_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) => escape(s),
        FieldValue::Int(i) if *i < 0 => format!("\\{}", i),
        FieldValue::Float(f) if *f < 0.0 => format!("\\{}", f),
        other => other.to_string(),
    }
}

/// Query variants supported by the repository layer.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    /// Match all documents (`*:*`).
    MatchAll,
    /// Exact value on a field.
    Term(TermQuery),
    /// Numeric or lexical range on a field.
    Range(RangeQuery),
    /// Any of the clauses must match.
    Or(Vec<Query>),
    /// All of the clauses must match.
    And(Vec<Query>),
    /// Clause must not match.
    Not(Box<Query>),
    /// Raw Solr query string, passed through untouched.
    Raw(String),
}

impl Query {
    /// Match-all query.
    pub fn match_all() -> Self {
        Query::MatchAll
    }

    /// Term query on a field.
    pub fn term(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Query::Term(TermQuery::new(field, value))
    }

    /// Raw Solr query string.
    pub fn raw(query: impl Into<String>) -> Self {
        Query::Raw(query.into())
    }

    /// Disjunction of clauses.
    pub fn any_of(clauses: Vec<Query>) -> Self {
        Query::Or(clauses)
    }

    /// Conjunction of clauses.
    pub fn all_of(clauses: Vec<Query>) -> Self {
        Query::And(clauses)
    }

    /// Negation of a clause.
    pub fn negate(query: Query) -> Self {
        Query::Not(Box::new(query))
    }

    /// Render to Solr standard query syntax.
    pub fn to_solr(&self) -> String {
        match self {
            Query::MatchAll => "*:*".to_string(),
            Query::Term(t) => t.to_solr(),
            Query::Range(r) => r.to_solr(),
            Query::Or(clauses) => match clauses.as_slice() {
                [] => "(*:* -*:*)".to_string(),
                [single] => single.to_solr(),
                many => join(many, " OR "),
            },
            Query::And(clauses) => match clauses.as_slice() {
                [] => "*:*".to_string(),
                [single] => single.to_solr(),
                many => join(many, " AND "),
            },
            Query::Not(inner) => format!("(*:* -{})", inner.to_clause()),
            Query::Raw(raw) => raw.clone(),
        }
    }

    /// Render as an operand of a boolean operator. Raw text is grouped so
    /// its own operators cannot bind to neighbouring clauses.
    fn to_clause(&self) -> String {
        match self {
            Query::Raw(raw) if raw.trim() == "*:*" => "*:*".to_string(),
            Query::Raw(raw) => format!("({})", raw),
            Query::Or(clauses) | Query::And(clauses) if clauses.len() == 1 => {
                clauses[0].to_clause()
            }
            other => other.to_solr(),
        }
    }
}

fn join(clauses: &[Query], op: &str) -> String {
    let parts: Vec<String> = clauses.iter().map(Query::to_clause).collect();
    format!("({})", parts.join(op))
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_solr())
    }
}

impl From<TermQuery> for Query {
    fn from(query: TermQuery) -> Self {
        Query::Term(query)
    }
}

impl From<RangeQuery> for Query {
    fn from(query: RangeQuery) -> Self {
        Query::Range(query)
    }
}

/// Term query for exact matching.
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    /// Field name.
    pub field: String,
    /// Value to match. A string `"*"` matches any value unless the term
    /// is literal.
    pub value: FieldValue,
    /// Match the value exactly, even `"*"`.
    pub literal: bool,
}

impl TermQuery {
    /// Create a new term query.
    pub fn new(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            literal: false,
        }
    }

    /// Term query matching the value exactly. Used for caller-supplied
    /// arguments.
    pub fn literal(field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            literal: true,
            ..Self::new(field, value)
        }
    }

    /// Whether this term only checks that the field has a value.
    pub fn is_wildcard(&self) -> bool {
        !self.literal && matches!(&self.value, FieldValue::Str(s) if s == "*")
    }

    fn to_solr(&self) -> String {
        match &self.value {
            _ if self.is_wildcard() => format!("{}:*", self.field),
            value => format!("{}:{}", self.field, render_value(value)),
        }
    }
}

/// One end of a range.
#[derive(Debug, Clone, PartialEq)]
pub struct Bound {
    /// Bound value.
    pub value: FieldValue,
    /// Whether the bound itself is included.
    pub inclusive: bool,
}

/// Range query for numeric and lexical ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    /// Field name.
    pub field: String,
    /// Lower bound, open when `None`.
    pub lower: Option<Bound>,
    /// Upper bound, open when `None`.
    pub upper: Option<Bound>,
}

impl RangeQuery {
    /// Create an unbounded range on a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            lower: None,
            upper: None,
        }
    }

    /// Greater than.
    pub fn gt(mut self, value: impl Into<FieldValue>) -> Self {
        self.lower = Some(Bound {
            value: value.into(),
            inclusive: false,
        });
        self
    }

    /// Greater than or equal.
    pub fn gte(mut self, value: impl Into<FieldValue>) -> Self {
        self.lower = Some(Bound {
            value: value.into(),
            inclusive: true,
        });
        self
    }

    /// Less than.
    pub fn lt(mut self, value: impl Into<FieldValue>) -> Self {
        self.upper = Some(Bound {
            value: value.into(),
            inclusive: false,
        });
        self
    }

    /// Less than or equal.
    pub fn lte(mut self, value: impl Into<FieldValue>) -> Self {
        self.upper = Some(Bound {
            value: value.into(),
            inclusive: true,
        });
        self
    }

    /// Inclusive range on both ends.
    pub fn between(self, lower: impl Into<FieldValue>, upper: impl Into<FieldValue>) -> Self {
        self.gte(lower).lte(upper)
    }

    fn to_solr(&self) -> String {
        let open = match &self.lower {
            Some(b) if !b.inclusive => '{',
            _ => '[',
        };
        let close = match &self.upper {
            Some(b) if !b.inclusive => '}',
            _ => ']',
        };
        let lower = self
            .lower
            .as_ref()
            .map(|b| range_value(&b.value))
            .unwrap_or_else(|| "*".to_string());
        let upper = self
            .upper
            .as_ref()
            .map(|b| range_value(&b.value))
            .unwrap_or_else(|| "*".to_string());

        format!("{}:{}{} TO {}{}", self.field, open, lower, upper, close)
    }
}

// Inside brackets a leading minus is not an operator.
fn range_value(value: &FieldValue) -> String {
    match value {
        FieldValue::Str(s) => escape(s),
        other => other.to_string(),
    }
}

/// Builder composing queries programmatically.
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    query: Option<Query>,
}

impl QueryBuilder {
    /// Create a new query builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the query.
    pub fn query(mut self, query: Query) -> Self {
        self.query = Some(query);
        self
    }

    /// Match all documents.
    pub fn match_all(self) -> Self {
        self.query(Query::MatchAll)
    }

    /// Term query on a field.
    pub fn term(self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.query(Query::term(field, value))
    }

    /// Range query.
    pub fn range(self, range: RangeQuery) -> Self {
        self.query(range.into())
    }

    /// Raw query string.
    pub fn raw(self, query: impl Into<String>) -> Self {
        self.query(Query::raw(query))
    }

    /// Combine the current query with another using OR.
    pub fn or(mut self, other: Query) -> Self {
        self.query = Some(match self.query.take() {
            None => other,
            Some(Query::Or(mut clauses)) => {
                clauses.push(other);
                Query::Or(clauses)
            }
            Some(current) => Query::Or(vec![current, other]),
        });
        self
    }

    /// Combine the current query with another using AND.
    pub fn and(mut self, other: Query) -> Self {
        self.query = Some(match self.query.take() {
            None => other,
            Some(Query::And(mut clauses)) => {
                clauses.push(other);
                Query::And(clauses)
            }
            Some(current) => Query::And(vec![current, other]),
        });
        self
    }

    /// Negate the current query.
    pub fn not(mut self) -> Self {
        self.query = Some(Query::negate(self.query.take().unwrap_or(Query::MatchAll)));
        self
    }

    /// Build the query. Defaults to match-all.
    pub fn build(self) -> Query {
        self.query.unwrap_or(Query::MatchAll)
    }
}

//! Named queries loaded from an external mapping.
//!
//! A mapping file associates a symbolic name with a query template whose
//! values may refer to positional arguments:
//!
//! ```toml
//! [queries."Product.findByNameOrCategory"]
//! type = "or"
//! clauses = [
//!     { type = "term", field = "name", value = { param = 0 } },
//!     { type = "term", field = "cat", value = { param = 0 } },
//! ]
//! ```
//!
//! Legacy `.properties` files holding raw query strings with `?0`
//! placeholders are also accepted.

use crate::{
    error::{Result, SolrError},
    query::{Bound, Query, RangeQuery, TermQuery, render_value},
    value::FieldValue,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Named query file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    /// Structured templates in TOML.
    Toml,
    /// Structured templates in JSON.
    Json,
    /// `name=raw query` lines.
    Properties,
}

impl FileFormat {
    /// Detect the format from a file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(FileFormat::Toml),
            "json" => Some(FileFormat::Json),
            "properties" => Some(FileFormat::Properties),
            _ => None,
        }
    }
}

/// A value in a template: a literal or a positional argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TemplateValue {
    /// Positional argument, zero-based.
    Param {
        /// Argument index.
        param: usize,
    },
    /// Fixed value.
    Literal(FieldValue),
}

impl TemplateValue {
    fn bind(&self, args: &[FieldValue]) -> Result<FieldValue> {
        match self {
            TemplateValue::Param { param } => args.get(*param).cloned().ok_or_else(|| {
                SolrError::NamedQuery(format!(
                    "Parameter ?{} out of range ({} arguments given)",
                    param,
                    args.len()
                ))
            }),
            TemplateValue::Literal(value) => Ok(value.clone()),
        }
    }
}

/// Query template mirroring [`Query`] with parameterised values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryTemplate {
    /// Match all documents.
    MatchAll,
    /// Term on a field.
    Term {
        /// Field name.
        field: String,
        /// Value to match.
        value: TemplateValue,
    },
    /// Range on a field.
    Range {
        /// Field name.
        field: String,
        /// Exclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gt: Option<TemplateValue>,
        /// Inclusive lower bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        gte: Option<TemplateValue>,
        /// Exclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lt: Option<TemplateValue>,
        /// Inclusive upper bound.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lte: Option<TemplateValue>,
    },
    /// Any clause matches.
    Or {
        /// Clauses.
        clauses: Vec<QueryTemplate>,
    },
    /// All clauses match.
    And {
        /// Clauses.
        clauses: Vec<QueryTemplate>,
    },
    /// Clause does not match.
    Not {
        /// Negated clause.
        clause: Box<QueryTemplate>,
    },
    /// Raw query string with `?N` placeholders.
    Raw {
        /// Query text.
        query: String,
    },
}

impl QueryTemplate {
    /// Substitute positional arguments, producing a query.
    pub fn bind(&self, args: &[FieldValue]) -> Result<Query> {
        Ok(match self {
            QueryTemplate::MatchAll => Query::MatchAll,
            QueryTemplate::Term { field, value } => {
                let bound = value.bind(args)?;
                Query::Term(match value {
                    TemplateValue::Param { .. } => TermQuery::literal(field.clone(), bound),
                    TemplateValue::Literal(_) => TermQuery::new(field.clone(), bound),
                })
            }
            QueryTemplate::Range {
                field,
                gt,
                gte,
                lt,
                lte,
            } => {
                if gt.is_some() && gte.is_some() || lt.is_some() && lte.is_some() {
                    return Err(SolrError::NamedQuery(format!(
                        "Range on {} has conflicting bounds",
                        field
                    )));
                }
                let lower = bound(gt.as_ref(), gte.as_ref(), args)?;
                let upper = bound(lt.as_ref(), lte.as_ref(), args)?;
                Query::Range(RangeQuery {
                    field: field.clone(),
                    lower,
                    upper,
                })
            }
            QueryTemplate::Or { clauses } => Query::Or(bind_all(clauses, args)?),
            QueryTemplate::And { clauses } => Query::And(bind_all(clauses, args)?),
            QueryTemplate::Not { clause } => Query::negate(clause.bind(args)?),
            QueryTemplate::Raw { query } => Query::Raw(substitute(query, args)?),
        })
    }
}

fn bound(
    exclusive: Option<&TemplateValue>,
    inclusive: Option<&TemplateValue>,
    args: &[FieldValue],
) -> Result<Option<Bound>> {
    match (exclusive, inclusive) {
        (Some(v), _) => Ok(Some(Bound {
            value: v.bind(args)?,
            inclusive: false,
        })),
        (None, Some(v)) => Ok(Some(Bound {
            value: v.bind(args)?,
            inclusive: true,
        })),
        (None, None) => Ok(None),
    }
}

fn bind_all(clauses: &[QueryTemplate], args: &[FieldValue]) -> Result<Vec<Query>> {
    clauses.iter().map(|c| c.bind(args)).collect()
}

/// Replace `?N` placeholders with escaped argument text.
fn substitute(template: &str, args: &[FieldValue]) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if c == '?' && !escaped && chars.peek().is_some_and(|n| n.is_ascii_digit()) {
            let mut digits = String::new();
            while let Some(d) = chars.next_if(|n| n.is_ascii_digit()) {
                digits.push(d);
            }
            let index: usize = digits
                .parse()
                .map_err(|_| SolrError::NamedQuery(format!("Invalid placeholder ?{}", digits)))?;
            let value = TemplateValue::Param { param: index }.bind(args)?;
            out.push_str(&render_value(&value));
            escaped = false;
            continue;
        }
        escaped = c == '\\' && !escaped;
        out.push(c);
    }

    Ok(out)
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct NamedQueryFile {
    #[serde(default)]
    queries: HashMap<String, QueryTemplate>,
}

/// Mapping of query names to templates.
#[derive(Debug, Clone, Default)]
pub struct NamedQueries {
    queries: HashMap<String, QueryTemplate>,
}

impl NamedQueries {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a template, replacing any previous one with the same name.
    pub fn insert(&mut self, name: impl Into<String>, template: QueryTemplate) {
        self.queries.insert(name.into(), template);
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, template: QueryTemplate) -> Self {
        self.insert(name, template);
        self
    }

    /// Look up a template.
    pub fn get(&self, name: &str) -> Option<&QueryTemplate> {
        self.queries.get(name)
    }

    /// Check if a name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.queries.contains_key(name)
    }

    /// Number of registered queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Check if the mapping is empty.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.queries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Add every query from `other`, overriding existing names.
    pub fn merge(&mut self, other: NamedQueries) {
        self.queries.extend(other.queries);
    }

    /// Resolve a name and bind its arguments.
    pub fn resolve(&self, name: &str, args: &[FieldValue]) -> Result<Query> {
        let template = self
            .get(name)
            .ok_or_else(|| SolrError::NamedQuery(format!("Unknown named query: {}", name)))?;
        template.bind(args)
    }

    /// Load a mapping file, detecting the format from its extension.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| SolrError::Config(format!("No file extension: {}", path.display())))?;
        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| SolrError::Config(format!("Unsupported named query format: {}", ext)))?;

        let content = std::fs::read_to_string(path)?;
        let queries = Self::parse(&content, format)?;
        debug!(path = %path.display(), count = queries.len(), "Loaded named queries");
        Ok(queries)
    }

    /// Parse mapping content in the given format.
    pub fn parse(content: &str, format: FileFormat) -> Result<Self> {
        let queries = match format {
            FileFormat::Toml => {
                toml::from_str::<NamedQueryFile>(content)
                    .map_err(|e| SolrError::Config(format!("TOML parse error: {}", e)))?
                    .queries
            }
            FileFormat::Json => {
                serde_json::from_str::<NamedQueryFile>(content)
                    .map_err(|e| SolrError::Config(format!("JSON parse error: {}", e)))?
                    .queries
            }
            FileFormat::Properties => parse_properties(content)?,
        };
        Ok(Self { queries })
    }
}

fn parse_properties(content: &str) -> Result<HashMap<String, QueryTemplate>> {
    let mut queries = HashMap::new();
    for (number, line) in logical_lines(content) {
        let (name, query) = split_property(&line);
        if name.is_empty() {
            return Err(SolrError::Config(format!("Line {}: empty query name", number)));
        }
        if query.is_empty() {
            return Err(SolrError::Config(format!(
                "Line {}: no query given for {}",
                number, name
            )));
        }
        queries.insert(
            name,
            QueryTemplate::Raw {
                query: query.to_string(),
            },
        );
    }
    Ok(queries)
}

/// Join `\`-continued lines, dropping blanks and comments. Yields the
/// 1-based number of each entry's first line.
fn logical_lines(content: &str) -> Vec<(usize, String)> {
    let mut entries = Vec::new();
    let mut pending: Option<(usize, String)> = None;

    for (index, line) in content.lines().enumerate() {
        let line = line.trim_start();
        let comment = line.starts_with('#') || line.starts_with('!');
        if pending.is_none() && (line.is_empty() || comment) {
            continue;
        }
        let trailing = line.chars().rev().take_while(|c| *c == '\\').count();
        let continues = trailing % 2 == 1;
        let text = if continues { &line[..line.len() - 1] } else { line };

        let (number, mut joined) = pending.take().unwrap_or((index + 1, String::new()));
        joined.push_str(text);
        if continues {
            pending = Some((number, joined));
        } else {
            entries.push((number, joined));
        }
    }
    entries.extend(pending);
    entries
}

/// Split at the first unescaped `=`, `:` or whitespace. Escapes are
/// resolved in the key; the query text is kept as written.
fn split_property(line: &str) -> (String, &str) {
    let mut key = String::new();
    let mut chars = line.char_indices();
    let mut rest = "";
    let mut separated_by_space = false;

    while let Some((i, c)) = chars.next() {
        match c {
            '\\' => {
                if let Some((_, next)) = chars.next() {
                    key.push(next);
                }
            }
            '=' | ':' => {
                rest = &line[i + 1..];
                break;
            }
            c if c.is_whitespace() => {
                rest = &line[i + c.len_utf8()..];
                separated_by_space = true;
                break;
            }
            c => key.push(c),
        }
    }

    let mut value = rest.trim_start();
    if separated_by_space {
        if let Some(stripped) = value.strip_prefix(['=', ':']) {
            value = stripped.trim_start();
        }
    }
    (key, value.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
        [queries."Product.findByNameOrCategory"]
        type = "or"
        clauses = [
            { type = "term", field = "name", value = { param = 0 } },
            { type = "term", field = "cat", value = { param = 0 } },
        ]

        [queries."Product.findPopularInStock"]
        type = "and"
        clauses = [
            { type = "range", field = "popularity", gte = { param = 0 } },
            { type = "term", field = "inStock", value = true },
        ]
    "#;

    #[test]
    fn test_parse_toml() {
        let queries = NamedQueries::parse(TOML, FileFormat::Toml).unwrap();
        assert_eq!(
            queries.names(),
            vec!["Product.findByNameOrCategory", "Product.findPopularInStock"]
        );

        let query = queries
            .resolve("Product.findByNameOrCategory", &["solr".into()])
            .unwrap();
        assert_eq!(query.to_solr(), "(name:solr OR cat:solr)");

        let query = queries
            .resolve("Product.findPopularInStock", &[100.into()])
            .unwrap();
        assert_eq!(query.to_solr(), "(popularity:[100 TO *] AND inStock:true)");
    }

    #[test]
    fn test_parse_json() {
        let json = r#"{
            "queries": {
                "Product.notCheap": {
                    "type": "not",
                    "clause": { "type": "range", "field": "price", "lt": { "param": 0 } }
                }
            }
        }"#;
        let queries = NamedQueries::parse(json, FileFormat::Json).unwrap();
        let query = queries.resolve("Product.notCheap", &[10.5.into()]).unwrap();
        assert_eq!(query.to_solr(), "(*:* -price:[* TO 10.5})");
    }

    #[test]
    fn test_parse_properties() {
        let content = "# legacy mapping\n\
                       Product.findByNameOrCategory=name:?0 OR cat:?0\n\
                       \n\
                       ! another comment\n\
                       Product.findAbove = popularity:[?0 TO *]\n";
        let queries = NamedQueries::parse(content, FileFormat::Properties).unwrap();
        assert_eq!(queries.len(), 2);

        let query = queries
            .resolve("Product.findByNameOrCategory", &["ipod nano".into()])
            .unwrap();
        assert_eq!(query, Query::Raw("name:ipod\\ nano OR cat:ipod\\ nano".to_string()));

        let query = queries.resolve("Product.findAbove", &[10000.into()]).unwrap();
        assert_eq!(query.to_solr(), "popularity:[10000 TO *]");
    }

    #[test]
    fn test_bound_star_is_literal_in_every_format() {
        let queries = NamedQueries::parse(TOML, FileFormat::Toml).unwrap();
        let query = queries
            .resolve("Product.findByNameOrCategory", &["*".into()])
            .unwrap();
        assert_eq!(query.to_solr(), "(name:\\* OR cat:\\*)");

        let content = "Product.findByNameOrCategory=name:?0 OR cat:?0\n";
        let queries = NamedQueries::parse(content, FileFormat::Properties).unwrap();
        let query = queries
            .resolve("Product.findByNameOrCategory", &["*".into()])
            .unwrap();
        assert_eq!(query.to_solr(), "name:\\* OR cat:\\*");

        let template = QueryTemplate::Term {
            field: "name".to_string(),
            value: TemplateValue::Literal("*".into()),
        };
        assert_eq!(template.bind(&[]).unwrap().to_solr(), "name:*");
    }

    #[test]
    fn test_properties_separators_and_continuations() {
        let content = "Product.byName name:?0\n\
                       Product.byCat\t= cat:?0\n\
                       Product.either = name:?0 \\\n\
                       \x20   OR cat:?0\n\
                       Product\\:escaped=id:?0\n";
        let queries = NamedQueries::parse(content, FileFormat::Properties).unwrap();
        assert_eq!(
            queries.names(),
            vec!["Product.byCat", "Product.byName", "Product.either", "Product:escaped"]
        );

        let args: [FieldValue; 1] = ["x".into()];
        assert_eq!(queries.resolve("Product.byName", &args).unwrap(), Query::raw("name:x"));
        assert_eq!(queries.resolve("Product.byCat", &args).unwrap(), Query::raw("cat:x"));
        assert_eq!(
            queries.resolve("Product.either", &args).unwrap(),
            Query::raw("name:x OR cat:x")
        );
        assert_eq!(queries.resolve("Product:escaped", &args).unwrap(), Query::raw("id:x"));
    }

    #[test]
    fn test_properties_without_query_are_rejected() {
        let err = NamedQueries::parse("Product.findX\n", FileFormat::Properties).unwrap_err();
        assert!(matches!(err, SolrError::Config(_)));

        let err = NamedQueries::parse("=name:?0\n", FileFormat::Properties).unwrap_err();
        assert!(matches!(err, SolrError::Config(_)));
    }

    #[test]
    fn test_substitute_skips_escaped_marks() {
        let out = substitute("name:what\\?1 AND cat:?0", &["a".into()]).unwrap();
        assert_eq!(out, "name:what\\?1 AND cat:a");
    }

    #[test]
    fn test_binding_errors() {
        let queries = NamedQueries::parse(TOML, FileFormat::Toml).unwrap();

        let err = queries.resolve("Product.findByNameOrCategory", &[]).unwrap_err();
        assert!(matches!(err, SolrError::NamedQuery(_)));

        let err = queries.resolve("Product.missing", &["x".into()]).unwrap_err();
        assert!(matches!(err, SolrError::NamedQuery(_)));

        let template = QueryTemplate::Range {
            field: "popularity".to_string(),
            gt: Some(TemplateValue::Literal(1.into())),
            gte: Some(TemplateValue::Literal(2.into())),
            lt: None,
            lte: None,
        };
        assert!(matches!(template.bind(&[]), Err(SolrError::NamedQuery(_))));
    }

    #[test]
    fn test_merge_overrides() {
        let mut base = NamedQueries::new().with("q", QueryTemplate::MatchAll);
        let other = NamedQueries::new().with(
            "q",
            QueryTemplate::Raw {
                query: "id:1".to_string(),
            },
        );
        base.merge(other);
        assert_eq!(base.resolve("q", &[]).unwrap(), Query::raw("id:1"));
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(FileFormat::from_extension("TOML"), Some(FileFormat::Toml));
        assert_eq!(
            FileFormat::from_extension("properties"),
            Some(FileFormat::Properties)
        );
        assert_eq!(FileFormat::from_extension("yaml"), None);
    }
}

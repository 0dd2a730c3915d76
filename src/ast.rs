//! Defines the compiled object graph a query is built from.
//!
//! Everything here is immutable after construction, so one compiled query can
//! be evaluated any number of times against any number of trees.

use regex::Regex;
use std::fmt;

/// The top-level compiled query: an ordered chain of selectors separated by
/// (implicit) descendant search.
#[derive(Debug, Clone, PartialEq)]
pub struct Expression {
    pub selector: Selector,
    pub rest: Option<Box<Expression>>,
}

/// One match step: an optional per-node test plus an optional structural
/// relationship to the context node. An absent relationship means
/// "self-or-descendant".
#[derive(Debug, Clone, PartialEq)]
pub struct Selector {
    pub relationship: Option<Relationship>,
    pub basic: Option<BasicSelector>,
}

/// Narrows the candidate set relative to the context node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relationship {
    /// `>`: immediate children.
    Child,
    /// `+`: the single sibling immediately following.
    AdjacentSibling,
    /// `~`: every later sibling.
    GeneralSibling,
}

/// A node-type test plus optional attribute predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct BasicSelector {
    pub node_type: String,
    pub attributes: Option<AttributeList>,
}

/// A conjunction of attribute predicates. Matches iff every predicate matches.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeList {
    pub attributes: Vec<Attribute>,
}

/// A `[key op value]` predicate on a value resolved via a dotted path.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub key: KeyPath,
    pub operator: Operator,
    pub value: Value,
}

/// A dotted attribute path, split into segments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    pub segments: Vec<String>,
}

impl KeyPath {
    pub fn new(segments: Vec<String>) -> Self {
        Self { segments }
    }
}

/// A comparison operator inside an attribute predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equal,
    NotEqual,
    StartsWith,
    EndsWith,
    Contains,
    GreaterThan,
    GreaterThanOrEqual,
    LessThan,
    LessThanOrEqual,
    Match,
    NotMatch,
    In,
    NotIn,
}

/// The value side of an attribute predicate.
#[derive(Debug, Clone)]
pub enum Value {
    Boolean(bool),
    /// A bare word, compared against the target's source text.
    Identifier(String),
    Null,
    Number(f64),
    Regexp(Regex),
    String(String),
    Undefined,
    /// An ordered list, used with `IN`/`NOT IN` and whole-sequence equality.
    Array(Vec<Value>),
    /// A nested selector, for structural comparisons like `[body=.Block]`.
    Selector(Box<BasicSelector>),
    /// A key path resolved against the node under test at match time.
    Dynamic(KeyPath),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Identifier(a), Value::Identifier(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Number(a), Value::Number(b)) => a == b,
            // Compiled regexes compare by their source pattern.
            (Value::Regexp(a), Value::Regexp(b)) => a.as_str() == b.as_str(),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Undefined, Value::Undefined) => true,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Selector(a), Value::Selector(b)) => a == b,
            (Value::Dynamic(a), Value::Dynamic(b)) => a == b,
            _ => false,
        }
    }
}

/// Renders a number the way the query language writes it: fractionless values
/// print as integers.
pub(crate) fn format_number(value: f64) -> String {
    if value.is_finite() && value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

// --- Display: the diagnostic form of a compiled query. Re-parses to an
// --- equivalent query, though not guaranteed byte-identical to the source.

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.selector)?;
        if let Some(rest) = &self.rest {
            write!(f, " {}", rest)?;
        }
        Ok(())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(relationship) = &self.relationship {
            write!(f, "{} ", relationship)?;
        }
        if let Some(basic) = &self.basic {
            write!(f, "{}", basic)?;
        }
        Ok(())
    }
}

impl fmt::Display for Relationship {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Relationship::Child => write!(f, ">"),
            Relationship::AdjacentSibling => write!(f, "+"),
            Relationship::GeneralSibling => write!(f, "~"),
        }
    }
}

impl fmt::Display for BasicSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, ".{}", self.node_type)?;
        if let Some(attributes) = &self.attributes {
            write!(f, "{}", attributes)?;
        }
        Ok(())
    }
}

impl fmt::Display for AttributeList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for attribute in &self.attributes {
            write!(f, "{}", attribute)?;
        }
        Ok(())
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}{}{}]", self.key, self.operator, self.value)
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operator::Equal => write!(f, "="),
            Operator::NotEqual => write!(f, "!="),
            Operator::StartsWith => write!(f, "^="),
            Operator::EndsWith => write!(f, "$="),
            Operator::Contains => write!(f, "*="),
            Operator::GreaterThan => write!(f, ">"),
            Operator::GreaterThanOrEqual => write!(f, ">="),
            Operator::LessThan => write!(f, "<"),
            Operator::LessThanOrEqual => write!(f, "<="),
            Operator::Match => write!(f, "=~"),
            Operator::NotMatch => write!(f, "!~"),
            Operator::In => write!(f, " IN "),
            Operator::NotIn => write!(f, " NOT IN "),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Identifier(name) => write!(f, "{}", name),
            Value::Null => write!(f, "nil"),
            Value::Number(n) => write!(f, "{}", format_number(*n)),
            Value::Regexp(re) => write!(f, "/{}/", re.as_str()),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::Undefined => write!(f, "undefined"),
            Value::Array(elements) => {
                write!(f, "(")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, ")")
            }
            Value::Selector(basic) => write!(f, "{}", basic),
            Value::Dynamic(path) => write!(f, "{{{{{}}}}}", path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attribute(key: &str, operator: Operator, value: Value) -> Attribute {
        Attribute {
            key: KeyPath::new(key.split('.').map(String::from).collect()),
            operator,
            value,
        }
    }

    #[test]
    fn test_display_basic_selector() {
        let selector = BasicSelector {
            node_type: "IfStatement".to_string(),
            attributes: None,
        };
        assert_eq!(selector.to_string(), ".IfStatement");
    }

    #[test]
    fn test_display_attribute_list() {
        let list = AttributeList {
            attributes: vec![
                attribute("key", Operator::Equal, Value::Identifier("value".into())),
                attribute("key2", Operator::NotEqual, Value::Identifier("value2".into())),
            ],
        };
        assert_eq!(list.to_string(), "[key=value][key2!=value2]");
    }

    #[test]
    fn test_display_expression_chain() {
        let expr = Expression {
            selector: Selector {
                relationship: None,
                basic: Some(BasicSelector {
                    node_type: "IfStatement".to_string(),
                    attributes: None,
                }),
            },
            rest: Some(Box::new(Expression {
                selector: Selector {
                    relationship: Some(Relationship::Child),
                    basic: Some(BasicSelector {
                        node_type: "Block".to_string(),
                        attributes: Some(AttributeList {
                            attributes: vec![attribute(
                                "statements.length",
                                Operator::Equal,
                                Value::Number(0.0),
                            )],
                        }),
                    }),
                },
                rest: None,
            })),
        };
        assert_eq!(
            expr.to_string(),
            ".IfStatement > .Block[statements.length=0]"
        );
    }

    #[test]
    fn test_display_membership_and_array() {
        let attr = attribute(
            "kind",
            Operator::In,
            Value::Array(vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0),
            ]),
        );
        assert_eq!(attr.to_string(), "[kind IN (1, 2, 3)]");
    }

    #[test]
    fn test_display_dynamic_attribute() {
        let attr = attribute(
            "left",
            Operator::Equal,
            Value::Dynamic(KeyPath::new(vec!["right".to_string()])),
        );
        assert_eq!(attr.to_string(), "[left={{right}}]");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_number(0.0), "0");
        assert_eq!(format_number(10.0), "10");
        assert_eq!(format_number(1.5), "1.5");
        assert_eq!(format_number(-3.0), "-3");
    }

    #[test]
    fn test_regexp_values_compare_by_pattern() {
        let a = Value::Regexp(Regex::new("^foo").unwrap());
        let b = Value::Regexp(Regex::new("^foo").unwrap());
        let c = Value::Regexp(Regex::new("bar$").unwrap());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}

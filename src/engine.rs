//! Evaluates a compiled query against any tree whose nodes implement
//! [`AstNode`].

use crate::adapter::{AstNode, Resolved};
use crate::ast::{
    Attribute, AttributeList, BasicSelector, Expression, KeyPath, Operator, Relationship, Selector,
    Value, format_number,
};
use crate::axes;
use crate::error::QueryError;
use regex::Regex;

/// Walks the tree rooted at `root` once and returns every matching node, in
/// depth-first preorder per match step. Matching is a pure function of the
/// compiled query and the tree; calling this twice returns identical lists.
pub fn query_nodes<'a, N>(expr: &Expression, root: N) -> Result<Vec<N>, QueryError>
where
    N: AstNode<'a> + 'a,
{
    log::trace!("querying '{}' against {}", expr, root.type_name());
    query_expression(expr, root, true)
}

/// Answers membership for a single node, without enumerating its descendants.
pub fn match_node<'a, N>(expr: &Expression, node: N) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    Ok(!query_expression(expr, node, false)?.is_empty())
}

fn query_expression<'a, N>(
    expr: &Expression,
    node: N,
    descendant_match: bool,
) -> Result<Vec<N>, QueryError>
where
    N: AstNode<'a> + 'a,
{
    let matched = query_selector(&expr.selector, node, descendant_match)?;
    let Some(rest) = &expr.rest else {
        return Ok(matched);
    };
    // The continuation fans out over each matched node, preserving per-match
    // order; results concatenate without deduplication.
    let mut results = Vec::new();
    for context in matched {
        results.extend(query_expression(rest, context, true)?);
    }
    Ok(results)
}

fn query_selector<'a, N>(
    selector: &Selector,
    node: N,
    descendant_match: bool,
) -> Result<Vec<N>, QueryError>
where
    N: AstNode<'a> + 'a,
{
    let mut candidates = Vec::new();
    match selector.relationship {
        Some(Relationship::Child) => axes::collect_children(node, &mut candidates),
        Some(Relationship::AdjacentSibling) => axes::collect_adjacent_sibling(node, &mut candidates),
        Some(Relationship::GeneralSibling) => axes::collect_general_siblings(node, &mut candidates),
        None if descendant_match => axes::collect_self_and_descendants(node, &mut candidates),
        None => candidates.push(node),
    }

    let mut results = Vec::new();
    for candidate in candidates {
        if match_selector(selector, candidate)? {
            results.push(candidate);
        }
    }
    Ok(results)
}

fn match_selector<'a, N>(selector: &Selector, node: N) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    match &selector.basic {
        None => Ok(true),
        Some(basic) => match_basic_selector(basic, node),
    }
}

fn match_basic_selector<'a, N>(basic: &BasicSelector, node: N) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    if node.type_name() != basic.node_type {
        return Ok(false);
    }
    match &basic.attributes {
        None => Ok(true),
        Some(list) => match_attribute_list(list, node),
    }
}

fn match_attribute_list<'a, N>(list: &AttributeList, node: N) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    for attribute in &list.attributes {
        if !match_attribute(attribute, node)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn match_attribute<'a, N>(attribute: &Attribute, node: N) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    let target = resolve_path(node, &attribute.key)?;
    match_value(&attribute.value, &target, attribute.operator, node)
}

// --- Key-path resolution ---

/// Resolves a dotted key path against a node. Node segments go through the
/// adapter's reflective lookup; sequence and text targets understand the
/// generic segments below. A segment that fails to resolve makes the rest of
/// the path `Absent`.
fn resolve_path<'a, N>(node: N, key: &KeyPath) -> Result<Resolved<N>, QueryError>
where
    N: AstNode<'a> + 'a,
{
    let mut current = Resolved::Node(node);
    for segment in &key.segments {
        current = match current {
            Resolved::Node(target) => target.resolve(segment)?.unwrap_or(Resolved::Absent),
            Resolved::Nodes(list) => resolve_sequence_segment(&list, segment),
            Resolved::Text(text) => resolve_text_segment(&text, segment),
            _ => Resolved::Absent,
        };
        if current == Resolved::Absent {
            break;
        }
    }
    Ok(current)
}

/// Segments every node sequence understands, mirroring what a reflective
/// lookup finds on a host list type.
fn resolve_sequence_segment<N: Copy>(list: &[N], segment: &str) -> Resolved<N> {
    match segment {
        "length" | "size" => Resolved::Number(list.len() as f64),
        "first" => list.first().map(|&n| Resolved::Node(n)).unwrap_or(Resolved::Absent),
        "last" => list.last().map(|&n| Resolved::Node(n)).unwrap_or(Resolved::Absent),
        index => match index.parse::<usize>() {
            Ok(index) => list
                .get(index)
                .map(|&n| Resolved::Node(n))
                .unwrap_or(Resolved::Absent),
            Err(_) => Resolved::Absent,
        },
    }
}

fn resolve_text_segment<N>(text: &str, segment: &str) -> Resolved<N> {
    match segment {
        "length" | "size" => Resolved::Number(text.chars().count() as f64),
        _ => Resolved::Absent,
    }
}

// --- Value comparison ---

fn match_value<'a, N>(
    value: &Value,
    target: &Resolved<N>,
    operator: Operator,
    base: N,
) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    match value {
        Value::Boolean(expected) => {
            match_text(&expected.to_string(), target, operator, "boolean")
        }
        Value::Identifier(expected) => match_text(expected, target, operator, "identifier"),
        Value::Null => match_text("nil", target, operator, "null"),
        Value::Undefined => match_text("undefined", target, operator, "undefined"),
        Value::String(expected) => match_string(expected, target, operator),
        Value::Number(expected) => match_number(*expected, target, operator),
        Value::Regexp(pattern) => match_regexp(pattern, target, operator),
        Value::Array(elements) => match_array(elements, target, operator, base),
        Value::Selector(basic) => match_nested_selector(basic, target, operator),
        Value::Dynamic(path) => match_dynamic(path, target, operator, base),
    }
}

/// Renders a resolved target the way the comparison layer sees it.
fn actual_text<'a, N>(target: &Resolved<N>) -> String
where
    N: AstNode<'a> + 'a,
{
    match target {
        Resolved::Node(node) => node.source_text(),
        Resolved::Nodes(nodes) => {
            let sources: Vec<String> = nodes.iter().map(|n| n.source_text()).collect();
            format!("({})", sources.join(", "))
        }
        Resolved::Text(text) => text.clone(),
        Resolved::Number(n) => format_number(*n),
        Resolved::Bool(b) => b.to_string(),
        Resolved::Null => "nil".to_string(),
        Resolved::Absent => "undefined".to_string(),
    }
}

fn match_text<'a, N>(
    expected: &str,
    target: &Resolved<N>,
    operator: Operator,
    kind: &'static str,
) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    compare_text(&actual_text(target), expected, operator, kind)
}

/// The default comparison semantics shared by the scalar value kinds.
fn compare_text(
    actual: &str,
    expected: &str,
    operator: Operator,
    kind: &'static str,
) -> Result<bool, QueryError> {
    match operator {
        Operator::Equal => Ok(actual == expected),
        Operator::NotEqual => Ok(actual != expected),
        Operator::StartsWith => Ok(actual.starts_with(expected)),
        Operator::EndsWith => Ok(actual.ends_with(expected)),
        Operator::Contains => Ok(actual.contains(expected)),
        other => Err(QueryError::unsupported_operator(other, kind)),
    }
}

fn match_string<'a, N>(
    expected: &str,
    target: &Resolved<N>,
    operator: Operator,
) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    // A node target is assumed to be a quoted literal; its source text is
    // dequoted before comparing. Plain text targets compare as-is.
    let actual = match target {
        Resolved::Node(node) => dequote(&node.source_text()),
        other => actual_text(other),
    };
    compare_text(&actual, expected, operator, "string")
}

/// Strips one matching pair of surrounding quotes from a string literal's
/// source text. Unquoted text is returned unchanged.
fn dequote(source: &str) -> String {
    let bytes = source.as_bytes();
    if bytes.len() >= 2
        && (bytes[0] == b'"' || bytes[0] == b'\'')
        && bytes[bytes.len() - 1] == bytes[0]
    {
        source[1..source.len() - 1].to_string()
    } else {
        source.to_string()
    }
}

fn match_number<'a, N>(
    expected: f64,
    target: &Resolved<N>,
    operator: Operator,
) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    // Ordering is evaluated on parsed numbers, never on their string forms.
    let actual: Option<f64> = match target {
        Resolved::Number(n) => Some(*n),
        Resolved::Node(node) => node.source_text().trim().parse().ok(),
        Resolved::Text(text) => text.trim().parse().ok(),
        _ => None,
    };
    match operator {
        Operator::Equal => Ok(actual.is_some_and(|a| a == expected)),
        Operator::NotEqual => Ok(actual.is_none_or(|a| a != expected)),
        Operator::GreaterThan => Ok(actual.is_some_and(|a| a > expected)),
        Operator::GreaterThanOrEqual => Ok(actual.is_some_and(|a| a >= expected)),
        Operator::LessThan => Ok(actual.is_some_and(|a| a < expected)),
        Operator::LessThanOrEqual => Ok(actual.is_some_and(|a| a <= expected)),
        other => Err(QueryError::unsupported_operator(other, "number")),
    }
}

fn match_regexp<'a, N>(
    pattern: &Regex,
    target: &Resolved<N>,
    operator: Operator,
) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    let text = match target {
        Resolved::Node(node) => node.source_text(),
        other => actual_text(other),
    };
    match operator {
        Operator::Equal | Operator::Match => Ok(pattern.is_match(&text)),
        Operator::NotEqual | Operator::NotMatch => Ok(!pattern.is_match(&text)),
        other => Err(QueryError::unsupported_operator(other, "regexp")),
    }
}

fn match_array<'a, N>(
    elements: &[Value],
    target: &Resolved<N>,
    operator: Operator,
    base: N,
) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    match operator {
        // Membership is only defined for single targets; a sequence target
        // never participates.
        Operator::In => match target {
            Resolved::Nodes(_) => Ok(false),
            single => {
                for element in elements {
                    if match_value(element, single, Operator::Equal, base)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        },
        Operator::NotIn => match target {
            Resolved::Nodes(_) => Ok(false),
            single => {
                for element in elements {
                    if !match_value(element, single, Operator::NotEqual, base)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        },
        Operator::Equal => match target {
            Resolved::Nodes(nodes) => positional_match(elements, nodes, base),
            _ => Ok(false),
        },
        Operator::NotEqual => match target {
            Resolved::Nodes(nodes) => Ok(!positional_match(elements, nodes, base)?),
            _ => Ok(true),
        },
        other => Err(QueryError::unsupported_operator(other, "array")),
    }
}

/// Same length and every positional pair equal.
fn positional_match<'a, N>(elements: &[Value], nodes: &[N], base: N) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    if elements.len() != nodes.len() {
        return Ok(false);
    }
    for (element, node) in elements.iter().zip(nodes) {
        if !match_value(element, &Resolved::Node(*node), Operator::Equal, base)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn match_nested_selector<'a, N>(
    basic: &BasicSelector,
    target: &Resolved<N>,
    operator: Operator,
) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    let holds = match target {
        Resolved::Node(node) => match_basic_selector(basic, *node)?,
        Resolved::Nodes(nodes) if !nodes.is_empty() => {
            let mut all = true;
            for node in nodes {
                if !match_basic_selector(basic, *node)? {
                    all = false;
                    break;
                }
            }
            all
        }
        _ => false,
    };
    match operator {
        Operator::Equal => Ok(holds),
        Operator::NotEqual => Ok(!holds),
        other => Err(QueryError::unsupported_operator(other, "selector")),
    }
}

fn match_dynamic<'a, N>(
    path: &KeyPath,
    target: &Resolved<N>,
    operator: Operator,
    base: N,
) -> Result<bool, QueryError>
where
    N: AstNode<'a> + 'a,
{
    // The expected side resolves against the same node under test.
    let expected_target = resolve_path(base, path)?;
    let actual = actual_text(target);
    let expected = actual_text(&expected_target);
    match operator {
        Operator::Equal
        | Operator::NotEqual
        | Operator::StartsWith
        | Operator::EndsWith
        | Operator::Contains => compare_text(&actual, &expected, operator, "dynamic attribute"),
        Operator::GreaterThan
        | Operator::GreaterThanOrEqual
        | Operator::LessThan
        | Operator::LessThanOrEqual => {
            match (actual.trim().parse::<f64>(), expected.trim().parse::<f64>()) {
                (Ok(a), Ok(e)) => Ok(match operator {
                    Operator::GreaterThan => a > e,
                    Operator::GreaterThanOrEqual => a >= e,
                    Operator::LessThan => a < e,
                    _ => a <= e,
                }),
                _ => Ok(false),
            }
        }
        other => Err(QueryError::unsupported_operator(other, "dynamic attribute")),
    }
}

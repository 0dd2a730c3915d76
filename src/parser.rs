//! A `nom`-based parser for the query language.

use crate::ast::{
    Attribute, AttributeList, BasicSelector, Expression, KeyPath, Operator, Relationship, Selector,
    Value,
};
use crate::error::QueryError;
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{escaped, is_not, tag, tag_no_case, take_while, take_while1},
    character::complete::{anychar, char, digit1, multispace0, multispace1},
    combinator::{map, map_res, opt, recognize},
    multi::{many0, separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
};
use regex::Regex;

// --- Main Public Parser ---

/// Compiles query text into an [`Expression`]. Compilation is atomic: either
/// the whole query parses, or a syntax error is returned and nothing matches.
pub fn parse_query(input: &str) -> Result<Expression, QueryError> {
    match expression(input.trim()) {
        Ok(("", expr)) => {
            log::trace!("compiled query '{}'", expr);
            Ok(expr)
        }
        Ok((rem, _)) => Err(QueryError::syntax(
            input,
            format!("Parser did not consume all input. Remainder: '{}'", rem),
        )),
        Err(e) => Err(QueryError::syntax(input, e.to_string())),
    }
}

// --- Combinators & Helpers ---

fn ws<'a, F, O, E>(inner: F) -> impl Parser<&'a str, Output = O, Error = E>
where
    F: Parser<&'a str, Output = O, Error = E>,
    E: nom::error::ParseError<&'a str>,
{
    delimited(multispace0, inner, multispace0)
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        take_while1(|c: char| c.is_alphabetic() || c == '_' || c == '$'),
        take_while(|c: char| c.is_alphanumeric() || c == '_' || c == '$'),
    ))
    .parse(input)
}

// --- Expression / Selector Parsers ---

fn expression(input: &str) -> IResult<&str, Expression> {
    let (input, first) = selector(input)?;
    let (input, rest) = many0(next_selector).parse(input)?;
    Ok((input, build_chain(first, rest)))
}

/// Folds a flat selector list into the right-nested descendant chain.
fn build_chain(first: Selector, rest: Vec<Selector>) -> Expression {
    let mut chained = None;
    for selector in rest.into_iter().rev() {
        chained = Some(Box::new(Expression {
            selector,
            rest: chained,
        }));
    }
    Expression {
        selector: first,
        rest: chained,
    }
}

fn combinator(input: &str) -> IResult<&str, Relationship> {
    alt((
        map(char('>'), |_| Relationship::Child),
        map(char('+'), |_| Relationship::AdjacentSibling),
        map(char('~'), |_| Relationship::GeneralSibling),
    ))
    .parse(input)
}

/// A selector step. The leading combinator is optional, so a query may start
/// relative to its context node (e.g. `> .Block`).
fn selector(input: &str) -> IResult<&str, Selector> {
    let (input, relationship) = opt(terminated(combinator, multispace0)).parse(input)?;
    let (input, basic) = basic_selector(input)?;
    Ok((
        input,
        Selector {
            relationship,
            basic: Some(basic),
        },
    ))
}

/// A subsequent step in the chain: either a combinator step (whitespace
/// optional around the combinator) or a plain descendant step, which needs
/// separating whitespace.
fn next_selector(input: &str) -> IResult<&str, Selector> {
    alt((
        preceded(multispace0, combinator_selector),
        preceded(multispace1, selector),
    ))
    .parse(input)
}

fn combinator_selector(input: &str) -> IResult<&str, Selector> {
    let (input, relationship) = terminated(combinator, multispace0).parse(input)?;
    let (input, basic) = basic_selector(input)?;
    Ok((
        input,
        Selector {
            relationship: Some(relationship),
            basic: Some(basic),
        },
    ))
}

fn basic_selector(input: &str) -> IResult<&str, BasicSelector> {
    let (input, node_type) = preceded(char('.'), identifier).parse(input)?;
    let (input, attributes) = many0(attribute).parse(input)?;
    let attributes = if attributes.is_empty() {
        None
    } else {
        Some(AttributeList { attributes })
    };
    Ok((
        input,
        BasicSelector {
            node_type: node_type.to_string(),
            attributes,
        },
    ))
}

// --- Attribute Parsers ---

fn attribute(input: &str) -> IResult<&str, Attribute> {
    delimited(char('['), attribute_body, char(']')).parse(input)
}

fn attribute_body(input: &str) -> IResult<&str, Attribute> {
    let (input, key) = ws(key_path).parse(input)?;
    let (input, operator) = operator(input)?;
    let (input, value) = ws(value).parse(input)?;
    Ok((
        input,
        Attribute {
            key,
            operator,
            value,
        },
    ))
}

fn key_segment(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_').parse(input)
}

fn key_path(input: &str) -> IResult<&str, KeyPath> {
    map(separated_list1(char('.'), key_segment), |segments| {
        KeyPath::new(segments.into_iter().map(String::from).collect())
    })
    .parse(input)
}

fn operator(input: &str) -> IResult<&str, Operator> {
    ws(alt((
        map(tag("!="), |_| Operator::NotEqual),
        map(tag("^="), |_| Operator::StartsWith),
        map(tag("$="), |_| Operator::EndsWith),
        map(tag("*="), |_| Operator::Contains),
        map(tag(">="), |_| Operator::GreaterThanOrEqual),
        map(tag("<="), |_| Operator::LessThanOrEqual),
        map(tag("=~"), |_| Operator::Match),
        map(tag("!~"), |_| Operator::NotMatch),
        map(tag(">"), |_| Operator::GreaterThan),
        map(tag("<"), |_| Operator::LessThan),
        map(tag("="), |_| Operator::Equal),
        map(
            (tag_no_case("not"), multispace1, tag_no_case("in")),
            |_| Operator::NotIn,
        ),
        map(tag_no_case("in"), |_| Operator::In),
    )))
    .parse(input)
}

// --- Value Parsers ---

fn value(input: &str) -> IResult<&str, Value> {
    alt((
        number_value,
        string_value,
        regexp_value,
        dynamic_value,
        nested_selector_value,
        array_value,
        word_value,
    ))
    .parse(input)
}

fn number_value(input: &str) -> IResult<&str, Value> {
    map(
        map_res(
            recognize((opt(char('-')), digit1, opt(pair(char('.'), digit1)))),
            str::parse::<f64>,
        ),
        Value::Number,
    )
    .parse(input)
}

fn string_value(input: &str) -> IResult<&str, Value> {
    map(
        alt((
            delimited(char('"'), take_while(|c| c != '"'), char('"')),
            delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        )),
        |s: &str| Value::String(s.to_string()),
    )
    .parse(input)
}

fn regexp_value(input: &str) -> IResult<&str, Value> {
    let (input, pattern) = delimited(
        char('/'),
        recognize(opt(escaped(is_not("/\\"), '\\', anychar))),
        char('/'),
    )
    .parse(input)?;
    let (input, flags) = take_while(|c: char| matches!(c, 'i' | 'm' | 's')).parse(input)?;
    let source = if flags.is_empty() {
        pattern.to_string()
    } else {
        format!("(?{}){}", flags, pattern)
    };
    match Regex::new(&source) {
        Ok(re) => Ok((input, Value::Regexp(re))),
        Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Verify,
        ))),
    }
}

fn dynamic_value(input: &str) -> IResult<&str, Value> {
    map(
        delimited(tag("{{"), ws(key_path), tag("}}")),
        Value::Dynamic,
    )
    .parse(input)
}

fn nested_selector_value(input: &str) -> IResult<&str, Value> {
    map(basic_selector, |basic| Value::Selector(Box::new(basic))).parse(input)
}

fn array_value(input: &str) -> IResult<&str, Value> {
    map(
        delimited(
            ws(char('(')),
            separated_list0(element_separator, array_element),
            ws(char(')')),
        ),
        Value::Array,
    )
    .parse(input)
}

/// Array elements may be separated by commas, whitespace, or both.
fn element_separator(input: &str) -> IResult<&str, ()> {
    alt((map(ws(char(',')), |_| ()), map(multispace1, |_| ()))).parse(input)
}

fn array_element(input: &str) -> IResult<&str, Value> {
    alt((number_value, string_value, regexp_value, word_value)).parse(input)
}

/// A bare word: reserved literals first, anything else is an identifier.
fn word_value(input: &str) -> IResult<&str, Value> {
    map(identifier, |word| match word {
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "nil" | "null" => Value::Null,
        "undefined" => Value::Undefined,
        other => Value::Identifier(other.to_string()),
    })
    .parse(input)
}

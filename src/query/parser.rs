//! Cypher subset parser using Pest

use crate::graph::{EdgeType, Label, PropertyValue};
use crate::query::ast::*;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;
use thiserror::Error;

#[derive(Parser)]
#[grammar = "query/cypher.pest"]
struct CypherParser;

/// Parser errors
#[derive(Error, Debug)]
pub enum ParseError {
    /// Pest parsing error
    #[error("Parse error: {0}")]
    PestError(#[from] Box<pest::error::Error<Rule>>),

    /// Semantic error
    #[error("Semantic error: {0}")]
    SemanticError(String),
}

pub type ParseResult<T> = Result<T, ParseError>;

/// Parse a query string into an AST
pub fn parse_query(input: &str) -> ParseResult<Query> {
    let mut pairs = CypherParser::parse(Rule::query, input).map_err(Box::new)?;
    let query = pairs
        .next()
        .ok_or_else(|| ParseError::SemanticError("empty query".to_string()))?;

    for inner in query.into_inner() {
        match inner.as_rule() {
            Rule::match_stmt => return parse_match_statement(inner).map(Query::Match),
            Rule::merge_stmt => return parse_merge_statement(inner).map(Query::Merge),
            _ => {}
        }
    }
    Err(ParseError::SemanticError("expected MATCH or MERGE".to_string()))
}

fn parse_match_statement(pair: Pair<Rule>) -> ParseResult<MatchQuery> {
    let mut pattern = None;
    let mut predicates = Vec::new();
    let mut returns = Vec::new();
    let mut limit = None;

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::match_clause => pattern = Some(parse_clause_pattern(inner)?),
            Rule::where_clause => {
                for p in inner.into_inner().filter(|p| p.as_rule() == Rule::predicate) {
                    predicates.push(parse_predicate(p)?);
                }
            }
            Rule::return_clause => {
                for item in inner.into_inner().filter(|p| p.as_rule() == Rule::return_item) {
                    returns.push(parse_return_item(item)?);
                }
            }
            Rule::limit_clause => {
                let n = inner
                    .into_inner()
                    .find(|p| p.as_rule() == Rule::integer)
                    .ok_or_else(|| ParseError::SemanticError("LIMIT requires a value".to_string()))?;
                limit = Some(n.as_str().parse::<usize>().map_err(|e| {
                    ParseError::SemanticError(format!("invalid LIMIT '{}': {}", n.as_str(), e))
                })?);
            }
            _ => {}
        }
    }

    let pattern = pattern.ok_or_else(|| ParseError::SemanticError("MATCH requires a pattern".to_string()))?;
    let query = MatchQuery { pattern, predicates, returns, limit };
    validate_match(&query)?;
    Ok(query)
}

fn parse_merge_statement(pair: Pair<Rule>) -> ParseResult<Vec<MergeClause>> {
    let mut clauses = Vec::new();
    for part in pair.into_inner() {
        let mut pattern = None;
        let mut set_items = Vec::new();
        for inner in part.into_inner() {
            match inner.as_rule() {
                Rule::merge_clause => pattern = Some(parse_clause_pattern(inner)?),
                Rule::set_clause => {
                    for item in inner.into_inner().filter(|p| p.as_rule() == Rule::set_item) {
                        set_items.push(parse_set_item(item)?);
                    }
                }
                _ => {}
            }
        }
        let pattern =
            pattern.ok_or_else(|| ParseError::SemanticError("MERGE requires a pattern".to_string()))?;
        clauses.push(MergeClause { pattern, set_items });
    }
    Ok(clauses)
}

fn parse_clause_pattern(pair: Pair<Rule>) -> ParseResult<PathPattern> {
    let path = pair
        .into_inner()
        .find(|p| p.as_rule() == Rule::path_pattern)
        .ok_or_else(|| ParseError::SemanticError("missing pattern".to_string()))?;
    parse_path_pattern(path)
}

fn parse_path_pattern(pair: Pair<Rule>) -> ParseResult<PathPattern> {
    let mut inner = pair.into_inner();
    let start = match inner.next() {
        Some(p) => parse_node_pattern(p)?,
        None => return Err(ParseError::SemanticError("empty path pattern".to_string())),
    };

    let hop = match (inner.next(), inner.next()) {
        (Some(edge), Some(node)) => Some((parse_edge_pattern(edge)?, parse_node_pattern(node)?)),
        _ => None,
    };

    Ok(PathPattern { start, hop })
}

fn parse_node_pattern(pair: Pair<Rule>) -> ParseResult<NodePattern> {
    let mut node = NodePattern {
        variable: None,
        label: None,
        properties: Vec::new(),
    };

    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::variable => node.variable = Some(inner.as_str().to_string()),
            Rule::label => node.label = Some(Label::new(identifier_of(inner)?)),
            Rule::property_map => node.properties = parse_property_map(inner)?,
            _ => {}
        }
    }
    Ok(node)
}

fn parse_edge_pattern(pair: Pair<Rule>) -> ParseResult<EdgePattern> {
    let shape = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::SemanticError("empty relationship pattern".to_string()))?;

    let direction = match shape.as_rule() {
        Rule::outgoing_edge => Direction::Outgoing,
        Rule::incoming_edge => Direction::Incoming,
        _ => Direction::Both,
    };

    let mut edge = EdgePattern {
        variable: None,
        edge_type: None,
        direction,
    };

    if let Some(detail) = shape.into_inner().find(|p| p.as_rule() == Rule::edge_detail) {
        for inner in detail.into_inner() {
            match inner.as_rule() {
                Rule::variable => edge.variable = Some(inner.as_str().to_string()),
                Rule::edge_type => edge.edge_type = Some(EdgeType::new(identifier_of(inner)?)),
                _ => {}
            }
        }
    }
    Ok(edge)
}

fn parse_property_map(pair: Pair<Rule>) -> ParseResult<Vec<(String, Operand)>> {
    let mut entries = Vec::new();
    for entry in pair.into_inner() {
        let mut inner = entry.into_inner();
        let key = inner
            .next()
            .map(|p| p.as_str().to_string())
            .ok_or_else(|| ParseError::SemanticError("property map entry without key".to_string()))?;
        let value = inner
            .next()
            .ok_or_else(|| ParseError::SemanticError(format!("property '{}' has no value", key)))?;
        entries.push((key, parse_operand(value)?));
    }
    Ok(entries)
}

fn parse_predicate(pair: Pair<Rule>) -> ParseResult<Predicate> {
    let mut inner = pair.into_inner();
    let (left, op, right) = match (inner.next(), inner.next(), inner.next()) {
        (Some(l), Some(o), Some(r)) => (l, o, r),
        _ => return Err(ParseError::SemanticError("incomplete comparison".to_string())),
    };
    Ok(Predicate {
        left: parse_property_ref(left)?,
        op: parse_comparison(op)?,
        right: parse_operand(right)?,
    })
}

fn parse_comparison(pair: Pair<Rule>) -> ParseResult<ComparisonOp> {
    let op = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::SemanticError("missing operator".to_string()))?;
    match op.as_rule() {
        Rule::contains => Ok(ComparisonOp::Contains),
        Rule::starts_with => Ok(ComparisonOp::StartsWith),
        Rule::ends_with => Ok(ComparisonOp::EndsWith),
        _ => match op.as_str() {
            "=" => Ok(ComparisonOp::Eq),
            "<>" => Ok(ComparisonOp::Ne),
            "<" => Ok(ComparisonOp::Lt),
            "<=" => Ok(ComparisonOp::Le),
            ">" => Ok(ComparisonOp::Gt),
            ">=" => Ok(ComparisonOp::Ge),
            other => Err(ParseError::SemanticError(format!("unknown operator '{}'", other))),
        },
    }
}

fn parse_return_item(pair: Pair<Rule>) -> ParseResult<ReturnItem> {
    let mut projection = None;
    let mut alias = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::property_ref => projection = Some(Projection::Property(parse_property_ref(inner)?)),
            Rule::variable => projection = Some(Projection::Variable(inner.as_str().to_string())),
            Rule::identifier => alias = Some(inner.as_str().to_string()),
            _ => {}
        }
    }
    let projection =
        projection.ok_or_else(|| ParseError::SemanticError("empty RETURN item".to_string()))?;
    Ok(ReturnItem { projection, alias })
}

fn parse_set_item(pair: Pair<Rule>) -> ParseResult<SetItem> {
    let mut inner = pair.into_inner();
    match (inner.next(), inner.next()) {
        (Some(target), Some(value)) => Ok(SetItem {
            target: parse_property_ref(target)?,
            value: parse_operand(value)?,
        }),
        _ => Err(ParseError::SemanticError("incomplete SET item".to_string())),
    }
}

fn parse_property_ref(pair: Pair<Rule>) -> ParseResult<PropertyRef> {
    let mut inner = pair.into_inner();
    match (inner.next(), inner.next()) {
        (Some(variable), Some(property)) => Ok(PropertyRef {
            variable: variable.as_str().to_string(),
            property: property.as_str().to_string(),
        }),
        _ => Err(ParseError::SemanticError("malformed property reference".to_string())),
    }
}

fn parse_operand(pair: Pair<Rule>) -> ParseResult<Operand> {
    let value = pair
        .into_inner()
        .next()
        .ok_or_else(|| ParseError::SemanticError("missing value".to_string()))?;

    match value.as_rule() {
        Rule::parameter => Ok(Operand::Parameter(identifier_of(value)?)),
        Rule::string => {
            let raw = value.into_inner().next().map(|p| p.as_str()).unwrap_or("");
            Ok(Operand::Literal(PropertyValue::String(unescape(raw))))
        }
        Rule::number => {
            let text = value.as_str();
            if text.contains('.') {
                text.parse::<f64>()
                    .map(|f| Operand::Literal(PropertyValue::Float(f)))
                    .map_err(|e| ParseError::SemanticError(format!("invalid number '{}': {}", text, e)))
            } else {
                text.parse::<i64>()
                    .map(|i| Operand::Literal(PropertyValue::Integer(i)))
                    .map_err(|e| ParseError::SemanticError(format!("invalid number '{}': {}", text, e)))
            }
        }
        Rule::boolean => Ok(Operand::Literal(PropertyValue::Boolean(
            value.as_str().eq_ignore_ascii_case("true"),
        ))),
        Rule::null => Ok(Operand::Literal(PropertyValue::Null)),
        Rule::property_ref => Ok(Operand::Property(parse_property_ref(value)?)),
        other => Err(ParseError::SemanticError(format!("unexpected value {:?}", other))),
    }
}

fn identifier_of(pair: Pair<Rule>) -> ParseResult<String> {
    pair.into_inner()
        .find(|p| p.as_rule() == Rule::identifier)
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| ParseError::SemanticError("expected identifier".to_string()))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Every variable referenced in WHERE/RETURN must be bound by the pattern
fn validate_match(query: &MatchQuery) -> ParseResult<()> {
    let mut bound: Vec<&str> = Vec::new();
    bound.extend(query.pattern.start.variable.as_deref());
    if let Some((edge, node)) = &query.pattern.hop {
        bound.extend(edge.variable.as_deref());
        bound.extend(node.variable.as_deref());
    }

    let check = |var: &str| -> ParseResult<()> {
        if bound.contains(&var) {
            Ok(())
        } else {
            Err(ParseError::SemanticError(format!("variable '{}' is not defined", var)))
        }
    };

    for predicate in &query.predicates {
        check(&predicate.left.variable)?;
        if let Operand::Property(p) = &predicate.right {
            check(&p.variable)?;
        }
    }
    for item in &query.returns {
        match &item.projection {
            Projection::Variable(v) => check(v)?,
            Projection::Property(p) => check(&p.variable)?,
        }
    }
    Ok(())
}

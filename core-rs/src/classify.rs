//! Operation classification
//!
//! Parses operation text with the SPARQL grammar and classifies the algebra
//! into a typed [`OperationTag`]. Dispatch always switches on the tag; the
//! humanized tag name ("Select Query") only ever appears in messages.

use once_cell::sync::Lazy;
use oxigraph::model::NamedNode;
use regex::Regex;
use spargebra::algebra::{
    AggregateExpression, AggregateFunction, Expression, Function, GraphPattern, OrderExpression,
};
use spargebra::{GraphUpdateOperation, Query, Update};

use crate::errors::{EndpointError, Result};
use crate::negotiate::ResultShape;
use crate::protocol::{Operation, OperationKind};

/// XSD constructor casts are built-ins, not extension functions
const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

static CAMEL_BOUNDARY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w)([A-Z])").expect("valid regex"));

/// Top-level operation tag of a parsed operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationTag {
    SelectQuery,
    AskQuery,
    ConstructQuery,
    DescribeQuery,
    InsertData,
    DeleteData,
    DeleteInsert,
    Load,
    Clear,
    Create,
    Drop,
    /// Update request without any operation
    Update,
}

impl OperationTag {
    /// Camel-cased algebra name
    pub fn name(self) -> &'static str {
        match self {
            OperationTag::SelectQuery => "SelectQuery",
            OperationTag::AskQuery => "AskQuery",
            OperationTag::ConstructQuery => "ConstructQuery",
            OperationTag::DescribeQuery => "DescribeQuery",
            OperationTag::InsertData => "InsertData",
            OperationTag::DeleteData => "DeleteData",
            OperationTag::DeleteInsert => "DeleteInsert",
            OperationTag::Load => "Load",
            OperationTag::Clear => "Clear",
            OperationTag::Create => "Create",
            OperationTag::Drop => "Drop",
            OperationTag::Update => "Update",
        }
    }

    /// Space-separated name for messages ("SelectQuery" -> "Select Query")
    pub fn display_name(self) -> String {
        humanize(self.name())
    }

    /// LOAD needs a remote fetch client, which the endpoint does not have
    pub fn is_supported(self) -> bool {
        !matches!(self, OperationTag::Load)
    }

    fn of_update_operation(operation: &GraphUpdateOperation) -> Self {
        match operation {
            GraphUpdateOperation::InsertData { .. } => OperationTag::InsertData,
            GraphUpdateOperation::DeleteData { .. } => OperationTag::DeleteData,
            GraphUpdateOperation::DeleteInsert { .. } => OperationTag::DeleteInsert,
            GraphUpdateOperation::Load { .. } => OperationTag::Load,
            GraphUpdateOperation::Clear { .. } => OperationTag::Clear,
            GraphUpdateOperation::Create { .. } => OperationTag::Create,
            GraphUpdateOperation::Drop { .. } => OperationTag::Drop,
        }
    }
}

/// Insert a space at every camel-case boundary
pub fn humanize(name: &str) -> String {
    CAMEL_BOUNDARY.replace_all(name, "$1 $2").into_owned()
}

/// A successfully parsed operation
#[derive(Debug, Clone)]
pub enum ParsedOperation {
    Query { text: String, algebra: Query },
    Update { text: String, algebra: Update },
}

/// Parse the operation text according to its kind
pub fn parse(operation: &Operation) -> Result<ParsedOperation> {
    match operation.kind {
        OperationKind::Query => Query::parse(&operation.text, None)
            .map(|algebra| ParsedOperation::Query {
                text: operation.text.clone(),
                algebra,
            })
            .map_err(|e| EndpointError::bad_request(e.to_string())),
        OperationKind::Update => Update::parse(&operation.text, None)
            .map(|algebra| ParsedOperation::Update {
                text: operation.text.clone(),
                algebra,
            })
            .map_err(|e| EndpointError::bad_request(e.to_string())),
    }
}

/// Reject parsed operations the endpoint does not execute
pub fn ensure_supported(parsed: &ParsedOperation) -> Result<()> {
    let tag = parsed.tag();
    if tag.is_supported() {
        Ok(())
    } else {
        Err(EndpointError::not_implemented(format!(
            "{} not implemented",
            tag.display_name()
        )))
    }
}

impl ParsedOperation {
    pub fn text(&self) -> &str {
        match self {
            ParsedOperation::Query { text, .. } | ParsedOperation::Update { text, .. } => text,
        }
    }

    pub fn kind(&self) -> OperationKind {
        match self {
            ParsedOperation::Query { .. } => OperationKind::Query,
            ParsedOperation::Update { .. } => OperationKind::Update,
        }
    }

    /// Classification tag.
    ///
    /// For update sequences this is the first unsupported operation, if any,
    /// otherwise the first operation.
    pub fn tag(&self) -> OperationTag {
        match self {
            ParsedOperation::Query { algebra, .. } => match algebra {
                Query::Select { .. } => OperationTag::SelectQuery,
                Query::Ask { .. } => OperationTag::AskQuery,
                Query::Construct { .. } => OperationTag::ConstructQuery,
                Query::Describe { .. } => OperationTag::DescribeQuery,
            },
            ParsedOperation::Update { algebra, .. } => {
                let tags: Vec<OperationTag> = algebra
                    .operations
                    .iter()
                    .map(OperationTag::of_update_operation)
                    .collect();
                tags.iter()
                    .copied()
                    .find(|tag| !tag.is_supported())
                    .or_else(|| tags.first().copied())
                    .unwrap_or(OperationTag::Update)
            }
        }
    }

    /// Shape of the results a query produces; `None` for updates
    pub fn result_shape(&self) -> Option<ResultShape> {
        match self.tag() {
            OperationTag::SelectQuery => Some(ResultShape::Tabular),
            OperationTag::AskQuery => Some(ResultShape::Boolean),
            OperationTag::ConstructQuery | OperationTag::DescribeQuery => Some(ResultShape::Graph),
            _ => None,
        }
    }

    /// Every extension function IRI called anywhere in the algebra, deduplicated
    pub fn function_calls(&self) -> Vec<NamedNode> {
        let mut calls = Vec::new();
        match self {
            ParsedOperation::Query { algebra, .. } => {
                let pattern = match algebra {
                    Query::Select { pattern, .. }
                    | Query::Ask { pattern, .. }
                    | Query::Construct { pattern, .. }
                    | Query::Describe { pattern, .. } => pattern,
                };
                collect_pattern(pattern, &mut calls);
            }
            ParsedOperation::Update { algebra, .. } => {
                for operation in &algebra.operations {
                    match operation {
                        GraphUpdateOperation::DeleteInsert { pattern, .. } => {
                            collect_pattern(pattern, &mut calls)
                        }
                        GraphUpdateOperation::InsertData { .. }
                        | GraphUpdateOperation::DeleteData { .. }
                        | GraphUpdateOperation::Load { .. }
                        | GraphUpdateOperation::Clear { .. }
                        | GraphUpdateOperation::Create { .. }
                        | GraphUpdateOperation::Drop { .. } => {}
                    }
                }
            }
        }
        calls
    }
}

fn push_call(iri: &NamedNode, calls: &mut Vec<NamedNode>) {
    if !iri.as_str().starts_with(XSD_NAMESPACE) && !calls.contains(iri) {
        calls.push(iri.clone());
    }
}

fn collect_pattern(pattern: &GraphPattern, calls: &mut Vec<NamedNode>) {
    match pattern {
        GraphPattern::Join { left, right }
        | GraphPattern::Union { left, right }
        | GraphPattern::Minus { left, right }
        | GraphPattern::Lateral { left, right } => {
            collect_pattern(left, calls);
            collect_pattern(right, calls);
        }
        GraphPattern::LeftJoin {
            left,
            right,
            expression,
        } => {
            collect_pattern(left, calls);
            collect_pattern(right, calls);
            if let Some(expression) = expression {
                collect_expression(expression, calls);
            }
        }
        GraphPattern::Filter { expr, inner } => {
            collect_pattern(inner, calls);
            collect_expression(expr, calls);
        }
        GraphPattern::Extend {
            inner, expression, ..
        } => {
            collect_pattern(inner, calls);
            collect_expression(expression, calls);
        }
        GraphPattern::OrderBy { inner, expression } => {
            collect_pattern(inner, calls);
            for order in expression {
                match order {
                    OrderExpression::Asc(e) | OrderExpression::Desc(e) => collect_expression(e, calls),
                }
            }
        }
        GraphPattern::Group {
            inner, aggregates, ..
        } => {
            collect_pattern(inner, calls);
            for (_, aggregate) in aggregates {
                collect_aggregate(aggregate, calls);
            }
        }
        GraphPattern::Graph { inner, .. }
        | GraphPattern::Project { inner, .. }
        | GraphPattern::Distinct { inner }
        | GraphPattern::Reduced { inner }
        | GraphPattern::Slice { inner, .. } => collect_pattern(inner, calls),
        // SERVICE bodies are evaluated by the remote endpoint
        GraphPattern::Service { .. } => {}
        GraphPattern::Bgp { .. } | GraphPattern::Path { .. } | GraphPattern::Values { .. } => {}
    }
}

fn collect_aggregate(aggregate: &AggregateExpression, calls: &mut Vec<NamedNode>) {
    match aggregate {
        AggregateExpression::CountSolutions { .. } => {}
        AggregateExpression::FunctionCall { name, expr, .. } => {
            if let AggregateFunction::Custom(iri) = name {
                push_call(iri, calls);
            }
            collect_expression(expr, calls);
        }
    }
}

fn collect_expression(expression: &Expression, calls: &mut Vec<NamedNode>) {
    match expression {
        Expression::FunctionCall(function, args) => {
            if let Function::Custom(iri) = function {
                push_call(iri, calls);
            }
            for arg in args {
                collect_expression(arg, calls);
            }
        }
        Expression::Or(a, b)
        | Expression::And(a, b)
        | Expression::Equal(a, b)
        | Expression::SameTerm(a, b)
        | Expression::Greater(a, b)
        | Expression::GreaterOrEqual(a, b)
        | Expression::Less(a, b)
        | Expression::LessOrEqual(a, b)
        | Expression::Add(a, b)
        | Expression::Subtract(a, b)
        | Expression::Multiply(a, b)
        | Expression::Divide(a, b) => {
            collect_expression(a, calls);
            collect_expression(b, calls);
        }
        Expression::UnaryPlus(e) | Expression::UnaryMinus(e) | Expression::Not(e) => {
            collect_expression(e, calls)
        }
        Expression::In(e, list) => {
            collect_expression(e, calls);
            for item in list {
                collect_expression(item, calls);
            }
        }
        Expression::If(a, b, c) => {
            collect_expression(a, calls);
            collect_expression(b, calls);
            collect_expression(c, calls);
        }
        Expression::Coalesce(list) => {
            for item in list {
                collect_expression(item, calls);
            }
        }
        Expression::Exists(pattern) => collect_pattern(pattern, calls),
        Expression::NamedNode(_)
        | Expression::Literal(_)
        | Expression::Variable(_)
        | Expression::Bound(_) => {}
    }
}

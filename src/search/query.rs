//! Terminal and group nodes of a search query tree.

use serde::Serialize;
use serde_json::Value;

use crate::error::RcsbError;
use crate::search::operators::{SearchOperator, TextOperator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchService {
    FullText,
    Text,
    Sequence,
    Structure,
    #[serde(rename = "seqmotif")]
    SeqMotif,
    Chemical,
}

impl SearchService {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchService::FullText => "full_text",
            SearchService::Text => "text",
            SearchService::Sequence => "sequence",
            SearchService::Structure => "structure",
            SearchService::SeqMotif => "seqmotif",
            SearchService::Chemical => "chemical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogicalOperator {
    #[default]
    And,
    Or,
}

impl std::str::FromStr for LogicalOperator {
    type Err = RcsbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(LogicalOperator::And),
            "OR" => Ok(LogicalOperator::Or),
            _ => Err(RcsbError::unsupported("logical operator", value)),
        }
    }
}

/// Picks the backend service that evaluates a leaf predicate.
pub fn infer_search_service(operator: &SearchOperator) -> Result<SearchService, RcsbError> {
    match operator {
        SearchOperator::Default(_) => Ok(SearchService::FullText),
        SearchOperator::ExactMatch(_)
        | SearchOperator::In(_)
        | SearchOperator::ContainsWords(_)
        | SearchOperator::ContainsPhrase(_)
        | SearchOperator::Comparison(_)
        | SearchOperator::Range(_)
        | SearchOperator::Exists(_) => Ok(SearchService::Text),
        SearchOperator::Sequence(_) => Ok(SearchService::Sequence),
        SearchOperator::Structure(_) => Ok(SearchService::Structure),
        SearchOperator::SeqMotif(_) => Ok(SearchService::SeqMotif),
        SearchOperator::Chemical(_) => Ok(SearchService::Chemical),
        SearchOperator::Custom(map) => {
            match map.get("operator").and_then(Value::as_str) {
                Some(tag) if TextOperator::from_wire(tag).is_some() => Ok(SearchService::Text),
                None if map.len() == 1 && map.contains_key("value") => {
                    Ok(SearchService::FullText)
                }
                _ => Err(RcsbError::CannotInferService(
                    Value::Object(map.clone()).to_string(),
                )),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueryNode {
    Terminal {
        service: SearchService,
        parameters: SearchOperator,
    },
    Group {
        logical_operator: LogicalOperator,
        nodes: Vec<QueryNode>,
    },
}

/// Anything that can sit in a query tree: a bare predicate or an already built node.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Operator(SearchOperator),
    Node(QueryNode),
}

impl From<SearchOperator> for Query {
    fn from(value: SearchOperator) -> Self {
        Query::Operator(value)
    }
}

impl From<QueryNode> for Query {
    fn from(value: QueryNode) -> Self {
        Query::Node(value)
    }
}

impl Query {
    /// Wraps a predicate into a terminal node; nodes pass through unchanged.
    pub fn into_node(self) -> Result<QueryNode, RcsbError> {
        match self {
            Query::Operator(operator) => QueryNode::terminal(operator),
            Query::Node(node) => Ok(node),
        }
    }
}

impl QueryNode {
    pub fn terminal(operator: SearchOperator) -> Result<Self, RcsbError> {
        let service = infer_search_service(&operator)?;
        Ok(QueryNode::Terminal {
            service,
            parameters: operator,
        })
    }

    pub fn group<I>(queries: I, logical_operator: LogicalOperator) -> Result<Self, RcsbError>
    where
        I: IntoIterator,
        I::Item: Into<Query>,
    {
        let nodes = queries
            .into_iter()
            .map(|query| query.into().into_node())
            .collect::<Result<Vec<_>, _>>()?;
        if nodes.is_empty() {
            return Err(RcsbError::InvalidInput(
                "a query group needs at least one query".to_string(),
            ));
        }
        Ok(QueryNode::Group {
            logical_operator,
            nodes,
        })
    }

    pub fn to_json(&self) -> Result<Value, RcsbError> {
        serde_json::to_value(self).map_err(|err| RcsbError::InvalidInput(err.to_string()))
    }
}

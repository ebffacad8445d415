//! Search API: query construction and execution.
//!
//! Two entry points share the endpoint. [`RcsbClient::perform_search`] takes a
//! typed query tree; [`RcsbClient::query_search`] covers the canned term lookups
//! (PubMed, taxonomy, method, author, organism, Pfam, UniProt) and is the only
//! call in the crate that retries.

pub mod operators;
pub mod query;
pub mod request;

use std::fmt;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, warn};

use crate::client::RcsbClient;
use crate::error::RcsbError;
use crate::http::{HttpResponse, Transport};
use crate::json_util::{DEFAULT_MAX_DEPTH, merge_json, walk_nested_dict};

pub use operators::{
    AttributeOperator, ChemicalMatchType, ChemicalOperator, ComparisonOperator, ComparisonType,
    DescriptorType, ExistsOperator, PatternType, RangeOperator, SearchOperator, SeqMotifOperator,
    SequenceOperator, SequenceType, StructureOperator, StructureSearchMode, TextOperator,
    autoresolve_sequence_type,
};
pub use query::{LogicalOperator, Query, QueryNode, SearchService, infer_search_service};
pub use request::{
    Paginate, RequestOptions, ReturnType, ScoredResult, SearchRequest, SortDirection, SortOption,
};

/// Experimental methods accepted by [`QueryType::ExpType`].
pub const EXPERIMENTAL_METHODS: [&str; 13] = [
    "X-RAY DIFFRACTION",
    "ELECTRON MICROSCOPY",
    "SOLID-STATE NMR",
    "SOLUTION NMR",
    "NEUTRON DIFFRACTION",
    "ELECTRON CRYSTALLOGRAPHY",
    "POWDER DIFFRACTION",
    "FIBER DIFFRACTION",
    "SOLUTION SCATTERING",
    "EPR",
    "FLUORESCENCE TRANSFER",
    "INFRARED SPECTROSCOPY",
    "THEORETICAL MODEL",
];

#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub return_type: ReturnType,
    pub request_options: Option<RequestOptions>,
    pub return_with_scores: bool,
    pub return_raw: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Raw(Value),
    Scored(Vec<ScoredResult>),
    Identifiers(Vec<String>),
}

/// Canned lookups against the `text` service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryType {
    #[default]
    FullText,
    PubmedId,
    TreeEntity,
    ExpType,
    AdvancedAuthor,
    Organism,
    Pfam,
    Uniprot,
}

impl QueryType {
    pub fn as_str(self) -> &'static str {
        match self {
            QueryType::FullText => "full_text",
            QueryType::PubmedId => "PubmedIdQuery",
            QueryType::TreeEntity => "TreeEntityQuery",
            QueryType::ExpType => "ExpTypeQuery",
            QueryType::AdvancedAuthor => "AdvancedAuthorQuery",
            QueryType::Organism => "OrganismQuery",
            QueryType::Pfam => "pfam",
            QueryType::Uniprot => "uniprot",
        }
    }

    fn attribute(self) -> Option<&'static str> {
        match self {
            QueryType::FullText => None,
            QueryType::PubmedId => Some("rcsb_pubmed_container_identifiers.pubmed_id"),
            QueryType::TreeEntity => Some("rcsb_entity_source_organism.taxonomy_lineage.id"),
            QueryType::ExpType => Some("exptl.method"),
            QueryType::AdvancedAuthor => Some("rcsb_primary_citation.rcsb_authors"),
            QueryType::Organism => Some("rcsb_entity_source_organism.taxonomy_lineage.name"),
            QueryType::Pfam => Some("rcsb_polymer_entity_annotation.annotation_id"),
            QueryType::Uniprot => Some(
                "rcsb_polymer_entity_container_identifiers.reference_sequence_identifiers.database_accession",
            ),
        }
    }

    /// Builds the leaf predicate for `term`, validating method names first.
    pub fn operator(self, term: &str) -> Result<SearchOperator, RcsbError> {
        let Some(attribute) = self.attribute() else {
            return Ok(SearchOperator::default_text(term));
        };
        match self {
            QueryType::PubmedId => {
                let value = term
                    .trim()
                    .parse::<i64>()
                    .map(Value::from)
                    .unwrap_or_else(|_| Value::from(term.trim()));
                Ok(SearchOperator::in_set(attribute, [value]))
            }
            QueryType::ExpType => {
                let method = term.trim().to_ascii_uppercase();
                if !EXPERIMENTAL_METHODS.contains(&method.as_str()) {
                    return Err(RcsbError::InvalidInput(format!(
                        "unrecognized experimental method '{term}'; expected one of: {}",
                        EXPERIMENTAL_METHODS.join(", ")
                    )));
                }
                Ok(SearchOperator::exact_match(attribute, method))
            }
            _ => Ok(SearchOperator::exact_match(attribute, term)),
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = RcsbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        match lowered.as_str() {
            "full_text" => Ok(QueryType::FullText),
            "pubmedidquery" | "pubmed_id" => Ok(QueryType::PubmedId),
            "treeentityquery" | "tree_entity" => Ok(QueryType::TreeEntity),
            "exptypequery" | "exp_type" => Ok(QueryType::ExpType),
            "advancedauthorquery" | "author" => Ok(QueryType::AdvancedAuthor),
            "organismquery" | "organism" => Ok(QueryType::Organism),
            "pfam" => Ok(QueryType::Pfam),
            "uniprot" => Ok(QueryType::Uniprot),
            _ => Err(RcsbError::unsupported("query type", value)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuerySearchOptions {
    pub return_type: ReturnType,
    /// JSON object deep-merged over the generated request body.
    pub scan_params: Option<Value>,
    pub num_attempts: u32,
    pub sleep_time: Duration,
}

impl Default for QuerySearchOptions {
    fn default() -> Self {
        Self {
            return_type: ReturnType::Entry,
            scan_params: None,
            num_attempts: 1,
            sleep_time: Duration::from_millis(500),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryResults {
    Identifiers(Vec<String>),
    Raw(Value),
}

impl QueryResults {
    pub fn identifiers(&self) -> Option<&[String]> {
        match self {
            QueryResults::Identifiers(ids) => Some(ids),
            QueryResults::Raw(_) => None,
        }
    }
}

impl<T: Transport> RcsbClient<T> {
    pub fn perform_search(
        &self,
        query: impl Into<Query>,
        options: &SearchOptions,
    ) -> Result<SearchOutcome, RcsbError> {
        let request = SearchRequest {
            query: query.into().into_node()?,
            request_options: options
                .request_options
                .clone()
                .unwrap_or_else(RequestOptions::all_hits),
            return_type: options.return_type,
        };
        let body = serde_json::to_value(&request)
            .map_err(|err| RcsbError::InvalidInput(err.to_string()))?;

        let response = self.post_checked(&self.endpoints().search, &body)?;
        if response.body.is_empty() {
            debug!(status = response.status, "search returned no content");
            return Ok(match options {
                SearchOptions { return_raw: true, .. } => SearchOutcome::Raw(Value::Null),
                SearchOptions {
                    return_with_scores: true,
                    ..
                } => SearchOutcome::Scored(Vec::new()),
                _ => SearchOutcome::Identifiers(Vec::new()),
            });
        }

        let parsed: Value = response.json()?;
        let result_set = parsed
            .get("result_set")
            .and_then(Value::as_array)
            .ok_or_else(|| {
                RcsbError::MalformedResponse("search response has no result_set".to_string())
            })?;

        if options.return_raw {
            return Ok(SearchOutcome::Raw(parsed.clone()));
        }
        if options.return_with_scores {
            let scored = result_set
                .iter()
                .map(|item| {
                    serde_json::from_value::<ScoredResult>(item.clone()).map_err(|err| {
                        RcsbError::MalformedResponse(format!("unexpected scored result: {err}"))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            return Ok(SearchOutcome::Scored(scored));
        }

        let ids = result_set
            .iter()
            .map(|item| match item {
                Value::String(id) => Ok(id.clone()),
                other => other
                    .get("identifier")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        RcsbError::MalformedResponse(format!("result without identifier: {other}"))
                    }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(SearchOutcome::Identifiers(ids))
    }

    pub fn query_search(
        &self,
        search_term: &str,
        query_type: QueryType,
        options: &QuerySearchOptions,
    ) -> Result<QueryResults, RcsbError> {
        let operator = query_type.operator(search_term)?;
        let request = SearchRequest {
            query: QueryNode::terminal(operator)?,
            request_options: RequestOptions::all_hits(),
            return_type: options.return_type,
        };
        let mut body = serde_json::to_value(&request)
            .map_err(|err| RcsbError::InvalidInput(err.to_string()))?;
        if let Some(scan_params) = &options.scan_params {
            if !scan_params.is_object() {
                return Err(RcsbError::InvalidInput(
                    "scan_params must be a JSON object".to_string(),
                ));
            }
            merge_json(&mut body, scan_params.clone());
        }

        let response = self.post_with_attempts(&body, options.num_attempts, options.sleep_time)?;
        if response.body.is_empty() {
            return Err(RcsbError::MalformedResponse(format!(
                "search for '{search_term}' returned an empty body"
            )));
        }
        let parsed: Value = response.json()?;

        if options.return_type != ReturnType::Entry {
            return Ok(QueryResults::Raw(parsed));
        }

        let scope = parsed.get("result_set").unwrap_or(&parsed);
        let ids: Vec<String> = walk_nested_dict(scope, "identifier", DEFAULT_MAX_DEPTH)
            .into_iter()
            .map(|value| match value {
                Value::String(id) => id,
                other => other.to_string(),
            })
            .collect();
        if ids.is_empty() {
            return Err(RcsbError::MalformedResponse(format!(
                "no identifiers found for '{search_term}'"
            )));
        }
        Ok(QueryResults::Identifiers(ids))
    }

    fn post_with_attempts(
        &self,
        body: &Value,
        num_attempts: u32,
        sleep_time: Duration,
    ) -> Result<HttpResponse, RcsbError> {
        let attempts = num_attempts.max(1);
        let mut attempt = 1;
        loop {
            match self.post_checked(&self.endpoints().search, body) {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < attempts => {
                    warn!(attempt, attempts, "search attempt failed: {err}");
                    thread::sleep(sleep_time);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn query_types_parse_from_legacy_names() {
        assert_eq!("PubmedIdQuery".parse::<QueryType>().unwrap(), QueryType::PubmedId);
        assert_eq!("uniprot".parse::<QueryType>().unwrap(), QueryType::Uniprot);
        assert_matches!(
            "SequenceQuery".parse::<QueryType>(),
            Err(RcsbError::UnsupportedMapping { .. })
        );
    }

    #[test]
    fn experimental_method_is_validated() {
        let op = QueryType::ExpType.operator("solution nmr").unwrap();
        assert_eq!(
            op.to_json().unwrap(),
            json!({"attribute": "exptl.method", "operator": "exact_match", "value": "SOLUTION NMR"})
        );
        assert_matches!(
            QueryType::ExpType.operator("crystal gazing"),
            Err(RcsbError::InvalidInput(_))
        );
    }

    #[test]
    fn pubmed_ids_are_numeric_lists() {
        let op = QueryType::PubmedId.operator("27499440").unwrap();
        assert_eq!(op.to_json().unwrap()["value"], json!([27499440]));
    }
}

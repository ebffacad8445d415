use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RcsbError;
use crate::search::query::QueryNode;

/// Result granularity accepted by the search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnType {
    #[default]
    Entry,
    Assembly,
    PolymerEntity,
    NonPolymerEntity,
    PolymerInstance,
    MolDefinition,
}

impl ReturnType {
    pub fn as_str(self) -> &'static str {
        match self {
            ReturnType::Entry => "entry",
            ReturnType::Assembly => "assembly",
            ReturnType::PolymerEntity => "polymer_entity",
            ReturnType::NonPolymerEntity => "non_polymer_entity",
            ReturnType::PolymerInstance => "polymer_instance",
            ReturnType::MolDefinition => "mol_definition",
        }
    }
}

impl fmt::Display for ReturnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReturnType {
    type Err = RcsbError;

    /// NONPOLYMER_INSTANCE is a recognized name without a search mapping.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "ENTRY" => Ok(ReturnType::Entry),
            "ASSEMBLY" => Ok(ReturnType::Assembly),
            "POLYMER_ENTITY" => Ok(ReturnType::PolymerEntity),
            "NONPOLYMER_ENTITY" | "NON_POLYMER_ENTITY" => Ok(ReturnType::NonPolymerEntity),
            "POLYMER_INSTANCE" => Ok(ReturnType::PolymerInstance),
            "MOL_DEFINITION" | "CHEMICAL_COMPONENT" => Ok(ReturnType::MolDefinition),
            _ => Err(RcsbError::unsupported("return type", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Paginate {
    pub start: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Desc,
    Asc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SortOption {
    pub sort_by: String,
    pub direction: SortDirection,
}

impl SortOption {
    pub fn new(sort_by: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            sort_by: sort_by.into(),
            direction,
        }
    }
}

/// `request_options` block. Unset fields are left out of the JSON entirely.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct RequestOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paginate: Option<Paginate>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<SortOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_all_hits: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoring_strategy: Option<String>,
}

impl RequestOptions {
    pub fn all_hits() -> Self {
        Self {
            return_all_hits: Some(true),
            ..Self::default()
        }
    }

    pub fn paginate(mut self, start: u32, rows: u32) -> Self {
        self.paginate = Some(Paginate { start, rows });
        self
    }

    pub fn sort_by(mut self, sort_by: impl Into<String>, direction: SortDirection) -> Self {
        self.sort.push(SortOption::new(sort_by, direction));
        self
    }
}

/// Full body POSTed to the search endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub query: QueryNode,
    pub request_options: RequestOptions,
    pub return_type: ReturnType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    #[serde(alias = "identifier")]
    pub entity_id: String,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn return_type_mapping_table() {
        let cases = [
            ("ENTRY", "entry"),
            ("ASSEMBLY", "assembly"),
            ("POLYMER_ENTITY", "polymer_entity"),
            ("NONPOLYMER_ENTITY", "non_polymer_entity"),
            ("NON_POLYMER_ENTITY", "non_polymer_entity"),
            ("POLYMER_INSTANCE", "polymer_instance"),
            ("MOL_DEFINITION", "mol_definition"),
            ("CHEMICAL_COMPONENT", "mol_definition"),
        ];
        for (name, wire) in cases {
            let parsed: ReturnType = name.parse().unwrap();
            assert_eq!(parsed.as_str(), wire, "{name}");
            assert_eq!(serde_json::to_value(parsed).unwrap(), json!(wire));
        }
        assert_matches!(
            "NONPOLYMER_INSTANCE".parse::<ReturnType>(),
            Err(RcsbError::UnsupportedMapping { .. })
        );
    }

    #[test]
    fn request_options_omit_unset_keys() {
        assert_eq!(serde_json::to_value(RequestOptions::default()).unwrap(), json!({}));
        let options = RequestOptions::default()
            .paginate(10, 25)
            .sort_by("score", SortDirection::Desc);
        assert_eq!(
            serde_json::to_value(options).unwrap(),
            json!({
                "paginate": {"start": 10, "rows": 25},
                "sort": [{"sort_by": "score", "direction": "desc"}]
            })
        );
    }

    #[test]
    fn scored_result_reads_identifier_and_writes_entity_id() {
        let parsed: ScoredResult =
            serde_json::from_value(json!({"identifier": "4HHB", "score": 0.5})).unwrap();
        assert_eq!(parsed.entity_id, "4HHB");
        assert_eq!(
            serde_json::to_value(&parsed).unwrap(),
            json!({"entity_id": "4HHB", "score": 0.5})
        );
    }
}

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::client::RcsbClient;
use crate::config::Endpoints;
use crate::error::RcsbError;
use crate::http::Transport;
use crate::search::{QueryResults, QuerySearchOptions, QueryType};

/// Chemical component ids are at most this many characters long.
pub const MAX_CHEM_ID_LEN: usize = 3;

/// Core REST URL for `endpoint` (`entry`, `chemcomp`, `polymer_entity`, ...) on the
/// public data API.
pub fn get_pdb_api_url(endpoint: &str, id: &str) -> String {
    Endpoints::default().rest_url(endpoint, id)
}

/// Headline fields pulled out of an entry document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntrySummary {
    pub pdb_id: String,
    pub title: Option<String>,
    pub experimental_method: Option<String>,
    pub resolution: Option<f64>,
    pub deposition_date: Option<String>,
    pub release_date: Option<String>,
}

impl EntrySummary {
    pub fn from_entry(pdb_id: &str, entry: &Value) -> Self {
        let title = entry
            .get("struct")
            .and_then(|value| value.get("title"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let experimental_method = entry
            .get("exptl")
            .and_then(Value::as_array)
            .and_then(|array| array.first())
            .and_then(|value| value.get("method"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let resolution = entry
            .get("rcsb_entry_info")
            .and_then(|value| value.get("resolution_combined"))
            .and_then(Value::as_array)
            .and_then(|array| array.first())
            .and_then(Value::as_f64);
        let accession = entry.get("rcsb_accession_info");
        let deposition_date = accession
            .and_then(|value| value.get("deposit_date"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let release_date = accession
            .and_then(|value| value.get("initial_release_date"))
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            pdb_id: pdb_id.to_string(),
            title,
            experimental_method,
            resolution,
            deposition_date,
            release_date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paper {
    pub pdb_id: String,
    pub title: Option<String>,
}

impl<T: Transport> RcsbClient<T> {
    /// Entry document for `pdb_id`. `4HHB:1` style ids are sent as `4HHB/1`.
    pub fn get_info(&self, pdb_id: &str) -> Result<Value, RcsbError> {
        if pdb_id.trim().is_empty() {
            return Err(RcsbError::InvalidInput("PDB id is empty".to_string()));
        }
        let url = self.endpoints().entry_url(pdb_id);
        debug!(%url, "fetching entry");
        self.get_checked(&url)?.json()
    }

    pub fn get_entry_summary(&self, pdb_id: &str) -> Result<EntrySummary, RcsbError> {
        let entry = self.get_info(pdb_id)?;
        Ok(EntrySummary::from_entry(pdb_id, &entry))
    }

    pub fn describe_chemical(&self, chem_id: &str) -> Result<Value, RcsbError> {
        let chem_id = chem_id.trim();
        if chem_id.is_empty() {
            return Err(RcsbError::InvalidInput("chemical id is empty".to_string()));
        }
        if chem_id.chars().count() > MAX_CHEM_ID_LEN {
            return Err(RcsbError::InvalidInput(format!(
                "chemical id '{chem_id}' is longer than {MAX_CHEM_ID_LEN} characters"
            )));
        }
        let url = self.endpoints().chemcomp_url(chem_id);
        debug!(%url, "fetching chemical component");
        self.get_checked(&url)?.json()
    }

    /// Primary citation titles of the first `max_results` entries matching `term`.
    pub fn find_papers(&self, term: &str, max_results: usize) -> Result<Vec<Paper>, RcsbError> {
        let ids = self.entry_ids_for(term)?;
        ids.into_iter()
            .take(max_results)
            .map(|pdb_id| {
                let entry = self.get_info(&pdb_id)?;
                let title = entry
                    .get("rcsb_primary_citation")
                    .and_then(|citation| citation.get("title"))
                    .and_then(Value::as_str)
                    .map(str::to_string);
                if title.is_none() {
                    warn!(%pdb_id, "entry has no primary citation title");
                }
                Ok(Paper { pdb_id, title })
            })
            .collect()
    }

    /// Top-level `field` of every entry matching `term`; absent fields are `Null`.
    pub fn find_results(
        &self,
        term: &str,
        field: &str,
    ) -> Result<Vec<(String, Value)>, RcsbError> {
        let ids = self.entry_ids_for(term)?;
        ids.into_iter()
            .map(|pdb_id| {
                let entry = self.get_info(&pdb_id)?;
                let value = entry.get(field).cloned().unwrap_or(Value::Null);
                Ok((pdb_id, value))
            })
            .collect()
    }

    fn entry_ids_for(&self, term: &str) -> Result<Vec<String>, RcsbError> {
        match self.query_search(term, QueryType::FullText, &QuerySearchOptions::default())? {
            QueryResults::Identifiers(ids) => Ok(ids),
            QueryResults::Raw(_) => Err(RcsbError::MalformedResponse(
                "entry search did not return identifiers".to_string(),
            )),
        }
    }
}

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use crate::client::RcsbClient;
use crate::error::RcsbError;
use crate::http::Transport;

/// One record of an entry FASTA file, e.g. header `4HHB_1|Chains A, C|Hemoglobin subunit alpha|Homo sapiens (9606)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FastaSequence {
    pub entity_id: String,
    /// Chain labels as listed, e.g. `["A", "C"]` or `["A[auth B]"]`.
    pub chains: Vec<String>,
    pub sequence: String,
    pub header: String,
}

impl FastaSequence {
    /// Exact match against the listed labels. `A[auth B]` answers to both `A` and `B`.
    pub fn has_chain(&self, chain_id: &str) -> bool {
        self.chains.iter().any(|label| match label.split_once("[auth ") {
            Some((label_id, auth)) => label_id == chain_id || auth.trim_end_matches(']') == chain_id,
            None => label == chain_id,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum FastaSelection {
    Entry(Vec<FastaSequence>),
    Chain { chain_id: String, sequence: String },
}

/// Splits the `Chains A, C` header field into its labels.
fn parse_chain_labels(field: &str, pattern: &Regex) -> Vec<String> {
    let field = field.trim();
    let field = field
        .strip_prefix("Chains ")
        .or_else(|| field.strip_prefix("Chain "))
        .unwrap_or(field);
    pattern
        .find_iter(field)
        .map(|label| label.as_str().to_string())
        .collect()
}

/// Splits FASTA text on `>` markers. Sequence lines are concatenated.
pub fn parse_fasta(text: &str) -> Result<Vec<FastaSequence>, RcsbError> {
    let label_pattern = Regex::new(r"[^\s,\[\]]+(?:\[auth [^\]]+\])?")
        .map_err(|err| RcsbError::InvalidInput(err.to_string()))?;
    let records = text
        .split('>')
        .map(str::trim)
        .filter(|record| !record.is_empty())
        .map(|record| {
            let mut lines = record.lines();
            let header = lines.next().unwrap_or_default().trim().to_string();
            let sequence: String = lines.map(str::trim).collect();
            let mut fields = header.split('|');
            let entity_id = fields.next().unwrap_or_default().trim().to_string();
            let chains = parse_chain_labels(fields.next().unwrap_or_default(), &label_pattern);
            FastaSequence {
                entity_id,
                chains,
                sequence,
                header,
            }
        })
        .collect();
    Ok(records)
}

/// First record listing `chain_id`.
pub fn select_chain<'a>(records: &'a [FastaSequence], chain_id: &str) -> Option<&'a FastaSequence> {
    records.iter().find(|record| record.has_chain(chain_id))
}

impl<T: Transport> RcsbClient<T> {
    pub fn get_fasta_from_rcsb_entry(
        &self,
        rcsb_id: &str,
        chain_id: Option<&str>,
    ) -> Result<FastaSelection, RcsbError> {
        if rcsb_id.trim().is_empty() {
            return Err(RcsbError::InvalidInput("entry id is empty".to_string()));
        }
        let url = self.endpoints().fasta_url(rcsb_id.trim());
        debug!(%url, "fetching FASTA");
        let text = self.get_checked(&url)?.text()?;
        let records = parse_fasta(&text)?;
        if records.is_empty() {
            return Err(RcsbError::MalformedResponse(format!(
                "no FASTA records for {rcsb_id}"
            )));
        }

        let Some(chain_id) = chain_id else {
            return Ok(FastaSelection::Entry(records));
        };
        match select_chain(&records, chain_id) {
            Some(record) => Ok(FastaSelection::Chain {
                chain_id: chain_id.to_string(),
                sequence: record.sequence.clone(),
            }),
            None => Err(RcsbError::NotFound(format!(
                "chain {chain_id} not found in entry {rcsb_id}"
            ))),
        }
    }
}

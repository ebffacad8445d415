//! Leaf predicates of a search query.
//!
//! Every variant wraps a struct whose `Serialize` output is exactly the
//! `parameters` object the search API expects for that predicate.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::RcsbError;

/// Operators understood by the `text` service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextOperator {
    ExactMatch,
    In,
    ContainsWords,
    ContainsPhrase,
    Greater,
    GreaterOrEqual,
    Equals,
    LessOrEqual,
    Less,
    Range,
    Exists,
}

impl TextOperator {
    pub const ALL: [TextOperator; 11] = [
        TextOperator::ExactMatch,
        TextOperator::In,
        TextOperator::ContainsWords,
        TextOperator::ContainsPhrase,
        TextOperator::Greater,
        TextOperator::GreaterOrEqual,
        TextOperator::Equals,
        TextOperator::LessOrEqual,
        TextOperator::Less,
        TextOperator::Range,
        TextOperator::Exists,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TextOperator::ExactMatch => "exact_match",
            TextOperator::In => "in",
            TextOperator::ContainsWords => "contains_words",
            TextOperator::ContainsPhrase => "contains_phrase",
            TextOperator::Greater => "greater",
            TextOperator::GreaterOrEqual => "greater_or_equal",
            TextOperator::Equals => "equals",
            TextOperator::LessOrEqual => "less_or_equal",
            TextOperator::Less => "less",
            TextOperator::Range => "range",
            TextOperator::Exists => "exists",
        }
    }

    pub fn from_wire(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == value)
    }
}

impl fmt::Display for TextOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonType {
    Greater,
    GreaterOrEqual,
    Equal,
    NotEqual,
    LessOrEqual,
    Less,
}

impl ComparisonType {
    /// Wire operator plus negation flag. The API has no `not_equal`, so
    /// NOT_EQUAL is a negated `equals`.
    fn wire(self) -> (TextOperator, bool) {
        match self {
            ComparisonType::Greater => (TextOperator::Greater, false),
            ComparisonType::GreaterOrEqual => (TextOperator::GreaterOrEqual, false),
            ComparisonType::Equal => (TextOperator::Equals, false),
            ComparisonType::NotEqual => (TextOperator::Equals, true),
            ComparisonType::LessOrEqual => (TextOperator::LessOrEqual, false),
            ComparisonType::Less => (TextOperator::Less, false),
        }
    }
}

impl FromStr for ComparisonType {
    type Err = RcsbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "GREATER" => Ok(ComparisonType::Greater),
            "GREATER_OR_EQUAL" => Ok(ComparisonType::GreaterOrEqual),
            "EQUAL" => Ok(ComparisonType::Equal),
            "NOT_EQUAL" => Ok(ComparisonType::NotEqual),
            "LESS_OR_EQUAL" => Ok(ComparisonType::LessOrEqual),
            "LESS" => Ok(ComparisonType::Less),
            _ => Err(RcsbError::unsupported("comparison type", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SequenceType {
    #[serde(rename = "pdb_dna_sequence")]
    Dna,
    #[serde(rename = "pdb_rna_sequence")]
    Rna,
    #[serde(rename = "pdb_protein_sequence")]
    Protein,
}

impl FromStr for SequenceType {
    type Err = RcsbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "DNA" => Ok(SequenceType::Dna),
            "RNA" => Ok(SequenceType::Rna),
            "PROTEIN" => Ok(SequenceType::Protein),
            _ => Err(RcsbError::unsupported("sequence type", value)),
        }
    }
}

const DNA_LETTERS: &str = "ATCG";
const RNA_LETTERS: &str = "AUCG";
const AMINO_ACID_LETTERS: &str = "ABCDEFGHIKLMNPQRSTVWXYZ";
// Residue codes that never appear in a nucleotide sequence.
const PROTEIN_ONLY_LETTERS: &str = "BDEFHIKLMNPQRSVWXYZ";

/// Guesses the polymer type of a one-letter sequence.
pub fn autoresolve_sequence_type(sequence: &str) -> Result<SequenceType, RcsbError> {
    let unique: BTreeSet<char> = sequence
        .chars()
        .filter(|ch| !ch.is_whitespace())
        .map(|ch| ch.to_ascii_uppercase())
        .collect();
    if unique.is_empty() {
        return Err(RcsbError::InvalidInput("sequence is empty".to_string()));
    }

    let within = |alphabet: &str| unique.iter().all(|ch| alphabet.contains(*ch));
    if within(DNA_LETTERS) && unique.contains(&'T') {
        return Ok(SequenceType::Dna);
    }
    if within(RNA_LETTERS) && unique.contains(&'U') {
        return Ok(SequenceType::Rna);
    }
    let protein_only = unique.iter().any(|ch| PROTEIN_ONLY_LETTERS.contains(*ch));
    if within(AMINO_ACID_LETTERS) && protein_only {
        return Ok(SequenceType::Protein);
    }
    Err(RcsbError::AmbiguousSequenceType(sequence.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StructureSearchMode {
    #[default]
    StrictShapeMatch,
    RelaxedShapeMatch,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternType {
    #[default]
    Simple,
    Prosite,
    Regex,
}

impl FromStr for PatternType {
    type Err = RcsbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_uppercase().as_str() {
            "SIMPLE" => Ok(PatternType::Simple),
            "PROSITE" => Ok(PatternType::Prosite),
            "REGEX" => Ok(PatternType::Regex),
            _ => Err(RcsbError::unsupported("pattern type", value)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DescriptorType {
    #[serde(rename = "InChI")]
    InChI,
    #[serde(rename = "SMILES")]
    Smiles,
}

impl DescriptorType {
    pub fn detect(descriptor: &str) -> Self {
        if descriptor.starts_with("InChI=") {
            DescriptorType::InChI
        } else {
            DescriptorType::Smiles
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChemicalMatchType {
    #[default]
    GraphStrict,
    GraphRelaxed,
    GraphRelaxedStereo,
    FingerprintSimilarity,
    SubStructGraphStrict,
    SubStructGraphRelaxed,
    SubStructGraphRelaxedStereo,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DefaultOperator {
    pub value: String,
}

/// Shared shape of `exact_match`, `in`, `contains_words` and `contains_phrase`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttributeOperator {
    pub attribute: String,
    pub operator: TextOperator,
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonOperator {
    pub operator: TextOperator,
    pub attribute: String,
    pub value: Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub negation: bool,
    #[serde(skip)]
    pub comparison_type: ComparisonType,
}

impl ComparisonOperator {
    pub fn new(
        attribute: impl Into<String>,
        value: impl Into<Value>,
        comparison_type: ComparisonType,
    ) -> Self {
        let (operator, negation) = comparison_type.wire();
        Self {
            operator,
            attribute: attribute.into(),
            value: value.into(),
            negation,
            comparison_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeValue {
    pub from: Value,
    pub to: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeOperator {
    pub operator: TextOperator,
    pub attribute: String,
    pub negation: bool,
    pub value: RangeValue,
    // Accepted for callers but not part of the request body.
    #[serde(skip)]
    pub include_lower: bool,
    #[serde(skip)]
    pub include_upper: bool,
}

impl RangeOperator {
    pub fn new(attribute: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        Self {
            operator: TextOperator::Range,
            attribute: attribute.into(),
            negation: false,
            value: RangeValue {
                from: from.into(),
                to: to.into(),
            },
            include_lower: true,
            include_upper: true,
        }
    }

    pub fn negate(mut self, negation: bool) -> Self {
        self.negation = negation;
        self
    }

    pub fn inclusive(mut self, include_lower: bool, include_upper: bool) -> Self {
        self.include_lower = include_lower;
        self.include_upper = include_upper;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExistsOperator {
    pub attribute: String,
    pub operator: TextOperator,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureValue {
    pub entry_id: String,
    pub assembly_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StructureOperator {
    pub value: StructureValue,
    pub operator: StructureSearchMode,
}

impl StructureOperator {
    pub fn new(entry_id: impl Into<String>, assembly_id: u32, mode: StructureSearchMode) -> Self {
        Self {
            value: StructureValue {
                entry_id: entry_id.into(),
                assembly_id: assembly_id.to_string(),
            },
            operator: mode,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SequenceOperator {
    pub evalue_cutoff: f64,
    pub identity_cutoff: f64,
    pub target: SequenceType,
    pub value: String,
}

impl SequenceOperator {
    pub const DEFAULT_EVALUE_CUTOFF: f64 = 100.0;
    pub const DEFAULT_IDENTITY_CUTOFF: f64 = 0.95;

    /// Builds a sequence predicate, detecting the polymer type when none is given.
    pub fn new(
        sequence: impl Into<String>,
        sequence_type: Option<SequenceType>,
        evalue_cutoff: f64,
        identity_cutoff: f64,
    ) -> Result<Self, RcsbError> {
        let value = sequence.into();
        let target = match sequence_type {
            Some(target) => target,
            None => autoresolve_sequence_type(&value)?,
        };
        Ok(Self {
            evalue_cutoff,
            identity_cutoff,
            target,
            value,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeqMotifOperator {
    pub value: String,
    pub pattern_type: PatternType,
    pub target: SequenceType,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChemicalOperator {
    pub value: String,
    #[serde(rename = "type")]
    pub query_type: &'static str,
    pub descriptor_type: DescriptorType,
    pub match_type: ChemicalMatchType,
}

impl ChemicalOperator {
    pub fn new(descriptor: impl Into<String>, match_type: ChemicalMatchType) -> Self {
        let value = descriptor.into();
        Self {
            descriptor_type: DescriptorType::detect(&value),
            value,
            query_type: "descriptor",
            match_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchOperator {
    Default(DefaultOperator),
    ExactMatch(AttributeOperator),
    In(AttributeOperator),
    ContainsWords(AttributeOperator),
    ContainsPhrase(AttributeOperator),
    Comparison(ComparisonOperator),
    Range(RangeOperator),
    Exists(ExistsOperator),
    Sequence(SequenceOperator),
    Structure(StructureOperator),
    SeqMotif(SeqMotifOperator),
    Chemical(ChemicalOperator),
    /// Hand-written parameters object, routed by its `operator` key.
    Custom(Map<String, Value>),
}

impl SearchOperator {
    pub fn default_text(value: impl Into<String>) -> Self {
        SearchOperator::Default(DefaultOperator {
            value: value.into(),
        })
    }

    pub fn exact_match(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        SearchOperator::ExactMatch(AttributeOperator {
            attribute: attribute.into(),
            operator: TextOperator::ExactMatch,
            value: value.into(),
        })
    }

    pub fn in_set<V: Into<Value>>(
        attribute: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        SearchOperator::In(AttributeOperator {
            attribute: attribute.into(),
            operator: TextOperator::In,
            value: Value::Array(values.into_iter().map(Into::into).collect()),
        })
    }

    pub fn contains_words(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        SearchOperator::ContainsWords(AttributeOperator {
            attribute: attribute.into(),
            operator: TextOperator::ContainsWords,
            value: Value::String(value.into()),
        })
    }

    pub fn contains_phrase(attribute: impl Into<String>, value: impl Into<String>) -> Self {
        SearchOperator::ContainsPhrase(AttributeOperator {
            attribute: attribute.into(),
            operator: TextOperator::ContainsPhrase,
            value: Value::String(value.into()),
        })
    }

    pub fn comparison(
        attribute: impl Into<String>,
        value: impl Into<Value>,
        comparison_type: ComparisonType,
    ) -> Self {
        SearchOperator::Comparison(ComparisonOperator::new(attribute, value, comparison_type))
    }

    pub fn range(attribute: impl Into<String>, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        SearchOperator::Range(RangeOperator::new(attribute, from, to))
    }

    pub fn exists(attribute: impl Into<String>) -> Self {
        SearchOperator::Exists(ExistsOperator {
            attribute: attribute.into(),
            operator: TextOperator::Exists,
        })
    }

    pub fn structure(entry_id: impl Into<String>) -> Self {
        SearchOperator::Structure(StructureOperator::new(
            entry_id,
            1,
            StructureSearchMode::default(),
        ))
    }

    pub fn sequence(sequence: impl Into<String>) -> Result<Self, RcsbError> {
        SequenceOperator::new(
            sequence,
            None,
            SequenceOperator::DEFAULT_EVALUE_CUTOFF,
            SequenceOperator::DEFAULT_IDENTITY_CUTOFF,
        )
        .map(SearchOperator::Sequence)
    }

    pub fn seq_motif(
        pattern: impl Into<String>,
        pattern_type: PatternType,
        target: SequenceType,
    ) -> Self {
        SearchOperator::SeqMotif(SeqMotifOperator {
            value: pattern.into(),
            pattern_type,
            target,
        })
    }

    pub fn chemical(descriptor: impl Into<String>, match_type: ChemicalMatchType) -> Self {
        SearchOperator::Chemical(ChemicalOperator::new(descriptor, match_type))
    }

    /// Wraps a JSON object; anything else is rejected.
    pub fn custom(parameters: Value) -> Result<Self, RcsbError> {
        match parameters {
            Value::Object(map) => Ok(SearchOperator::Custom(map)),
            other => Err(RcsbError::InvalidInput(format!(
                "search parameters must be an object, got {other}"
            ))),
        }
    }

    pub fn to_json(&self) -> Result<Value, RcsbError> {
        serde_json::to_value(self).map_err(|err| RcsbError::InvalidInput(err.to_string()))
    }
}

impl From<ComparisonOperator> for SearchOperator {
    fn from(value: ComparisonOperator) -> Self {
        SearchOperator::Comparison(value)
    }
}

impl From<RangeOperator> for SearchOperator {
    fn from(value: RangeOperator) -> Self {
        SearchOperator::Range(value)
    }
}

impl From<StructureOperator> for SearchOperator {
    fn from(value: StructureOperator) -> Self {
        SearchOperator::Structure(value)
    }
}

impl From<SequenceOperator> for SearchOperator {
    fn from(value: SequenceOperator) -> Self {
        SearchOperator::Sequence(value)
    }
}

impl From<SeqMotifOperator> for SearchOperator {
    fn from(value: SeqMotifOperator) -> Self {
        SearchOperator::SeqMotif(value)
    }
}

impl From<ChemicalOperator> for SearchOperator {
    fn from(value: ChemicalOperator) -> Self {
        SearchOperator::Chemical(value)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn not_equal_is_negated_equals() {
        let op = SearchOperator::comparison("rcsb_entry_info.resolution_combined", 2.0, ComparisonType::NotEqual);
        assert_eq!(
            op.to_json().unwrap(),
            json!({
                "operator": "equals",
                "negation": true,
                "attribute": "rcsb_entry_info.resolution_combined",
                "value": 2.0
            })
        );
    }

    #[test]
    fn equal_omits_negation() {
        let kind: ComparisonType = "EQUAL".parse().unwrap();
        let op = SearchOperator::comparison("a.b", 2.0, kind);
        assert_eq!(
            op.to_json().unwrap(),
            json!({"operator": "equals", "attribute": "a.b", "value": 2.0})
        );
    }

    #[test]
    fn range_drops_inclusivity_flags() {
        let op: SearchOperator = RangeOperator::new("a.b", 1.5, 2.5)
            .inclusive(false, true)
            .into();
        assert_eq!(
            op.to_json().unwrap(),
            json!({
                "operator": "range",
                "attribute": "a.b",
                "negation": false,
                "value": {"from": 1.5, "to": 2.5}
            })
        );
    }

    #[test]
    fn structure_assembly_is_stringified() {
        let op: SearchOperator =
            StructureOperator::new("4HHB", 2, StructureSearchMode::RelaxedShapeMatch).into();
        assert_eq!(
            op.to_json().unwrap(),
            json!({
                "value": {"entry_id": "4HHB", "assembly_id": "2"},
                "operator": "relaxed_shape_match"
            })
        );
    }

    #[test]
    fn sequence_type_detection() {
        assert_eq!(autoresolve_sequence_type("ATGCGTACGTAGC").unwrap(), SequenceType::Dna);
        assert_eq!(autoresolve_sequence_type("AUGCGUACGUAGC").unwrap(), SequenceType::Rna);
        assert_eq!(
            autoresolve_sequence_type("MVLSPADKTNVKAAW").unwrap(),
            SequenceType::Protein
        );
        assert_eq!(
            autoresolve_sequence_type("MVLSPADKTNVKAAWXGKV").unwrap(),
            SequenceType::Protein
        );
        assert_eq!(autoresolve_sequence_type("mvlspadkbz").unwrap(), SequenceType::Protein);
        assert_matches!(
            autoresolve_sequence_type("ACGTU"),
            Err(RcsbError::AmbiguousSequenceType(_))
        );
        assert_matches!(
            autoresolve_sequence_type("ACGACG"),
            Err(RcsbError::AmbiguousSequenceType(_))
        );
    }

    #[test]
    fn chemical_descriptor_detection() {
        let inchi = SearchOperator::chemical("InChI=1S/CH4/h1H4", ChemicalMatchType::GraphRelaxed);
        assert_eq!(
            inchi.to_json().unwrap(),
            json!({
                "value": "InChI=1S/CH4/h1H4",
                "type": "descriptor",
                "descriptor_type": "InChI",
                "match_type": "graph-relaxed"
            })
        );
        let smiles = SearchOperator::chemical("CC(=O)O", ChemicalMatchType::default());
        assert_eq!(smiles.to_json().unwrap()["descriptor_type"], "SMILES");
        assert_eq!(smiles.to_json().unwrap()["match_type"], "graph-strict");
    }

    #[test]
    fn seq_motif_wire_shape() {
        let op = SearchOperator::seq_motif("C-x(2,4)-C", PatternType::Prosite, SequenceType::Protein);
        assert_eq!(
            op.to_json().unwrap(),
            json!({
                "value": "C-x(2,4)-C",
                "pattern_type": "prosite",
                "target": "pdb_protein_sequence"
            })
        );
    }

    #[test]
    fn in_operator_serializes_list() {
        let op = SearchOperator::in_set("rcsb_entry_container_identifiers.entry_id", ["4HHB", "1A3N"]);
        assert_eq!(op.to_json().unwrap()["value"], json!(["4HHB", "1A3N"]));
        assert_eq!(op.to_json().unwrap()["operator"], "in");
    }

    #[test]
    fn sequence_wire_shape_uses_defaults() {
        let protein = SearchOperator::sequence("MVLSPADKTNVKAAWGKVGAHAGEYGAEALERMFLSF").unwrap();
        assert_eq!(
            protein.to_json().unwrap(),
            json!({
                "evalue_cutoff": 100.0,
                "identity_cutoff": 0.95,
                "target": "pdb_protein_sequence",
                "value": "MVLSPADKTNVKAAWGKVGAHAGEYGAEALERMFLSF"
            })
        );
        let dna = SearchOperator::sequence("ATGCGTACGTAGC").unwrap();
        assert_eq!(dna.to_json().unwrap()["target"], "pdb_dna_sequence");
        let rna = SearchOperator::sequence("AUGCGUACGUAGC").unwrap();
        assert_eq!(rna.to_json().unwrap()["target"], "pdb_rna_sequence");

        let tuned: SearchOperator =
            SequenceOperator::new("ACGU", Some(SequenceType::Rna), 1.0, 0.5).unwrap().into();
        assert_eq!(tuned.to_json().unwrap()["evalue_cutoff"], 1.0);
        assert_eq!(tuned.to_json().unwrap()["identity_cutoff"], 0.5);
    }

    #[test]
    fn ambiguous_sequence_cannot_build_an_operator() {
        assert_matches!(
            SearchOperator::sequence("ACGACG"),
            Err(RcsbError::AmbiguousSequenceType(_))
        );
    }

    #[test]
    fn exists_wire_shape() {
        let op = SearchOperator::exists("rcsb_primary_citation.pdbx_database_id_DOI");
        assert_eq!(
            op.to_json().unwrap(),
            json!({"attribute": "rcsb_primary_citation.pdbx_database_id_DOI", "operator": "exists"})
        );
    }

    #[test]
    fn contains_operators_wire_shape() {
        let words = SearchOperator::contains_words("struct.title", "hemoglobin deoxy");
        assert_eq!(
            words.to_json().unwrap(),
            json!({
                "attribute": "struct.title",
                "operator": "contains_words",
                "value": "hemoglobin deoxy"
            })
        );
        let phrase = SearchOperator::contains_phrase("struct.title", "human deoxyhaemoglobin");
        assert_eq!(
            phrase.to_json().unwrap(),
            json!({
                "attribute": "struct.title",
                "operator": "contains_phrase",
                "value": "human deoxyhaemoglobin"
            })
        );
    }
}

//! GraphQL metadata pipeline: property selection, query generation, fetch and
//! reconciliation of the returned records against the requested ids.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use serde_json::{Value, json};
use tracing::warn;

use crate::client::RcsbClient;
use crate::error::RcsbError;
use crate::http::Transport;
use crate::table::{FlatTable, return_data_as_dataframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Entry,
    PolymerEntity,
    BranchedEntity,
    NonpolymerEntity,
    PolymerEntityInstance,
    BranchedEntityInstance,
    NonpolymerEntityInstance,
    Assembly,
    ChemicalComponent,
}

impl DataType {
    pub const ALL: [DataType; 9] = [
        DataType::Entry,
        DataType::PolymerEntity,
        DataType::BranchedEntity,
        DataType::NonpolymerEntity,
        DataType::PolymerEntityInstance,
        DataType::BranchedEntityInstance,
        DataType::NonpolymerEntityInstance,
        DataType::Assembly,
        DataType::ChemicalComponent,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Entry => "ENTRY",
            DataType::PolymerEntity => "POLYMER_ENTITY",
            DataType::BranchedEntity => "BRANCHED_ENTITY",
            DataType::NonpolymerEntity => "NONPOLYMER_ENTITY",
            DataType::PolymerEntityInstance => "POLYMER_ENTITY_INSTANCE",
            DataType::BranchedEntityInstance => "BRANCHED_ENTITY_INSTANCE",
            DataType::NonpolymerEntityInstance => "NONPOLYMER_ENTITY_INSTANCE",
            DataType::Assembly => "ASSEMBLY",
            DataType::ChemicalComponent => "CHEMICAL_COMPONENT",
        }
    }

    /// GraphQL root field queried for this data type.
    pub fn root_field(self) -> &'static str {
        match self {
            DataType::Entry => "entries",
            DataType::PolymerEntity => "polymer_entities",
            DataType::BranchedEntity => "branched_entities",
            DataType::NonpolymerEntity => "nonpolymer_entities",
            DataType::PolymerEntityInstance => "polymer_entity_instances",
            DataType::BranchedEntityInstance => "branched_entity_instances",
            DataType::NonpolymerEntityInstance => "nonpolymer_entity_instances",
            DataType::Assembly => "assemblies",
            DataType::ChemicalComponent => "chem_comps",
        }
    }

    /// Name of the id list argument of [`DataType::root_field`].
    pub fn id_keyword(self) -> &'static str {
        match self {
            DataType::Entry => "entry_ids",
            DataType::PolymerEntity | DataType::BranchedEntity | DataType::NonpolymerEntity => {
                "entity_ids"
            }
            DataType::PolymerEntityInstance
            | DataType::BranchedEntityInstance
            | DataType::NonpolymerEntityInstance => "instance_ids",
            DataType::Assembly => "assembly_ids",
            DataType::ChemicalComponent => "comp_ids",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = RcsbError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let upper = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|data_type| data_type.as_str() == upper)
            .ok_or_else(|| RcsbError::unsupported("data type", value))
    }
}

/// Schema groups and the sub-properties selected under each, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyRequest {
    groups: Vec<(String, Vec<String>)>,
}

impl PropertyRequest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds sub-properties to `group`, merging with any earlier selection of the
    /// same group. Duplicates are dropped, first occurrence wins.
    pub fn add<I, S>(&mut self, group: impl Into<String>, properties: I) -> Result<&mut Self, RcsbError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let group = group.into();
        if group.trim().is_empty() {
            return Err(RcsbError::InvalidInput(
                "Each property must be a named list element".to_string(),
            ));
        }
        let index = match self.groups.iter().position(|(name, _)| *name == group) {
            Some(index) => index,
            None => {
                self.groups.push((group, Vec::new()));
                self.groups.len() - 1
            }
        };
        let selected = &mut self.groups[index].1;
        for property in properties {
            let property = property.into();
            if property.trim().is_empty() {
                return Err(RcsbError::InvalidInput(
                    "sub-property names must not be empty".to_string(),
                ));
            }
            if !selected.contains(&property) {
                selected.push(property);
            }
        }
        Ok(self)
    }

    pub fn with<I, S>(mut self, group: impl Into<String>, properties: I) -> Result<Self, RcsbError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add(group, properties)?;
        Ok(self)
    }

    /// Validates a `{"group": ["sub", ...], ...}` JSON object.
    pub fn from_json(value: &Value) -> Result<Self, RcsbError> {
        let map = value
            .as_object()
            .ok_or_else(|| RcsbError::InvalidInput("Property must be a list".to_string()))?;
        let mut request = Self::new();
        for (group, properties) in map {
            let items = properties.as_array().ok_or_else(|| {
                RcsbError::InvalidInput(format!("Property must be a list (group '{group}')"))
            })?;
            let names = items
                .iter()
                .map(|item| {
                    item.as_str().map(str::to_string).ok_or_else(|| {
                        RcsbError::InvalidInput(format!(
                            "sub-properties of '{group}' must be strings, got {item}"
                        ))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            request.add(group.clone(), names)?;
        }
        Ok(request)
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.groups
            .iter()
            .map(|(name, properties)| (name.as_str(), properties.as_slice()))
    }

    pub fn get(&self, group: &str) -> Option<&[String]> {
        self.groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, properties)| properties.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Builds a [`PropertyRequest`] from `(group, sub-properties)` pairs.
pub fn add_property<I, G, P, S>(entries: I) -> Result<PropertyRequest, RcsbError>
where
    I: IntoIterator<Item = (G, P)>,
    G: Into<String>,
    P: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut request = PropertyRequest::new();
    for (group, properties) in entries {
        request.add(group, properties)?;
    }
    Ok(request)
}

/// Renders the single-line GraphQL selection for `ids`. A group without
/// sub-properties is selected as a scalar field.
pub fn generate_json_query<S: AsRef<str>>(
    ids: &[S],
    data_type: DataType,
    properties: &PropertyRequest,
) -> Result<String, RcsbError> {
    if properties.is_empty() {
        return Err(RcsbError::InvalidInput(
            "at least one property must be selected".to_string(),
        ));
    }
    if ids.is_empty() {
        return Err(RcsbError::InvalidInput("no ids given".to_string()));
    }

    let id_list = ids
        .iter()
        .map(|id| {
            serde_json::to_string(id.as_ref()).map_err(|err| RcsbError::InvalidInput(err.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?
        .join(", ");
    let selection = properties
        .groups()
        .map(|(group, subs)| {
            if subs.is_empty() {
                group.to_string()
            } else {
                format!("{group}{{{}}}", subs.join(", "))
            }
        })
        .collect::<Vec<_>>()
        .join(", ");
    Ok(format!(
        "{{{}({}: [{}]){{{}}}}}",
        data_type.root_field(),
        data_type.id_keyword(),
        id_list,
        selection
    ))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchedRecord {
    pub id: String,
    pub data: Value,
}

/// Records reconciled against the requested ids: `records[i].id == ids[i]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchResponse {
    pub data_type: DataType,
    pub ids: Vec<String>,
    pub records: Vec<FetchedRecord>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl FetchResponse {
    pub fn get(&self, id: &str) -> Option<&Value> {
        self.records
            .iter()
            .find(|record| record.id == id)
            .map(|record| &record.data)
    }

    pub fn record_ids(&self) -> Vec<&str> {
        self.records.iter().map(|record| record.id.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetcherOutput {
    Records(FetchResponse),
    Table(FlatTable),
}

fn record_warning(warnings: &mut Vec<String>, message: String) {
    warn!("{message}");
    warnings.push(message);
}

/// Matches returned records to the requested ids.
///
/// Named records (an object keyed by id) must cover every id; extras are dropped.
/// Positional records (an array) are zipped with `ids`; extras are truncated.
pub fn reconcile_records(
    payload: Value,
    data_type: DataType,
    ids: &[String],
) -> Result<FetchResponse, RcsbError> {
    let mut warnings = Vec::new();
    let records = match payload {
        Value::Object(mut named) => {
            let requested: HashSet<&str> = ids.iter().map(String::as_str).collect();
            let extra: Vec<String> = named
                .keys()
                .filter(|key| !requested.contains(key.as_str()))
                .cloned()
                .collect();
            if !extra.is_empty() {
                record_warning(
                    &mut warnings,
                    format!("dropping unrequested ids from response: {}", extra.join(", ")),
                );
            }
            let missing: Vec<&str> = ids
                .iter()
                .map(String::as_str)
                .filter(|id| !named.contains_key(*id))
                .collect();
            if !missing.is_empty() {
                return Err(RcsbError::NotFound(format!(
                    "one or more IDs could not be retrieved: {}",
                    missing.join(", ")
                )));
            }
            ids.iter()
                .map(|id| FetchedRecord {
                    id: id.clone(),
                    data: named.remove(id).unwrap_or(Value::Null),
                })
                .collect::<Vec<_>>()
        }
        Value::Array(mut positional) => {
            record_warning(
                &mut warnings,
                "response records are unnamed; matching them to ids by position".to_string(),
            );
            if positional.len() < ids.len() {
                let missing = ids[positional.len()..].join(", ");
                return Err(RcsbError::NotFound(format!(
                    "one or more IDs could not be retrieved: expected {} records, got {} (unmatched: {missing})",
                    ids.len(),
                    positional.len()
                )));
            }
            if positional.len() > ids.len() {
                record_warning(
                    &mut warnings,
                    format!(
                        "response has {} records for {} ids; truncating extras",
                        positional.len(),
                        ids.len()
                    ),
                );
                positional.truncate(ids.len());
            }
            ids.iter()
                .cloned()
                .zip(positional)
                .map(|(id, data)| FetchedRecord { id, data })
                .collect()
        }
        other => {
            return Err(RcsbError::MalformedResponse(format!(
                "expected a list of {} records, got {other}",
                data_type.root_field()
            )));
        }
    };

    Ok(FetchResponse {
        data_type,
        ids: ids.to_vec(),
        records,
        warnings,
    })
}

impl<T: Transport> RcsbClient<T> {
    /// Posts a raw GraphQL query and returns the parsed body.
    pub fn search_graphql(&self, query: &str) -> Result<Value, RcsbError> {
        if query.trim().is_empty() {
            return Err(RcsbError::InvalidInput("GraphQL query is empty".to_string()));
        }
        let response = self.post_checked(&self.endpoints().graphql, &json!({ "query": query }))?;
        let parsed: Value = response.json()?;

        if let Some(errors) = parsed.get("errors").and_then(Value::as_array) {
            if !errors.is_empty() {
                let messages: Vec<String> = errors
                    .iter()
                    .map(|error| {
                        error
                            .get("message")
                            .and_then(Value::as_str)
                            .map(str::to_string)
                            .unwrap_or_else(|| error.to_string())
                    })
                    .collect();
                for message in &messages {
                    warn!("GraphQL error: {message}");
                }
                return Err(RcsbError::GraphQl(messages));
            }
        }
        Ok(parsed)
    }

    pub fn fetch_data<S: AsRef<str>>(
        &self,
        json_query: &str,
        data_type: DataType,
        ids: &[S],
    ) -> Result<FetchResponse, RcsbError> {
        let ids: Vec<String> = ids.iter().map(|id| id.as_ref().to_string()).collect();
        let parsed = self.search_graphql(json_query)?;

        let data = parsed
            .get("data")
            .and_then(Value::as_object)
            .ok_or_else(|| RcsbError::MalformedResponse("response has no data object".to_string()))?;
        let payload = data
            .get(data_type.root_field())
            .or_else(|| data.values().next())
            .filter(|value| !value.is_null())
            .cloned()
            .ok_or_else(|| {
                RcsbError::MalformedResponse(format!(
                    "response has no {} records",
                    data_type.root_field()
                ))
            })?;

        reconcile_records(payload, data_type, &ids)
    }

    /// Generates, runs and reconciles a metadata query in one call.
    pub fn data_fetcher<S: AsRef<str>>(
        &self,
        ids: &[S],
        data_type: DataType,
        properties: &PropertyRequest,
        return_as_dataframe: bool,
    ) -> Result<FetcherOutput, RcsbError> {
        let query = generate_json_query(ids, data_type, properties)?;
        let response = self.fetch_data(&query, data_type, ids)?;
        if return_as_dataframe {
            let table = return_data_as_dataframe(&response)?;
            return Ok(FetcherOutput::Table(table));
        }
        Ok(FetcherOutput::Records(response))
    }
}

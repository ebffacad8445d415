use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::RcsbError;
use crate::files::FileType;

pub const DEFAULT_CONFIG_FILE: &str = "kira-rcsb.json";

/// Base URLs of the RCSB services. Defaults point at the public endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Endpoints {
    pub rest_base: String,
    pub graphql: String,
    pub search: String,
    pub fasta_base: String,
    pub download_base: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            rest_base: "https://data.rcsb.org/rest/v1/core".to_string(),
            graphql: "https://data.rcsb.org/graphql".to_string(),
            search: "https://search.rcsb.org/rcsbsearch/v2/query".to_string(),
            fasta_base: "https://www.rcsb.org/fasta/entry".to_string(),
            download_base: "https://files.rcsb.org/download".to_string(),
        }
    }
}

impl Endpoints {
    /// Builds a core REST URL such as `.../core/entry/4HHB`.
    pub fn rest_url(&self, endpoint: &str, id: &str) -> String {
        format!(
            "{}/{}/{}",
            self.rest_base.trim_end_matches('/'),
            endpoint,
            normalize_legacy_id(id)
        )
    }

    pub fn entry_url(&self, id: &str) -> String {
        self.rest_url("entry", id)
    }

    pub fn chemcomp_url(&self, id: &str) -> String {
        self.rest_url("chemcomp", id)
    }

    pub fn fasta_url(&self, id: &str) -> String {
        format!("{}/{}", self.fasta_base.trim_end_matches('/'), id)
    }

    pub fn download_url(&self, id: &str, filetype: FileType, compressed: bool) -> String {
        let mut url = format!(
            "{}/{}{}",
            self.download_base.trim_end_matches('/'),
            id,
            filetype.suffix()
        );
        if compressed {
            url.push_str(".gz");
        }
        url
    }
}

/// Legacy `ENTRY:ENTITY` identifiers are addressed as `ENTRY/ENTITY` by the REST API.
pub fn normalize_legacy_id(id: &str) -> String {
    id.trim().replace(':', "/")
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub endpoints: Endpoints,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoints: Endpoints::default(),
            timeout_secs: default_timeout_secs(),
            user_agent: None,
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn user_agent(&self) -> String {
        self.user_agent
            .clone()
            .unwrap_or_else(|| format!("kira-rcsb/{}", env!("CARGO_PKG_VERSION")))
    }
}

fn default_timeout_secs() -> u64 {
    30
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads the client config. Without an explicit path, `kira-rcsb.json` in the
    /// working directory is used when present and defaults otherwise.
    pub fn resolve(path: Option<&str>) -> Result<ClientConfig, RcsbError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Ok(ClientConfig::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| RcsbError::ConfigRead(config_path.clone()))?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<ClientConfig, RcsbError> {
        serde_json::from_str(content).map_err(|err| RcsbError::ConfigParse(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config =
            ConfigLoader::parse(r#"{"endpoints": {"search": "http://localhost:9000/query"}}"#)
                .unwrap();
        assert_eq!(config.endpoints.search, "http://localhost:9000/query");
        assert_eq!(config.endpoints.graphql, "https://data.rcsb.org/graphql");
        assert_eq!(config.timeout_secs, 30);
        assert!(config.user_agent().starts_with("kira-rcsb/"));
    }

    #[test]
    fn explicit_missing_path_fails() {
        let err = ConfigLoader::resolve(Some("/nonexistent/kira-rcsb.json")).unwrap_err();
        assert_matches!(err, RcsbError::ConfigRead(_));
    }

    #[test]
    fn legacy_ids_use_slash_form() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.rest_url("polymer_entity", "4HHB:1"),
            "https://data.rcsb.org/rest/v1/core/polymer_entity/4HHB/1"
        );
    }

    #[test]
    fn download_urls_carry_suffix_and_compression() {
        let endpoints = Endpoints::default();
        assert_eq!(
            endpoints.download_url("4HHB", FileType::StructFact, true),
            "https://files.rcsb.org/download/4HHB-sf.cif.gz"
        );
        assert_eq!(
            endpoints.download_url("4HHB", FileType::Pdb, false),
            "https://files.rcsb.org/download/4HHB.pdb"
        );
    }
}

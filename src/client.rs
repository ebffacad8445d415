use serde_json::Value;

use crate::config::{ClientConfig, Endpoints};
use crate::error::RcsbError;
use crate::http::{HttpResponse, ReqwestTransport, Transport};

/// Entry point for every RCSB operation. Endpoint-specific methods live in the
/// `search`, `fetch`, `rest`, `fasta` and `files` modules.
#[derive(Clone)]
pub struct RcsbClient<T: Transport = ReqwestTransport> {
    transport: T,
    endpoints: Endpoints,
}

impl RcsbClient<ReqwestTransport> {
    pub fn new() -> Result<Self, RcsbError> {
        Self::from_config(&ClientConfig::default())
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, RcsbError> {
        let transport = ReqwestTransport::new(config)?;
        Ok(Self::with_transport(transport).with_endpoints(config.endpoints.clone()))
    }
}

impl<T: Transport> RcsbClient<T> {
    pub fn with_transport(transport: T) -> Self {
        Self {
            transport,
            endpoints: Endpoints::default(),
        }
    }

    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn get_checked(&self, url: &str) -> Result<HttpResponse, RcsbError> {
        self.transport.get(url)?.error_for_status()
    }

    pub(crate) fn post_checked(&self, url: &str, body: &Value) -> Result<HttpResponse, RcsbError> {
        self.transport.post_json(url, body)?.error_for_status()
    }
}

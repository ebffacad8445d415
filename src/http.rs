use reqwest::blocking::Client;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::RcsbError;

/// Raw response as seen by the client, independent of the HTTP library.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub url: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Turns a non-success status into [`RcsbError::Status`].
    pub fn error_for_status(self) -> Result<Self, RcsbError> {
        if self.is_success() {
            return Ok(self);
        }
        let message = String::from_utf8(self.body)
            .ok()
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| "RCSB request failed".to_string());
        Err(RcsbError::Status {
            url: self.url,
            status: self.status,
            message,
        })
    }

    pub fn text(&self) -> Result<String, RcsbError> {
        String::from_utf8(self.body.clone())
            .map_err(|err| RcsbError::MalformedResponse(format!("{}: {err}", self.url)))
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, RcsbError> {
        serde_json::from_slice(&self.body)
            .map_err(|err| RcsbError::MalformedResponse(format!("{}: {err}", self.url)))
    }
}

/// Generic GET / POST dispatcher used by every endpoint.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse, RcsbError>;
    fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, RcsbError>;
}

#[derive(Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(config: &ClientConfig) -> Result<Self, RcsbError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent())
                .map_err(|err| RcsbError::InvalidInput(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout())
            .build()
            .map_err(|err| RcsbError::Http(err.to_string()))?;
        Ok(Self { client })
    }

    fn read(
        url: &str,
        response: reqwest::blocking::Response,
    ) -> Result<HttpResponse, RcsbError> {
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .map_err(|err| RcsbError::Http(format!("{url}: {err}")))?;
        Ok(HttpResponse {
            url: url.to_string(),
            status,
            body: body.to_vec(),
        })
    }
}

impl Transport for ReqwestTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, RcsbError> {
        debug!(url, "GET");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| RcsbError::Http(format!("{url}: {err}")))?;
        Self::read(url, response)
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, RcsbError> {
        debug!(url, "POST");
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .json(body)
            .send()
            .map_err(|err| RcsbError::Http(format!("{url}: {err}")))?;
        Self::read(url, response)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn status_error_embeds_url_and_body() {
        let response = HttpResponse {
            url: "https://data.rcsb.org/rest/v1/core/entry/XXXX".to_string(),
            status: 404,
            body: b"Entry not found".to_vec(),
        };
        let err = response.error_for_status().unwrap_err();
        assert_matches!(
            err,
            RcsbError::Status { status: 404, ref url, ref message }
                if url.ends_with("/XXXX") && message == "Entry not found"
        );
    }

    #[test]
    fn invalid_json_is_malformed() {
        let response = HttpResponse {
            url: "u".to_string(),
            status: 200,
            body: b"<html>".to_vec(),
        };
        let err = response.json::<Value>().unwrap_err();
        assert_matches!(err, RcsbError::MalformedResponse(_));
    }
}

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value;

use kira_rcsb::RcsbClient;
use kira_rcsb::error::RcsbError;
use kira_rcsb::http::{HttpResponse, Transport};

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Get(String),
    Post(String, Value),
}

impl Request {
    pub fn url(&self) -> &str {
        match self {
            Request::Get(url) | Request::Post(url, _) => url,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            Request::Get(_) => None,
            Request::Post(_, body) => Some(body),
        }
    }
}

/// Replays queued responses in order and records every request.
#[derive(Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<HttpResponse, RcsbError>>>,
    requests: Mutex<Vec<Request>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, status: u16, body: impl Into<Vec<u8>>) -> Self {
        self.responses.lock().unwrap().push_back(Ok(HttpResponse {
            url: String::new(),
            status,
            body: body.into(),
        }));
        self
    }

    pub fn respond_json(self, body: Value) -> Self {
        self.respond(200, body.to_string())
    }

    pub fn fail(self, err: RcsbError) -> Self {
        self.responses.lock().unwrap().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn next(&self, request: Request) -> Result<HttpResponse, RcsbError> {
        let url = request.url().to_string();
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(mut response)) => {
                response.url = url;
                Ok(response)
            }
            Some(Err(err)) => Err(err),
            None => Err(RcsbError::Http(format!("no mock response queued for {url}"))),
        }
    }
}

impl Transport for MockTransport {
    fn get(&self, url: &str) -> Result<HttpResponse, RcsbError> {
        self.next(Request::Get(url.to_string()))
    }

    fn post_json(&self, url: &str, body: &Value) -> Result<HttpResponse, RcsbError> {
        self.next(Request::Post(url.to_string(), body.clone()))
    }
}

pub fn client(transport: MockTransport) -> RcsbClient<MockTransport> {
    RcsbClient::with_transport(transport)
}

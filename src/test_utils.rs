// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Test utilities for mocking Kubernetes API responses.

use http::{Request, Response};
use http_body_util::BodyExt;
use kube::client::Body;
use kube::Client;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use tower::Service;

/// A request the mock service has served, in arrival order
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: String,
}

/// A mock HTTP service that returns predefined responses based on request
/// paths and records every request it serves. Responses for the same method
/// and path form a queue: each is served once, the last one repeats.
#[derive(Clone)]
pub struct MockService {
    responses: Arc<Mutex<HashMap<(String, String), VecDeque<(u16, String)>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockService {
    pub fn new() -> Self {
        Self {
            responses: Arc::new(Mutex::new(HashMap::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a response for GET requests matching the path (exact or prefix)
    pub fn on_get(self, path: &str, status: u16, body: &str) -> Self {
        self.push_response("GET", path, status, body);
        self
    }

    /// Add a response for POST requests matching the path (exact or prefix)
    pub fn on_post(self, path: &str, status: u16, body: &str) -> Self {
        self.push_response("POST", path, status, body);
        self
    }

    /// Add a response for PUT requests matching the path (exact or prefix)
    pub fn on_put(self, path: &str, status: u16, body: &str) -> Self {
        self.push_response("PUT", path, status, body);
        self
    }

    /// Add a response for PATCH requests matching the path (exact or prefix)
    pub fn on_patch(self, path: &str, status: u16, body: &str) -> Self {
        self.push_response("PATCH", path, status, body);
        self
    }

    fn push_response(&self, method: &str, path: &str, status: u16, body: &str) {
        self.responses
            .lock()
            .unwrap()
            .entry((method.to_string(), path.to_string()))
            .or_default()
            .push_back((status, body.to_string()));
    }

    /// Requests served so far, in order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Build a kube Client from this mock service
    pub fn into_client(self) -> Client {
        Client::new(self, "default")
    }

    fn find_response(&self, method: &str, path: &str) -> Option<(u16, String)> {
        let mut responses = self.responses.lock().unwrap();

        // Try exact match first
        if let Some(queue) = responses.get_mut(&(method.to_string(), path.to_string())) {
            return Some(next_response(queue));
        }

        // Then prefix match for paths like /api/v1/namespaces/foo
        for ((m, p), queue) in responses.iter_mut() {
            if m == method && path.starts_with(p.as_str()) {
                return Some(next_response(queue));
            }
        }

        None
    }
}

fn next_response(queue: &mut VecDeque<(u16, String)>) -> (u16, String) {
    if queue.len() > 1 {
        queue.pop_front().unwrap()
    } else {
        queue.front().cloned().unwrap()
    }
}

impl Default for MockService {
    fn default() -> Self {
        Self::new()
    }
}

impl Service<Request<Body>> for MockService {
    type Response = Response<Body>;
    type Error = tower::BoxError;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let service = self.clone();

        Box::pin(async move {
            let method = req.method().to_string();
            let path = req.uri().path().to_string();
            let body = req
                .into_body()
                .collect()
                .await
                .map(|collected| collected.to_bytes())
                .unwrap_or_default();

            service.requests.lock().unwrap().push(RecordedRequest {
                method: method.clone(),
                path: path.clone(),
                body: String::from_utf8_lossy(&body).to_string(),
            });

            match service.find_response(&method, &path) {
                Some((status, body)) => Ok(Response::builder()
                    .status(status)
                    .header("content-type", "application/json")
                    .body(Body::from(body.into_bytes()))
                    .unwrap()),
                None => {
                    // Default 404 for unmatched requests
                    let body = r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"not found","reason":"NotFound","code":404}"#;
                    Ok(Response::builder()
                        .status(404)
                        .header("content-type", "application/json")
                        .body(Body::from(body.as_bytes().to_vec()))
                        .unwrap())
                }
            }
        })
    }
}

/// Create a mock namespace JSON response
pub fn namespace_json(name: &str) -> String {
    serde_json::json!({
        "apiVersion": "v1",
        "kind": "Namespace",
        "metadata": {
            "name": name,
            "uid": "test-uid"
        }
    })
    .to_string()
}

/// Create a mock object JSON response with a resource version
pub fn object_json(
    api_version: &str,
    kind: &str,
    name: &str,
    namespace: Option<&str>,
    resource_version: &str,
) -> String {
    let mut metadata = serde_json::json!({
        "name": name,
        "uid": "test-uid",
        "resourceVersion": resource_version
    });
    if let Some(namespace) = namespace {
        metadata["namespace"] = serde_json::Value::String(namespace.to_string());
    }
    serde_json::json!({
        "apiVersion": api_version,
        "kind": kind,
        "metadata": metadata
    })
    .to_string()
}

/// Create a 404 not found response
pub fn not_found_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" not found", resource, name),
        "reason": "NotFound",
        "code": 404
    })
    .to_string()
}

/// Create a 409 already exists response
pub fn conflict_json(resource: &str, name: &str) -> String {
    serde_json::json!({
        "kind": "Status",
        "apiVersion": "v1",
        "status": "Failure",
        "message": format!("{} \"{}\" already exists", resource, name),
        "reason": "AlreadyExists",
        "code": 409
    })
    .to_string()
}

/// Build a gzipped tar archive from (path, type, contents) entries
pub async fn tar_gz(entries: &[(&str, tokio_tar::EntryType, &[u8])]) -> Vec<u8> {
    use async_compression::tokio::bufread::GzipEncoder;

    let mut builder = tokio_tar::Builder::new(Vec::new());
    for (path, entry_type, data) in entries {
        let mut header = tokio_tar::Header::new_gnu();
        header.set_entry_type(*entry_type);
        header.set_size(data.len() as u64);
        header.set_mode(0o755);
        if path.contains("..") {
            // tokio-tar's append_data rejects paths containing `..`; write the
            // name field directly so traversal fixtures are emitted verbatim.
            let name_bytes = path.as_bytes();
            let gnu = header.as_gnu_mut().unwrap();
            gnu.name[..name_bytes.len()].copy_from_slice(name_bytes);
            header.set_cksum();
            builder.append(&header, *data).await.unwrap();
        } else {
            builder.append_data(&mut header, path, *data).await.unwrap();
        }
    }
    let tar = builder.into_inner().await.unwrap();

    let mut encoder = GzipEncoder::new(&tar[..]);
    let mut compressed = Vec::new();
    tokio::io::copy(&mut encoder, &mut compressed)
        .await
        .unwrap();
    compressed
}

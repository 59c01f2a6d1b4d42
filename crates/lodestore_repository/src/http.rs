//! HTTP transport implementation.
//!
//! This module provides an HTTP-based repository client. The actual HTTP
//! stack is abstracted via a trait to allow different implementations
//! (reqwest, ureq, hyper, a loopback stub for tests).

use crate::client::Repository;
use crate::error::{RepositoryError, RepositoryResult};
use lodestore_protocol::{
    AttributeMap, ChangeSet, Existence, ResourceDescription, ResourceUri,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::RwLock;

/// A single HTTP request, as handed to the [`HttpClient`].
#[derive(Debug, Clone, Copy)]
pub struct HttpRequest<'a> {
    /// HTTP method (`GET`, `HEAD`, `PUT`, `POST`, `PATCH`, `DELETE`).
    pub method: &'a str,
    /// Absolute request URL.
    pub url: &'a str,
    /// `Content-Type` header value, when a body is present.
    pub content_type: Option<&'a str>,
    /// `If-Match` header value for conditional writes.
    pub if_match: Option<&'a str>,
    /// Request body.
    pub body: Option<&'a [u8]>,
}

/// An HTTP response, as returned by the [`HttpClient`].
#[derive(Debug, Clone)]
pub struct HttpResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body.
    pub body: Vec<u8>,
}

/// HTTP client abstraction.
///
/// Implement this trait to provide the actual HTTP stack. Timeouts,
/// connection pooling, and cancellation live behind this boundary; the
/// repository client above it never retries.
pub trait HttpClient: Send + Sync {
    /// Sends a request and returns the response.
    fn send(&self, request: HttpRequest<'_>) -> Result<HttpResponse, String>;

    /// Checks if the client is connected/healthy.
    fn is_healthy(&self) -> bool;
}

/// HTTP-based repository client.
///
/// Request and response bodies are JSON renderings of the protocol
/// types. Remote status codes are translated into the repository error
/// taxonomy: 404 becomes `NotFound`, 410 becomes `Gone`, 409/412 become
/// `Conflict`, and 5xx becomes a retryable transport error.
pub struct HttpRepository<C: HttpClient> {
    client: C,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpRepository<C> {
    /// Creates a new HTTP repository client.
    pub fn new(client: C) -> Self {
        Self {
            client,
            last_error: RwLock::new(None),
        }
    }

    /// Returns the last transport error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().unwrap().clone()
    }

    fn set_error(&self, err: &str) {
        *self.last_error.write().unwrap() = Some(err.to_string());
    }

    fn clear_error(&self) {
        *self.last_error.write().unwrap() = None;
    }

    fn send(&self, request: HttpRequest<'_>) -> RepositoryResult<HttpResponse> {
        if !self.client.is_healthy() {
            return Err(RepositoryError::transport_fatal("HTTP client unhealthy"));
        }
        tracing::debug!(method = request.method, url = request.url, "repository request");
        let response = self.client.send(request).map_err(|e| {
            self.set_error(&e);
            RepositoryError::transport_retryable(e)
        })?;
        self.clear_error();
        Ok(response)
    }

    fn send_json<Req, Res>(
        &self,
        method: &str,
        uri: &ResourceUri,
        if_match: Option<&str>,
        request: &Req,
    ) -> RepositoryResult<Res>
    where
        Req: Serialize,
        Res: DeserializeOwned,
    {
        let body = serde_json::to_vec(request)
            .map_err(|e| RepositoryError::Protocol(format!("failed to encode request: {e}")))?;
        let response = self.send(HttpRequest {
            method,
            url: uri.as_str(),
            content_type: Some("application/json"),
            if_match,
            body: Some(&body),
        })?;
        match response.status {
            200 | 201 => serde_json::from_slice(&response.body).map_err(|e| {
                RepositoryError::Protocol(format!("failed to decode response: {e}"))
            }),
            status => Err(self.status_error(status, uri)),
        }
    }

    fn status_error(&self, status: u16, uri: &ResourceUri) -> RepositoryError {
        match status {
            404 => RepositoryError::not_found(uri.clone()),
            410 => RepositoryError::gone(uri.clone()),
            409 | 412 => RepositoryError::conflict(uri.clone()),
            s if s >= 500 => {
                RepositoryError::transport_retryable(format!("server error {s} for {uri}"))
            }
            s => RepositoryError::Protocol(format!("unexpected status {s} for {uri}")),
        }
    }
}

impl<C: HttpClient> Repository for HttpRepository<C> {
    fn probe(&self, uri: &ResourceUri) -> RepositoryResult<Existence> {
        let response = self.send(HttpRequest {
            method: "HEAD",
            url: uri.as_str(),
            content_type: None,
            if_match: None,
            body: None,
        })?;
        match response.status {
            200 | 204 => Ok(Existence::Present),
            410 => Ok(Existence::Gone),
            404 => Ok(Existence::Absent),
            status => Err(self.status_error(status, uri)),
        }
    }

    fn fetch(&self, uri: &ResourceUri) -> RepositoryResult<ResourceDescription> {
        let response = self.send(HttpRequest {
            method: "GET",
            url: uri.as_str(),
            content_type: None,
            if_match: None,
            body: None,
        })?;
        match response.status {
            200 => serde_json::from_slice(&response.body).map_err(|e| {
                RepositoryError::Protocol(format!("failed to decode response: {e}"))
            }),
            status => Err(self.status_error(status, uri)),
        }
    }

    fn put(
        &self,
        uri: &ResourceUri,
        attributes: &AttributeMap,
    ) -> RepositoryResult<ResourceDescription> {
        self.send_json("PUT", uri, None, attributes)
    }

    fn put_binary(
        &self,
        uri: &ResourceUri,
        content_type: &str,
        content: &[u8],
    ) -> RepositoryResult<ResourceDescription> {
        let response = self.send(HttpRequest {
            method: "PUT",
            url: uri.as_str(),
            content_type: Some(content_type),
            if_match: None,
            body: Some(content),
        })?;
        match response.status {
            200 | 201 => serde_json::from_slice(&response.body).map_err(|e| {
                RepositoryError::Protocol(format!("failed to decode response: {e}"))
            }),
            status => Err(self.status_error(status, uri)),
        }
    }

    fn post(
        &self,
        container: &ResourceUri,
        attributes: &AttributeMap,
    ) -> RepositoryResult<ResourceDescription> {
        self.send_json("POST", container, None, attributes)
    }

    fn patch(
        &self,
        uri: &ResourceUri,
        changes: &ChangeSet,
        version_token: Option<&str>,
    ) -> RepositoryResult<ResourceDescription> {
        self.send_json("PATCH", uri, version_token, changes)
    }

    fn delete(&self, uri: &ResourceUri) -> RepositoryResult<()> {
        let response = self.send(HttpRequest {
            method: "DELETE",
            url: uri.as_str(),
            content_type: None,
            if_match: None,
            body: None,
        })?;
        match response.status {
            200 | 204 => Ok(()),
            status => Err(self.status_error(status, uri)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Replays canned responses and records the requests it saw.
    struct StubClient {
        responses: Mutex<Vec<HttpResponse>>,
        seen: Mutex<Vec<(String, String)>>,
        healthy: bool,
    }

    impl StubClient {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses),
                seen: Mutex::new(Vec::new()),
                healthy: true,
            }
        }

        fn unhealthy() -> Self {
            Self {
                responses: Mutex::new(Vec::new()),
                seen: Mutex::new(Vec::new()),
                healthy: false,
            }
        }
    }

    impl HttpClient for StubClient {
        fn send(&self, request: HttpRequest<'_>) -> Result<HttpResponse, String> {
            self.seen
                .lock()
                .push((request.method.to_string(), request.url.to_string()));
            let mut responses = self.responses.lock();
            if responses.is_empty() {
                return Err("no canned response".into());
            }
            Ok(responses.remove(0))
        }

        fn is_healthy(&self) -> bool {
            self.healthy
        }
    }

    fn uri(s: &str) -> ResourceUri {
        ResourceUri::parse(s).unwrap()
    }

    fn response(status: u16, body: &[u8]) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_vec(),
        }
    }

    #[test]
    fn probe_maps_status_codes() {
        let repo = HttpRepository::new(StubClient::new(vec![
            response(200, b""),
            response(410, b""),
            response(404, b""),
        ]));
        let target = uri("http://repo/objects/1");

        assert_eq!(repo.probe(&target).unwrap(), Existence::Present);
        assert_eq!(repo.probe(&target).unwrap(), Existence::Gone);
        assert_eq!(repo.probe(&target).unwrap(), Existence::Absent);
    }

    #[test]
    fn fetch_decodes_description() {
        let target = uri("http://repo/objects/1");
        let description =
            ResourceDescription::new(target.clone(), AttributeMap::new()).with_version_token("v1");
        let body = serde_json::to_vec(&description).unwrap();

        let repo = HttpRepository::new(StubClient::new(vec![response(200, &body)]));
        let fetched = repo.fetch(&target).unwrap();
        assert_eq!(fetched, description);
    }

    #[test]
    fn fetch_not_found_and_gone() {
        let repo = HttpRepository::new(StubClient::new(vec![
            response(404, b""),
            response(410, b""),
        ]));
        let target = uri("http://repo/objects/1");

        assert!(matches!(
            repo.fetch(&target),
            Err(RepositoryError::NotFound { .. })
        ));
        assert!(matches!(
            repo.fetch(&target),
            Err(RepositoryError::Gone { .. })
        ));
    }

    #[test]
    fn patch_conflict_on_precondition_failure() {
        let repo = HttpRepository::new(StubClient::new(vec![response(412, b"")]));
        let target = uri("http://repo/objects/1");

        let result = repo.patch(&target, &ChangeSet::new(), Some("v1"));
        assert!(matches!(result, Err(RepositoryError::Conflict { .. })));
    }

    #[test]
    fn server_error_is_retryable() {
        let repo = HttpRepository::new(StubClient::new(vec![response(503, b"")]));
        let target = uri("http://repo/objects/1");

        let err = repo.delete(&target).unwrap_err();
        assert!(err.is_retryable());
    }

    #[test]
    fn unhealthy_client_fails_fast() {
        let repo = HttpRepository::new(StubClient::unhealthy());
        let target = uri("http://repo/objects/1");

        let err = repo.probe(&target).unwrap_err();
        assert!(!err.is_retryable());
    }

    #[test]
    fn transport_error_is_remembered() {
        let repo = HttpRepository::new(StubClient::new(Vec::new()));
        let target = uri("http://repo/objects/1");

        assert!(repo.probe(&target).is_err());
        assert_eq!(repo.last_error().as_deref(), Some("no canned response"));
    }
}

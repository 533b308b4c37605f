//! Thin credentialed HTTP wrapper shared by the session manager and the
//! circle operations.
//!
//! The cookie store plays the browser's part: the session cookie is set
//! and cleared by the server, never read or written here.

use reqwest::{Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;

use circles_types::api::ErrorBody;

use crate::error::ClientError;

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` points at the versioned API root,
    /// e.g. `http://localhost:8000/api/v1`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder().cookie_store(true).build()?;
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Ok(Self { http, base_url })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let resp = self.http.get(self.url(path)).send().await?;
        decode(resp, fallback).await
    }

    pub(crate) async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let resp = self.http.post(self.url(path)).json(body).send().await?;
        decode(resp, fallback).await
    }

    pub(crate) async fn put_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let resp = self.http.put(self.url(path)).json(body).send().await?;
        decode(resp, fallback).await
    }

    pub(crate) async fn delete_json<T: DeserializeOwned>(
        &self,
        path: &str,
        fallback: &str,
    ) -> Result<T, ClientError> {
        let resp = self.http.delete(self.url(path)).send().await?;
        decode(resp, fallback).await
    }

    /// DELETE where success carries no body (204).
    pub(crate) async fn delete_empty(&self, path: &str, fallback: &str) -> Result<(), ClientError> {
        let resp = self.http.delete(self.url(path)).send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(error_from(resp, fallback).await)
        }
    }
}

async fn decode<T: DeserializeOwned>(resp: Response, fallback: &str) -> Result<T, ClientError> {
    if resp.status().is_success() {
        resp.json::<T>()
            .await
            .map_err(|e| ClientError::Payload(format!("Malformed server response: {}", e)))
    } else {
        Err(error_from(resp, fallback).await)
    }
}

/// Maps a non-2xx response to a typed failure, carrying the server's
/// `{detail}` when one is present and `fallback` otherwise.
async fn error_from(resp: Response, fallback: &str) -> ClientError {
    let status = resp.status();
    let detail = resp
        .json::<ErrorBody>()
        .await
        .map(|body| body.detail)
        .unwrap_or_else(|_| fallback.to_string());

    match status {
        StatusCode::UNAUTHORIZED => ClientError::Unauthorized(detail),
        StatusCode::FORBIDDEN => ClientError::Forbidden(detail),
        StatusCode::NOT_FOUND => ClientError::NotFound(detail),
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => ClientError::Invalid(detail),
        _ => ClientError::Server(detail),
    }
}

//! Google Cloud Storage JSON API client.

use super::store::ObjectStore;
use crate::utils::config::DEFAULT_HTTP_TIMEOUT;
use crate::utils::error::PublishError;
use log::{debug, info};
use reqwest::blocking::{Client, Response};
use reqwest::{StatusCode, Url};

/// GCS bucket accessed with an OAuth bearer token
pub struct GcsStore {
    client: Client,
    endpoint: String,
    bucket: String,
    access_token: String,
}

impl GcsStore {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        access_token: impl Into<String>,
    ) -> Result<Self, PublishError> {
        let client = Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(PublishError::RequestFailed)?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            access_token: access_token.into(),
        })
    }

    /// Build `<endpoint>/<segments...>`, percent-encoding each segment
    fn url(&self, segments: &[&str]) -> Result<Url, PublishError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| PublishError::InvalidDestination(format!("{}: {}", self.endpoint, e)))?;

        url.path_segments_mut()
            .map_err(|_| PublishError::InvalidDestination(self.endpoint.clone()))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }
}

impl ObjectStore for GcsStore {
    fn get_object(&self, key: &str) -> Result<Option<Vec<u8>>, PublishError> {
        let mut url = self.url(&["storage", "v1", "b", self.bucket.as_str(), "o", key])?;
        url.query_pairs_mut().append_pair("alt", "media");

        debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.access_token)
            .send()
            .map_err(PublishError::RequestFailed)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let response = check_status(response)?;
        let bytes = response.bytes().map_err(PublishError::RequestFailed)?;

        Ok(Some(bytes.to_vec()))
    }

    fn put_object(&self, key: &str, body: &[u8], content_type: &str) -> Result<(), PublishError> {
        let mut url = self.url(&["upload", "storage", "v1", "b", self.bucket.as_str(), "o"])?;
        url.query_pairs_mut()
            .append_pair("uploadType", "media")
            .append_pair("name", key);

        info!("Uploading {} bytes to {}", body.len(), self.describe(key));
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.access_token)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(body.to_vec())
            .send()
            .map_err(PublishError::RequestFailed)?;

        check_status(response)?;

        Ok(())
    }

    fn describe(&self, key: &str) -> String {
        format!("gs://{}/{}", self.bucket, key)
    }
}

/// Map auth failures and other non-2xx statuses to errors
fn check_status(response: Response) -> Result<Response, PublishError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(PublishError::Unauthorized(format!(
            "HTTP {}: {}",
            status,
            response.text().unwrap_or_default()
        )));
    }

    if !status.is_success() {
        return Err(PublishError::InvalidResponse(format!(
            "HTTP {}: {}",
            status,
            response.text().unwrap_or_default()
        )));
    }

    Ok(response)
}

//! HTTP exchanges with the collaborator server.
//!
//! Each exchange maps both transport failures and unexpected statuses into
//! the [`OastClientError`] variant of the operation that issued it. Only an
//! exact 200 counts as success.

use crate::error::OastClientError;
use crate::protocol::{
    DEREGISTER_ENDPOINT, DeregisterRequest, POLL_ENDPOINT, POLL_ID_PARAM, POLL_SECRET_PARAM,
    PollResponse, REGISTER_ENDPOINT, RegisterRequest,
};

use common::{HttpStatusCode, RedactedSecret};

use std::time::Duration;

use log::debug;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, RequestBuilder, Response};
use url::Url;

#[derive(Clone)]
pub(crate) struct OastHttpClient {
    client: Client,
}

impl OastHttpClient {
    pub(crate) fn new(timeout: Duration) -> Result<Self, OastClientError> {
        let client = Client::builder().timeout(timeout).build().map_err(|e| {
            OastClientError::configuration(format!("Failed to build HTTP client: {e}"))
        })?;

        Ok(Self { client })
    }

    /// `{base}/{path}`, keeping any path prefix the base URL carries.
    pub(crate) fn endpoint(base_url: &Url, path: &str) -> Result<Url, url::ParseError> {
        Url::parse(&format!(
            "{}/{}",
            base_url.as_str().trim_end_matches('/'),
            path
        ))
    }

    fn prepare_request(
        &self,
        request: RequestBuilder,
        token: Option<&RedactedSecret>,
    ) -> RequestBuilder {
        match token {
            Some(token) => request.header(AUTHORIZATION, token.as_str()),
            None => request,
        }
    }

    pub(crate) async fn register(
        &self,
        base_url: &Url,
        token: Option<&RedactedSecret>,
        body: &RegisterRequest,
    ) -> Result<(), OastClientError> {
        let url = Self::endpoint(base_url, REGISTER_ENDPOINT)
            .map_err(|e| OastClientError::registration(None, format!("Invalid URL: {e}")))?;

        debug!("Registering correlation ID {} at {url}", body.correlation_id);

        let response = self
            .prepare_request(self.client.post(url), token)
            .json(body)
            .send()
            .await
            .map_err(|e| OastClientError::registration(None, format!("Request failed: {e}")))?;

        let status = HttpStatusCode(response.status().as_u16());
        if !status.is_ok() {
            return Err(OastClientError::registration(
                Some(status),
                format!("HTTP {status} - {}", body_text(response).await),
            ));
        }

        Ok(())
    }

    pub(crate) async fn poll(
        &self,
        base_url: &Url,
        token: Option<&RedactedSecret>,
        correlation_id: &str,
        secret_key: &RedactedSecret,
    ) -> Result<PollResponse, OastClientError> {
        let mut url = Self::endpoint(base_url, POLL_ENDPOINT)
            .map_err(|e| OastClientError::polling(None, format!("Invalid URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair(POLL_ID_PARAM, correlation_id)
            .append_pair(POLL_SECRET_PARAM, secret_key.as_str());

        let response = self
            .prepare_request(self.client.get(url), token)
            .send()
            .await
            // URL carries the secret
            .map_err(|e| {
                OastClientError::polling(None, format!("Request failed: {}", e.without_url()))
            })?;

        let status = HttpStatusCode(response.status().as_u16());
        if status.is_unauthorized() {
            return Err(OastClientError::authentication(format!(
                "HTTP {status} - {}",
                body_text(response).await
            )));
        }
        if !status.is_ok() {
            return Err(OastClientError::polling(
                Some(status),
                format!("HTTP {status} - {}", body_text(response).await),
            ));
        }

        let text = response.text().await.map_err(|e| {
            OastClientError::polling(Some(status), format!("Failed to read body: {e}"))
        })?;

        serde_json::from_str(&text).map_err(|e| {
            OastClientError::polling(Some(status), format!("Invalid poll response: {e}"))
        })
    }

    pub(crate) async fn deregister(
        &self,
        base_url: &Url,
        token: Option<&RedactedSecret>,
        body: &DeregisterRequest,
    ) -> Result<(), OastClientError> {
        let url = Self::endpoint(base_url, DEREGISTER_ENDPOINT)
            .map_err(|e| OastClientError::deregistration(None, format!("Invalid URL: {e}")))?;

        let response = self
            .prepare_request(self.client.post(url), token)
            .json(body)
            .send()
            .await
            .map_err(|e| OastClientError::deregistration(None, format!("Request failed: {e}")))?;

        let status = HttpStatusCode(response.status().as_u16());
        if !status.is_ok() {
            return Err(OastClientError::deregistration(
                Some(status),
                format!("HTTP {status} - {}", body_text(response).await),
            ));
        }

        Ok(())
    }
}

async fn body_text(response: Response) -> String {
    response.text().await.unwrap_or_default()
}

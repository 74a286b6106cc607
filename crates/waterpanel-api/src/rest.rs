// REST tag service client
//
// Wraps `reqwest::Client` with the tag service's URL layout, Basic auth,
// fixed tag-list request body, and `Values` response decoding.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::models::{TagReadRequest, TagValuesResponse};
use crate::transport::TransportConfig;

/// HTTP client for the tag web service.
///
/// Every read is a `POST http://{host}{endpoint}` carrying the full tag list.
/// The service answers with the current value of each tag.
pub struct TagClient {
    http: reqwest::Client,
    url: Url,
    username: String,
    password: SecretString,
    request: TagReadRequest,
    timeout: Duration,
}

impl TagClient {
    /// Create a client for `http://{host}{endpoint}`.
    ///
    /// `host` may carry a port (`10.0.0.5:8080`). `endpoint` is an absolute
    /// path such as `/WaWebService/Json/GetTagValue/express`.
    pub fn new(
        host: &str,
        endpoint: &str,
        username: String,
        password: SecretString,
        tags: &[String],
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let url = Self::endpoint_url(host, endpoint)?;
        let http = transport.build_client()?;
        let mut client = Self::with_client(http, url, username, password, tags);
        client.timeout = transport.timeout;
        Ok(client)
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        url: Url,
        username: String,
        password: SecretString,
        tags: &[String],
    ) -> Self {
        Self {
            http,
            url,
            username,
            password,
            request: TagReadRequest::new(tags.iter().cloned()),
            timeout: TransportConfig::default().timeout,
        }
    }

    /// Build `http://{host}{endpoint}`, tolerating a missing leading slash.
    pub fn endpoint_url(host: &str, endpoint: &str) -> Result<Url, Error> {
        let host = host.trim().trim_end_matches('/');
        let path = endpoint.trim();
        let full = if path.starts_with('/') {
            format!("http://{host}{path}")
        } else {
            format!("http://{host}/{path}")
        };
        Ok(Url::parse(&full)?)
    }

    /// The resolved service URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Read the current value of every configured tag.
    pub async fn read_tags(&self) -> Result<TagValuesResponse, Error> {
        debug!("POST {}", self.url);

        let resp = self
            .http
            .post(self.url.clone())
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .json(&self.request)
            .send()
            .await
            .map_err(|e| self.classify(e))?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| self.classify(e))?;

        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body,
        })
    }

    fn classify(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_url_joins_host_and_path() {
        let url =
            TagClient::endpoint_url("192.168.0.10", "/WaWebService/Json/GetTagValue/express")
                .unwrap();
        assert_eq!(
            url.as_str(),
            "http://192.168.0.10/WaWebService/Json/GetTagValue/express"
        );
    }

    #[test]
    fn endpoint_url_keeps_port_and_fixes_slash() {
        let url = TagClient::endpoint_url("localhost:8080/", "api/tags").unwrap();
        assert_eq!(url.as_str(), "http://localhost:8080/api/tags");
    }

    #[test]
    fn endpoint_url_rejects_garbage_host() {
        assert!(TagClient::endpoint_url("bad host", "/x").is_err());
    }
}

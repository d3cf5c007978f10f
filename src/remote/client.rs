use std::time::Duration;
use reqwest::{Client, Method, RequestBuilder};
use url::Url;
use crate::config::Config;
use crate::core::{Result, UploadError};

/// Shared HTTP plumbing for the remote adapters.
#[derive(Debug, Clone)]
pub struct RemoteClient {
    pub client: Client,
    pub endpoint: Url,
    pub token: Option<String>,
}

impl RemoteClient {
    pub fn new(endpoint: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if endpoint.cannot_be_a_base() {
            return Err(UploadError::Config(format!("endpoint {} cannot be a base URL", endpoint)));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            token: token.filter(|token| !token.is_empty()),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.endpoint,
            config.token.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// `endpoint` with `segments` appended, each one percent-encoded.
    pub fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|_| UploadError::Config(format!("endpoint {} cannot be a base URL", self.endpoint)))?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_building() {
        let client = RemoteClient::new("https://files.example.com/api/", None, Duration::from_secs(5)).unwrap();
        let url = client.url(&["folders", "a b", "files"]).unwrap();
        assert_eq!(url.as_str(), "https://files.example.com/api/folders/a%20b/files");

        let client = RemoteClient::new("https://files.example.com/api", Some(String::new()), Duration::from_secs(5)).unwrap();
        assert!(client.token.is_none());
        assert_eq!(client.url(&["files", "7", "versions"]).unwrap().path(), "/api/files/7/versions");
    }

    #[test]
    fn test_rejects_non_base_endpoint() {
        assert!(RemoteClient::new("mailto:someone@example.com", None, Duration::from_secs(5)).is_err());
        assert!(RemoteClient::new("not a url", None, Duration::from_secs(5)).is_err());
    }
}

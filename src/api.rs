// API client module: a small blocking HTTP client that talks to the
// beagle backend. Every command resolves to exactly one call through
// here; the client holds the base URL and the live access token.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::{Method, StatusCode, Url};
use serde_json::{json, Map, Value};

use crate::config::{endpoints, Config};

/// Blocking client for the backend. Holds a reqwest client, the
/// normalized base URL and the current bearer token for authenticated
/// calls.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl ApiClient {
    /// Create an ApiClient for the configured endpoint. The base URL is
    /// normalized to end with a slash so that relative joins keep the
    /// full path.
    pub fn new(config: &Config) -> Result<Self> {
        let mut base_url = Url::parse(&config.endpoint)
            .with_context(|| format!("Invalid backend endpoint '{}'", config.endpoint))?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let client = Client::builder()
            .build()
            .context("Failed to build HTTP client")?;
        Ok(ApiClient {
            client,
            base_url,
            token: String::new(),
        })
    }

    /// Store a bearer token for subsequent authenticated requests.
    pub fn set_token(&mut self, token: &str) {
        self.token = token.to_string();
    }

    /// Helper to build the Authorization header map from the current
    /// token.
    fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        let val = format!("Bearer {}", self.token);
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&val).unwrap());
        headers
    }

    fn endpoint_url(&self, relative: &str) -> Result<Url> {
        self.base_url
            .join(relative)
            .with_context(|| format!("Invalid endpoint path '{}'", relative))
    }

    /// GET an endpoint with query parameters and return the response
    /// JSON.
    pub fn get(&self, relative: &str, query: &[(String, String)]) -> Result<Value> {
        let url = self.endpoint_url(relative)?;
        self.get_url_with_query(url, query)
    }

    /// GET an already-absolute URL (a stored pagination cursor carries
    /// its own query string).
    pub fn get_absolute(&self, url: &str) -> Result<Value> {
        let url = Url::parse(url).with_context(|| format!("Invalid cursor URL '{}'", url))?;
        self.get_url_with_query(url, &[])
    }

    fn get_url_with_query(&self, url: Url, query: &[(String, String)]) -> Result<Value> {
        let res = self
            .client
            .get(url)
            .headers(self.auth_headers())
            .query(query)
            .send()
            .context("Failed to send request")?;
        if !res.status().is_success() {
            let status = res.status();
            bail!(
                "Request failed: {} {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status")
            );
        }
        res.json().context("Failed to parse response JSON")
    }

    /// Issue one write-style request (POST/PUT/PATCH) with a JSON body.
    /// A non-success status becomes an error carrying the reason phrase
    /// and the body that was sent, so the caller can surface a useful
    /// diagnostic without crashing.
    pub fn send_write(&self, method: Method, relative: &str, body: &Value) -> Result<Value> {
        let url = self.endpoint_url(relative)?;
        let res = self
            .client
            .request(method, url)
            .headers(self.auth_headers())
            .json(body)
            .send()
            .context("Failed to send request")?;
        let status = res.status();
        if !status.is_success() {
            bail!(
                "Request failed: {} {}\nRequest body:\n{}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unknown status"),
                pretty(body)
            );
        }
        res.json().context("Failed to parse response JSON")
    }

    /// DELETE one resource per identifier and report the outcome for
    /// each one independently. A transport error counts as a failed
    /// delete for that identifier, not as a failure of the whole batch.
    pub fn delete_each(&self, relative: &str, ids: &[String]) -> Result<Value> {
        let mut report = Map::new();
        for id in ids {
            let url = self.endpoint_url(&format!("{}{}/", relative, id))?;
            let deleted = self
                .client
                .delete(url)
                .headers(self.auth_headers())
                .send()
                .map(|res| res.status() == StatusCode::NO_CONTENT)
                .unwrap_or(false);
            report.insert(id.clone(), Value::String(delete_outcome(deleted).into()));
        }
        Ok(Value::Object(report))
    }

    // Token endpoints. Verify and refresh swallow failures (any
    // non-success or transport error just moves the authenticator to
    // its next stage); only the final credential submission surfaces an
    // error.

    /// True when the backend accepts the given access token.
    pub fn verify_token(&self, token: &str) -> bool {
        let url = match self.endpoint_url(endpoints::VERIFY) {
            Ok(url) => url,
            Err(_) => return false,
        };
        self.client
            .post(url)
            .json(&json!({ "token": token }))
            .send()
            .map(|res| res.status().is_success())
            .unwrap_or(false)
    }

    /// Mint a new access token from a refresh token, or None if the
    /// refresh token is no longer accepted.
    pub fn refresh_access(&self, refresh: &str) -> Option<String> {
        let url = self.endpoint_url(endpoints::REFRESH).ok()?;
        let res = self
            .client
            .post(url)
            .json(&json!({ "refresh": refresh }))
            .send()
            .ok()?;
        if !res.status().is_success() {
            return None;
        }
        let body: Value = res.json().ok()?;
        body.get("access").and_then(Value::as_str).map(str::to_string)
    }

    /// Exchange credentials for a fresh access/refresh token pair.
    pub fn obtain_tokens(&self, username: &str, password: &str) -> Result<(String, String)> {
        let url = self.endpoint_url(endpoints::AUTH)?;
        let res = self
            .client
            .post(url)
            .json(&json!({ "username": username, "password": password }))
            .send()
            .context("Failed to send auth request")?;
        if !res.status().is_success() {
            bail!("Authentication failed: {}", res.status());
        }
        let body: Value = res.json().context("Parsing auth response json")?;
        let access = body.get("access").and_then(Value::as_str);
        let refresh = body.get("refresh").and_then(Value::as_str);
        match (access, refresh) {
            (Some(a), Some(r)) => Ok((a.to_string(), r.to_string())),
            _ => bail!("Auth response did not contain tokens"),
        }
    }
}

fn delete_outcome(deleted: bool) -> &'static str {
    if deleted {
        "Successfully deleted"
    } else {
        "Failed to be deleted"
    }
}

/// Pretty-print a JSON value for the terminal. Field order follows the
/// backend's own ordering.
pub fn pretty(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

/// Merge repeated `key:value` metadata options into one JSON object,
/// splitting on the first colon. Later occurrences of a key win.
pub fn merge_metadata(pairs: &[String]) -> Result<Map<String, Value>> {
    let mut merged = Map::new();
    for pair in pairs {
        match pair.split_once(':') {
            Some((key, value)) => {
                merged.insert(key.to_string(), Value::String(value.to_string()));
            }
            None => bail!("Invalid metadata '{}', expected key:value", pair),
        }
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metadata_pairs_merge_into_one_object() {
        let pairs = vec!["requestId:09324_C".to_string(), "owner:alice".to_string()];
        let merged = merge_metadata(&pairs).unwrap();
        assert_eq!(merged.len(), 2);
        assert_eq!(merged["requestId"], "09324_C");
        assert_eq!(merged["owner"], "alice");
    }

    #[test]
    fn metadata_value_may_contain_colons() {
        let pairs = vec!["location:file:///path".to_string()];
        let merged = merge_metadata(&pairs).unwrap();
        assert_eq!(merged["location"], "file:///path");
    }

    #[test]
    fn later_metadata_occurrence_wins() {
        let pairs = vec!["owner:alice".to_string(), "owner:bob".to_string()];
        let merged = merge_metadata(&pairs).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged["owner"], "bob");
    }

    #[test]
    fn metadata_without_colon_is_rejected() {
        assert!(merge_metadata(&["broken".to_string()]).is_err());
    }

    #[test]
    fn delete_outcomes_are_per_identifier() {
        assert_eq!(delete_outcome(true), "Successfully deleted");
        assert_eq!(delete_outcome(false), "Failed to be deleted");
    }

    #[test]
    fn base_url_joins_keep_the_endpoint_path() {
        let config = Config {
            endpoint: "http://host:8000".into(),
            username: None,
            password: None,
        };
        let api = ApiClient::new(&config).unwrap();
        let url = api.endpoint_url("v0/fs/files/").unwrap();
        assert_eq!(url.as_str(), "http://host:8000/v0/fs/files/");

        let url = api.endpoint_url(&format!("{}{}/", "v0/fs/files/", "abc")).unwrap();
        assert_eq!(url.as_str(), "http://host:8000/v0/fs/files/abc/");
    }
}

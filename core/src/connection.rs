use crate::error::{Error, Result};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::multipart::Form;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub mod constants {
    use std::time::Duration;

    /// Timeout applied to every request unless the caller picks another one.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

    /// Path under the server root where the JSON API lives.
    pub const API_PREFIX: &str = "api/";
}

/// HTTP plumbing shared by every API call: base URL, credential and the
/// reqwest client. Each call is exactly one request; nothing is retried.
#[derive(Clone)]
pub struct Connection {
    base_url: Url,
    api_key: String,
    client: Client,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl Connection {
    pub fn new(host: &str, port: u16, api_key: &str, timeout: Duration) -> Result<Self> {
        let base_url = base_url(host, port)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("backupchan-rs/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(Error::Connection)?;

        debug!(base_url = %base_url, "Created backupchan connection");

        Ok(Self {
            base_url,
            api_key: api_key.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T> {
        let path = segments.join("/");
        let request = self.request(Method::GET, segments)?;
        self.execute(Method::GET, &path, request).await
    }

    pub async fn post<T, B>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let path = segments.join("/");
        let request = self.request(Method::POST, segments)?.json(body);
        self.execute(Method::POST, &path, request).await
    }

    pub async fn patch<T, B>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let path = segments.join("/");
        let request = self.request(Method::PATCH, segments)?.json(body);
        self.execute(Method::PATCH, &path, request).await
    }

    pub async fn delete<T, B>(&self, segments: &[&str], body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let path = segments.join("/");
        let request = self.request(Method::DELETE, segments)?.json(body);
        self.execute(Method::DELETE, &path, request).await
    }

    pub async fn post_form<T: DeserializeOwned>(&self, segments: &[&str], form: Form) -> Result<T> {
        let path = segments.join("/");
        let request = self.request(Method::POST, segments)?.multipart(form);
        self.execute(Method::POST, &path, request).await
    }

    /// URL of the endpoint made of `segments` under the API root. Each
    /// segment is percent-encoded on its own, so `?`, `#` and `/` inside an
    /// id stay part of that id.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| Error::validation(format!("'{}' cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        let url = self.endpoint(segments)?;
        Ok(self
            .client
            .request(method, url)
            .bearer_auth(&self.api_key))
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        request: RequestBuilder,
    ) -> Result<T> {
        debug!(method = %method, path, "Sending request");

        let response = request.send().await.map_err(|e| {
            warn!(method = %method, path, error = %e, "Request failed");
            Error::Connection(e)
        })?;

        let status = response.status();
        let body = response.text().await.map_err(Error::Connection)?;
        debug!(method = %method, path, status = status.as_u16(), "Received response");

        let json: Value = match serde_json::from_str(&body) {
            Ok(json) => json,
            Err(e) if status.is_success() => {
                return Err(Error::InvalidResponse(format!(
                    "{} {}: body is not JSON: {}",
                    method, path, e
                )));
            }
            // Error pages from proxies are rarely JSON; keep the status.
            Err(_) => Value::Null,
        };

        check_success(status, path, &json)?;

        serde_json::from_value(json).map_err(|e| {
            Error::InvalidResponse(format!("{} {}: unexpected response shape: {}", method, path, e))
        })
    }
}

/// Turns a response that is not a success into the matching error.
fn check_success(status: StatusCode, path: &str, json: &Value) -> Result<()> {
    let success = json.get("success").and_then(Value::as_bool).unwrap_or(false);
    if status.is_success() && success {
        return Ok(());
    }

    let message = json
        .get("message")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });

    warn!(path, status = status.as_u16(), message = %message, "Server reported failure");

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(Error::Auth { message }),
        StatusCode::NOT_FOUND => Err(Error::NotFound {
            what: "Resource",
            id: path.to_string(),
        }),
        _ => Err(Error::Server {
            status: status.as_u16(),
            message,
        }),
    }
}

/// Builds `<host>:<port>/api/`, defaulting to plain http when the host has
/// no scheme.
fn base_url(host: &str, port: u16) -> Result<Url> {
    let host = host.trim();
    if host.is_empty() {
        return Err(Error::validation("host must not be empty"));
    }
    if port == 0 {
        return Err(Error::validation("port must be a positive integer"));
    }

    let with_scheme = if host.contains("://") {
        host.to_string()
    } else {
        format!("http://{}", host)
    };

    let mut url = Url::parse(&with_scheme)?;
    if url.cannot_be_a_base() || url.host_str().is_none() {
        return Err(Error::validation(format!("'{}' is not a usable server address", host)));
    }
    url.set_port(Some(port))
        .map_err(|_| Error::validation(format!("cannot set port on '{}'", host)))?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url.join(constants::API_PREFIX)?)
}

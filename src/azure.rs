use crate::credential::{AccountCredential, BlobAuth, BlobEndpoint};
use crate::error::{ConfigError, SinkError};
use crate::sink::{AppendOutcome, AppendSink};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::{Client, StatusCode};
use sha2::Sha256;
use std::error::Error;

/// REST API version sent with every request.
pub const API_VERSION: &str = "2021-08-06";

type HmacSha256 = Hmac<Sha256>;

/// Configuration for [`AzureAppendBlobSink`].
#[derive(Clone, Debug)]
pub struct AzureBlobConfig {
    pub endpoint: BlobEndpoint,
    pub container_name: String,
}

impl AzureBlobConfig {
    /// Resolve `account` and target `container_name`.
    pub fn new(account: &AccountCredential, container_name: impl Into<String>) -> Result<Self, ConfigError> {
        let container_name = container_name.into();
        if container_name.is_empty() {
            return Err(ConfigError::EmptyName("containerName"));
        }
        Ok(AzureBlobConfig { endpoint: account.resolve()?, container_name })
    }
}

/// Azure append blob implementation of [`AppendSink`] using the Blob REST API.
///
/// `ensure_exists` issues a conditional `Put Blob` (`If-None-Match: *`) so an
/// existing blob is left untouched; `append_block` issues `Append Block`.
#[derive(Clone)]
pub struct AzureAppendBlobSink {
    client: Client,
    config: AzureBlobConfig,
}

struct BlobRequest<'a> {
    destination: &'a str,
    comp: Option<&'a str>,
    blob_type: Option<&'a str>,
    if_none_match: Option<&'a str>,
    body: &'a [u8],
}

impl AzureAppendBlobSink {
    /// Construct a new sink instance using the provided configuration.
    pub fn new(config: AzureBlobConfig) -> Self {
        let client = Client::new();
        Self { client, config }
    }

    /// URL path of `destination`, including any path prefix of the endpoint
    /// (the emulator puts the account name there).
    fn blob_path(&self, destination: &str) -> String {
        let encoded: Vec<_> = destination.split('/').map(urlencoding::encode).collect();
        format!(
            "{}/{}/{}",
            endpoint_path(&self.config.endpoint.url),
            urlencoding::encode(&self.config.container_name),
            encoded.join("/")
        )
    }

    fn url(&self, path: &str, comp: Option<&str>) -> String {
        let mut query = Vec::new();
        if let Some(comp) = comp {
            query.push(format!("comp={}", comp));
        }
        if let BlobAuth::Sas(token) = &self.config.endpoint.auth {
            query.push(token.clone());
        }

        let origin = endpoint_origin(&self.config.endpoint.url);
        if query.is_empty() {
            format!("{}{}", origin, path)
        } else {
            format!("{}{}?{}", origin, path, query.join("&"))
        }
    }

    async fn put(&self, request: BlobRequest<'_>) -> Result<reqwest::Response, Box<dyn Error + Send + Sync>> {
        let path = self.blob_path(request.destination);
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        let mut ms_headers = vec![("x-ms-date", date.as_str()), ("x-ms-version", API_VERSION)];
        if let Some(blob_type) = request.blob_type {
            ms_headers.push(("x-ms-blob-type", blob_type));
        }

        let mut builder = self
            .client
            .put(self.url(&path, request.comp))
            .header("Content-Length", request.body.len())
            .body(request.body.to_vec());
        for (name, value) in &ms_headers {
            builder = builder.header(*name, *value);
        }
        if let Some(condition) = request.if_none_match {
            builder = builder.header("If-None-Match", condition);
        }

        if let BlobAuth::SharedKey { account, key } = &self.config.endpoint.auth {
            let string_to_sign = string_to_sign(
                "PUT",
                request.body.len(),
                request.if_none_match,
                &ms_headers,
                &canonical_resource(account, &path, request.comp),
            );
            let signature = sign(key, &string_to_sign).map_err(|_| "account key rejected by HMAC")?;
            builder = builder.header("Authorization", format!("SharedKey {}:{}", account, signature));
        }

        Ok(builder.send().await?)
    }
}

#[async_trait]
impl AppendSink for AzureAppendBlobSink {
    async fn ensure_exists(&self, destination: &str) -> Result<(), SinkError> {
        let resp = self
            .put(BlobRequest {
                destination,
                comp: None,
                blob_type: Some("AppendBlob"),
                if_none_match: Some("*"),
                body: &[],
            })
            .await
            .map_err(|e| SinkError::create(destination, e))?;

        match resp.status() {
            status if status.is_success() => Ok(()),
            // BlobAlreadyExists
            StatusCode::CONFLICT => Ok(()),
            status => Err(SinkError::create(destination, status_error(status, &resp))),
        }
    }

    async fn append_block(&self, destination: &str, block: &[u8]) -> Result<AppendOutcome, SinkError> {
        let resp = self
            .put(BlobRequest {
                destination,
                comp: Some("appendblock"),
                blob_type: None,
                if_none_match: None,
                body: block,
            })
            .await
            .map_err(|e| SinkError::append(destination, e))?;

        if resp.status().is_success() {
            Ok(AppendOutcome { error_code: error_code(&resp) })
        } else {
            Err(SinkError::append(destination, status_error(resp.status(), &resp)))
        }
    }
}

fn error_code(resp: &reqwest::Response) -> Option<String> {
    resp.headers()
        .get("x-ms-error-code")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

fn status_error(status: StatusCode, resp: &reqwest::Response) -> SinkError {
    SinkError::Status { status: status.as_u16(), code: error_code(resp) }
}

/// `scheme://host[:port]` part of an endpoint URL.
fn endpoint_origin(url: &str) -> &str {
    let after_scheme = url.find("://").map_or(0, |i| i + 3);
    match url[after_scheme..].find('/') {
        Some(i) => &url[..after_scheme + i],
        None => url,
    }
}

/// Path part of an endpoint URL, empty for a bare host.
fn endpoint_path(url: &str) -> &str {
    &url[endpoint_origin(url).len()..]
}

/// `/<account><path>` followed by the sorted query parameters that take
/// part in SharedKey signing.
fn canonical_resource(account: &str, path: &str, comp: Option<&str>) -> String {
    let mut resource = format!("/{}{}", account, path);
    if let Some(comp) = comp {
        resource.push_str("\ncomp:");
        resource.push_str(comp);
    }
    resource
}

/// String-to-sign for the SharedKey scheme (service version 2015-02-21+).
///
/// `ms_headers` must only contain lowercase `x-ms-*` headers.
fn string_to_sign(
    verb: &str,
    content_length: usize,
    if_none_match: Option<&str>,
    ms_headers: &[(&str, &str)],
    canonical_resource: &str,
) -> String {
    let content_length = if content_length == 0 { String::new() } else { content_length.to_string() };

    let mut headers = ms_headers.to_vec();
    headers.sort_by(|a, b| a.0.cmp(b.0));
    let canonical_headers: String = headers.iter().map(|(k, v)| format!("{}:{}\n", k, v.trim())).collect();

    [
        verb,
        "",                // Content-Encoding
        "",                // Content-Language
        content_length.as_str(),
        "",                // Content-MD5
        "",                // Content-Type
        "",                // Date
        "",                // If-Modified-Since
        "",                // If-Match
        if_none_match.unwrap_or(""),
        "",                // If-Unmodified-Since
        "",                // Range
    ]
    .join("\n")
        + "\n"
        + &canonical_headers
        + canonical_resource
}

fn sign(key: &[u8], string_to_sign: &str) -> Result<String, hmac::digest::InvalidLength> {
    let mut mac = HmacSha256::new_from_slice(key)?;
    mac.update(string_to_sign.as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

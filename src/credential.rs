use crate::error::ConfigError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt;

const DEFAULT_ENDPOINT_SUFFIX: &str = "core.windows.net";

/// Account name and key of the local storage emulator (Azurite).
const DEV_ACCOUNT_NAME: &str = "devstoreaccount1";
const DEV_ACCOUNT_KEY: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";
const DEV_BLOB_ENDPOINT: &str = "http://127.0.0.1:10000/devstoreaccount1";

/// Credentials of the storage account that owns the destination container.
///
/// Deserializes from `{ "name", "key" }`, `{ "host", "sasToken" }` or
/// `{ "connectionString" }`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AccountCredential {
    SharedKey { name: String, key: String },
    Sas {
        host: String,
        #[serde(rename = "sasToken", alias = "sas_token")]
        sas_token: String,
    },
    ConnectionString {
        #[serde(rename = "connectionString", alias = "connection_string")]
        connection_string: String,
    },
}

impl fmt::Debug for AccountCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccountCredential::SharedKey { name, .. } => {
                f.debug_struct("SharedKey").field("name", name).field("key", &"<redacted>").finish()
            }
            AccountCredential::Sas { host, .. } => {
                f.debug_struct("Sas").field("host", host).field("sas_token", &"<redacted>").finish()
            }
            AccountCredential::ConnectionString { .. } => {
                f.debug_struct("ConnectionString").finish_non_exhaustive()
            }
        }
    }
}

/// How requests to the blob endpoint are authorized.
#[derive(Clone, PartialEq, Eq)]
pub enum BlobAuth {
    /// HMAC-SHA256 `SharedKey` signature with the decoded account key.
    SharedKey { account: String, key: Vec<u8> },
    /// SAS query string, without the leading `?`.
    Sas(String),
}

impl fmt::Debug for BlobAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlobAuth::SharedKey { account, .. } => f.debug_struct("SharedKey").field("account", account).finish_non_exhaustive(),
            BlobAuth::Sas(_) => f.write_str("Sas(<redacted>)"),
        }
    }
}

/// Blob service endpoint plus the authorization to use against it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobEndpoint {
    /// Service URL without trailing slash, e.g. `https://acct.blob.core.windows.net`.
    pub url: String,
    pub auth: BlobAuth,
}

impl AccountCredential {
    pub fn shared_key(name: impl Into<String>, key: impl Into<String>) -> Self {
        AccountCredential::SharedKey { name: name.into(), key: key.into() }
    }

    pub fn sas(host: impl Into<String>, sas_token: impl Into<String>) -> Self {
        AccountCredential::Sas { host: host.into(), sas_token: sas_token.into() }
    }

    pub fn connection_string(connection_string: impl Into<String>) -> Self {
        AccountCredential::ConnectionString { connection_string: connection_string.into() }
    }

    /// Check the credential's shape without contacting the service.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.resolve().map(|_| ())
    }

    /// Validate and turn the credential into an endpoint + authorization.
    pub fn resolve(&self) -> Result<BlobEndpoint, ConfigError> {
        match self {
            AccountCredential::SharedKey { name, key } => {
                let key = decode_account_key(name, key)?;
                Ok(BlobEndpoint {
                    url: format!("https://{}.blob.{}", name, DEFAULT_ENDPOINT_SUFFIX),
                    auth: BlobAuth::SharedKey { account: name.clone(), key },
                })
            }
            AccountCredential::Sas { host, sas_token } => {
                let url = validate_host(host)?;
                let token = sas_token.trim_start_matches('?');
                if token.is_empty() {
                    return Err(ConfigError::EmptySasToken);
                }
                Ok(BlobEndpoint { url, auth: BlobAuth::Sas(token.to_string()) })
            }
            AccountCredential::ConnectionString { connection_string } => {
                parse_connection_string(connection_string)
            }
        }
    }
}

fn decode_account_key(name: &str, key: &str) -> Result<Vec<u8>, ConfigError> {
    let valid_name = (3..=24).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    if !valid_name {
        return Err(ConfigError::InvalidAccountName(name.to_string()));
    }
    match STANDARD.decode(key) {
        Ok(bytes) if !bytes.is_empty() => Ok(bytes),
        _ => Err(ConfigError::InvalidAccountKey),
    }
}

fn validate_host(host: &str) -> Result<String, ConfigError> {
    let trimmed = host.trim_end_matches('/');
    let rest = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .unwrap_or("");
    if rest.is_empty() {
        return Err(ConfigError::InvalidHost(host.to_string()));
    }
    Ok(trimmed.to_string())
}

/// Parse an Azure storage connection string
/// (`DefaultEndpointsProtocol=https;AccountName=..;AccountKey=..;EndpointSuffix=..`).
///
/// `BlobEndpoint` overrides the derived endpoint and `SharedAccessSignature`
/// takes precedence over the account key. `UseDevelopmentStorage=true`
/// targets the local emulator.
pub fn parse_connection_string(connection_string: &str) -> Result<BlobEndpoint, ConfigError> {
    let mut parts = BTreeMap::new();
    for segment in connection_string.split(';').map(str::trim).filter(|s| !s.is_empty()) {
        // values (keys, signatures) may themselves contain '='
        let (key, value) = segment
            .split_once('=')
            .ok_or_else(|| ConfigError::MalformedConnectionString(segment.to_string()))?;
        parts.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
    }

    if parts.get("usedevelopmentstorage").is_some_and(|v| v.eq_ignore_ascii_case("true")) {
        return Ok(BlobEndpoint {
            url: DEV_BLOB_ENDPOINT.to_string(),
            auth: BlobAuth::SharedKey {
                account: DEV_ACCOUNT_NAME.to_string(),
                key: decode_account_key(DEV_ACCOUNT_NAME, DEV_ACCOUNT_KEY)?,
            },
        });
    }

    let account = parts.get("accountname");
    let url = match (parts.get("blobendpoint"), account) {
        (Some(endpoint), _) => validate_host(endpoint)?,
        (None, Some(account)) => {
            let protocol = parts.get("defaultendpointsprotocol").map_or("https", String::as_str);
            let suffix = parts.get("endpointsuffix").map_or(DEFAULT_ENDPOINT_SUFFIX, String::as_str);
            format!("{}://{}.blob.{}", protocol, account, suffix)
        }
        (None, None) => return Err(ConfigError::MissingConnectionStringKey("AccountName or BlobEndpoint")),
    };

    if let Some(sas) = parts.get("sharedaccesssignature") {
        let token = sas.trim_start_matches('?');
        if token.is_empty() {
            return Err(ConfigError::EmptySasToken);
        }
        return Ok(BlobEndpoint { url, auth: BlobAuth::Sas(token.to_string()) });
    }

    let account = account.ok_or(ConfigError::MissingConnectionStringKey("AccountName"))?;
    let key = parts.get("accountkey").ok_or(ConfigError::MissingConnectionStringKey("AccountKey"))?;
    Ok(BlobEndpoint {
        url,
        auth: BlobAuth::SharedKey { account: account.clone(), key: decode_account_key(account, key)? },
    })
}

//! Environment variable names used by this crate for convenient
//! configuration of the transport from microservices.
//!
//! These are purely helpers; [`TransportOptions`] itself never reads the
//! environment.

use crate::config::TransportOptions;
use crate::credential::AccountCredential;
use crate::error::ConfigError;

/// Full Azure storage connection string. Takes precedence over the
/// name/key and host/SAS variables.
pub const AZURE_STORAGE_CONNECTION_STRING_ENV: &str = "AZURE_STORAGE_CONNECTION_STRING";

/// Storage account name (shared key auth).
pub const LOG_SINK_AZURE_ACCOUNT_NAME_ENV: &str = "LOG_SINK_AZURE_ACCOUNT_NAME";

/// Storage account key (shared key auth).
pub const LOG_SINK_AZURE_ACCOUNT_KEY_ENV: &str = "LOG_SINK_AZURE_ACCOUNT_KEY";

/// Blob service URL, e.g. `https://acct.blob.core.windows.net` (SAS auth).
pub const LOG_SINK_AZURE_HOST_ENV: &str = "LOG_SINK_AZURE_HOST";

/// SAS token (SAS auth).
pub const LOG_SINK_AZURE_SAS_TOKEN_ENV: &str = "LOG_SINK_AZURE_SAS_TOKEN";

/// Target container.
pub const LOG_SINK_AZURE_CONTAINER_ENV: &str = "LOG_SINK_AZURE_CONTAINER";

/// Base blob name.
pub const LOG_SINK_AZURE_BLOB_NAME_ENV: &str = "LOG_SINK_AZURE_BLOB_NAME";

/// Records buffered before a flush.
pub const LOG_SINK_BUFFER_LOG_SIZE_ENV: &str = "LOG_SINK_BUFFER_LOG_SIZE";

/// Maximum buffering time in milliseconds.
pub const LOG_SINK_SYNC_TIMEOUT_MS_ENV: &str = "LOG_SINK_SYNC_TIMEOUT_MS";

/// Rotation pattern, e.g. `YYYY-MM-DD`.
pub const LOG_SINK_ROTATE_PERIOD_ENV: &str = "LOG_SINK_ROTATE_PERIOD";

/// Blob name extension, e.g. `.log`.
pub const LOG_SINK_EXTENSION_ENV: &str = "LOG_SINK_EXTENSION";

/// Build [`TransportOptions`] from the process environment.
pub fn options_from_env() -> Result<TransportOptions, ConfigError> {
    options_from_lookup(|key| std::env::var(key).ok())
}

/// Build [`TransportOptions`] from `lookup`, which maps variable names to
/// values. Empty values count as unset. The result is validated.
pub fn options_from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<TransportOptions, ConfigError> {
    let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

    let account = if let Some(connection_string) = get(AZURE_STORAGE_CONNECTION_STRING_ENV) {
        AccountCredential::connection_string(connection_string)
    } else if let (Some(name), Some(key)) = (get(LOG_SINK_AZURE_ACCOUNT_NAME_ENV), get(LOG_SINK_AZURE_ACCOUNT_KEY_ENV)) {
        AccountCredential::shared_key(name, key)
    } else if let (Some(host), Some(token)) = (get(LOG_SINK_AZURE_HOST_ENV), get(LOG_SINK_AZURE_SAS_TOKEN_ENV)) {
        AccountCredential::sas(host, token)
    } else {
        return Err(ConfigError::MissingAccount);
    };

    let mut options = TransportOptions::new(
        account,
        get(LOG_SINK_AZURE_CONTAINER_ENV).unwrap_or_else(|| "logs".to_string()),
        get(LOG_SINK_AZURE_BLOB_NAME_ENV).unwrap_or_else(|| "app".to_string()),
    );

    if let Some(value) = get(LOG_SINK_BUFFER_LOG_SIZE_ENV) {
        options.buffer_log_size = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key: LOG_SINK_BUFFER_LOG_SIZE_ENV, value })?;
    }
    if let Some(value) = get(LOG_SINK_SYNC_TIMEOUT_MS_ENV) {
        options.sync_timeout = value
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidEnv { key: LOG_SINK_SYNC_TIMEOUT_MS_ENV, value })?;
    }
    if let Some(rotate_period) = get(LOG_SINK_ROTATE_PERIOD_ENV) {
        options.rotate_period = rotate_period;
    }
    options.extension = get(LOG_SINK_EXTENSION_ENV);

    options.validate()?;
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::time::Duration;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn sas_variables() {
        let options = options_from_lookup(lookup(&[
            (LOG_SINK_AZURE_HOST_ENV, "https://acct.blob.core.windows.net"),
            (LOG_SINK_AZURE_SAS_TOKEN_ENV, "?sv=1"),
            (LOG_SINK_AZURE_CONTAINER_ENV, "sample"),
            (LOG_SINK_AZURE_BLOB_NAME_ENV, "example_logs"),
            (LOG_SINK_BUFFER_LOG_SIZE_ENV, "50"),
            (LOG_SINK_SYNC_TIMEOUT_MS_ENV, "2000"),
            (LOG_SINK_ROTATE_PERIOD_ENV, "YYYY-MM-DD"),
            (LOG_SINK_EXTENSION_ENV, ".log"),
        ]))
        .unwrap();

        assert_eq!(options.account, AccountCredential::sas("https://acct.blob.core.windows.net", "?sv=1"));
        assert_eq!(options.container_name, "sample");
        assert_eq!(options.blob_name, "example_logs");
        assert_eq!(options.flush_policy().sync_timeout, Duration::from_secs(2));
        assert_eq!(options.buffer_log_size, 50);
        assert_eq!(options.rotate_period, "YYYY-MM-DD");
        assert_eq!(options.extension.as_deref(), Some(".log"));
    }

    #[test]
    fn connection_string_wins() {
        let options = options_from_lookup(lookup(&[
            (AZURE_STORAGE_CONNECTION_STRING_ENV, "UseDevelopmentStorage=true"),
            (LOG_SINK_AZURE_HOST_ENV, "https://acct.blob.core.windows.net"),
            (LOG_SINK_AZURE_SAS_TOKEN_ENV, "?sv=1"),
        ]))
        .unwrap();
        assert_eq!(options.account, AccountCredential::connection_string("UseDevelopmentStorage=true"));
        assert_eq!(options.container_name, "logs");
    }

    #[test]
    fn missing_account() {
        assert!(matches!(options_from_lookup(lookup(&[])), Err(ConfigError::MissingAccount)));
    }

    #[test]
    fn invalid_numbers_and_policies() {
        let base = [(AZURE_STORAGE_CONNECTION_STRING_ENV, "UseDevelopmentStorage=true")];

        let mut vars = base.to_vec();
        vars.push((LOG_SINK_BUFFER_LOG_SIZE_ENV, "many"));
        assert!(matches!(
            options_from_lookup(lookup(&vars)),
            Err(ConfigError::InvalidEnv { key: LOG_SINK_BUFFER_LOG_SIZE_ENV, .. })
        ));

        let mut vars = base.to_vec();
        vars.push((LOG_SINK_BUFFER_LOG_SIZE_ENV, "10"));
        assert!(matches!(
            options_from_lookup(lookup(&vars)),
            Err(ConfigError::SyncTimeoutRequired { buffer_log_size: 10 })
        ));
    }
}

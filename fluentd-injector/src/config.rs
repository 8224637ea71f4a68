use std::path::PathBuf;

use fluentd_common::constants::{
    AGGREGATOR_HOST_DEFAULT, AGGREGATOR_HOST_ENV, AGGREGATOR_PORT_DEFAULT, AGGREGATOR_PORT_ENV,
    FLUENTD_IMAGE_DEFAULT, FLUENTD_IMAGE_ENV, FLUENTD_INJECTOR_CERT_FILE,
    FLUENTD_INJECTOR_CERT_FILE_ENV, FLUENTD_INJECTOR_KEY_FILE, FLUENTD_INJECTOR_KEY_FILE_ENV,
    FLUENTD_INJECTOR_PORT_DEFAULT, FLUENTD_INJECTOR_PORT_ENV, FLUENTD_LOG_CONFIG_FILE,
    FLUENTD_LOG_CONFIG_FILE_ENV,
};
use fluentd_common::errors::FluentdServiceError;

/// Settings baked into every injected sidecar. Read once at start up and
/// shared read-only by all requests.
#[derive(Debug, Clone, PartialEq)]
pub struct InjectorConfig {
    pub sidecar_image: String,
    pub aggregator_host: String,
    pub aggregator_port: String,
}

impl Default for InjectorConfig {
    fn default() -> Self {
        InjectorConfig {
            sidecar_image: FLUENTD_IMAGE_DEFAULT.to_string(),
            aggregator_host: AGGREGATOR_HOST_DEFAULT.to_string(),
            aggregator_port: AGGREGATOR_PORT_DEFAULT.to_string(),
        }
    }
}

impl InjectorConfig {
    pub fn from_env() -> Self {
        InjectorConfig::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        InjectorConfig {
            sidecar_image: lookup(FLUENTD_IMAGE_ENV)
                .unwrap_or_else(|| FLUENTD_IMAGE_DEFAULT.to_string()),
            aggregator_host: lookup(AGGREGATOR_HOST_ENV)
                .unwrap_or_else(|| AGGREGATOR_HOST_DEFAULT.to_string()),
            aggregator_port: lookup(AGGREGATOR_PORT_ENV)
                .unwrap_or_else(|| AGGREGATOR_PORT_DEFAULT.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub port: u16,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
    pub log_config_file: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, FluentdServiceError> {
        ServerConfig::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F: Fn(&str) -> Option<String>>(
        lookup: F,
    ) -> Result<Self, FluentdServiceError> {
        let port = match lookup(FLUENTD_INJECTOR_PORT_ENV) {
            Some(port) => port.parse::<u16>().map_err(FluentdServiceError::from_error(
                &format!("Unable to parse {} value {}", FLUENTD_INJECTOR_PORT_ENV, port),
            ))?,
            None => FLUENTD_INJECTOR_PORT_DEFAULT,
        };
        Ok(ServerConfig {
            port,
            cert_file: PathBuf::from(
                lookup(FLUENTD_INJECTOR_CERT_FILE_ENV)
                    .unwrap_or_else(|| FLUENTD_INJECTOR_CERT_FILE.to_string()),
            ),
            key_file: PathBuf::from(
                lookup(FLUENTD_INJECTOR_KEY_FILE_ENV)
                    .unwrap_or_else(|| FLUENTD_INJECTOR_KEY_FILE.to_string()),
            ),
            log_config_file: PathBuf::from(
                lookup(FLUENTD_LOG_CONFIG_FILE_ENV)
                    .unwrap_or_else(|| FLUENTD_LOG_CONFIG_FILE.to_string()),
            ),
        })
    }
}

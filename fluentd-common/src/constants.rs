pub const FLUENTD_IMAGE_ENV: &str = "FLUENTD_IMAGE";
pub const FLUENTD_IMAGE_DEFAULT: &str = "fluent/fluentd:v1.14";
pub const AGGREGATOR_HOST_ENV: &str = "AGGREGATOR_HOST";
pub const AGGREGATOR_HOST_DEFAULT: &str = "fluentd-aggregator.logging.svc.cluster.local";
pub const AGGREGATOR_PORT_ENV: &str = "AGGREGATOR_PORT";
pub const AGGREGATOR_PORT_DEFAULT: &str = "24224";

pub const FLUENTD_INJECTOR_PORT_ENV: &str = "FLUENTD_INJECTOR_PORT";
pub const FLUENTD_INJECTOR_PORT_DEFAULT: u16 = 8443;
pub const FLUENTD_INJECTOR_CERT_FILE_ENV: &str = "FLUENTD_INJECTOR_CERT_FILE";
pub const FLUENTD_INJECTOR_CERT_FILE: &str = "/opt/fluentd-injector/k8s/fluentd-injector.crt";
pub const FLUENTD_INJECTOR_KEY_FILE_ENV: &str = "FLUENTD_INJECTOR_KEY_FILE";
pub const FLUENTD_INJECTOR_KEY_FILE: &str = "/opt/fluentd-injector/k8s/fluentd-injector.key";
pub const FLUENTD_LOG_CONFIG_FILE_ENV: &str = "FLUENTD_INJECTOR_LOG_CONFIG_FILE";
pub const FLUENTD_LOG_CONFIG_FILE: &str = "/opt/fluentd-injector/log4rs.yaml";

pub const FLUENTD_SIDECAR_NAME: &str = "fluentd-sidecar";
pub const LOG_VOLUME_NAME: &str = "log-volume";
pub const DEFAULT_LOG_DIR: &str = "/var/log";
pub const DEFAULT_TAG_PREFIX: &str = "application";
pub const APP_LABEL: &str = "app";
pub const UNKNOWN: &str = "unknown";

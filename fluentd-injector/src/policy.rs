use fluentd_common::annotations::{
    FLUENTD_INJECTOR_ANNOTATION_INJECT, FLUENTD_INJECTOR_ANNOTATION_LOG_DIR,
    FLUENTD_INJECTOR_ANNOTATION_TAG_PREFIX,
};
use fluentd_common::constants::{APP_LABEL, DEFAULT_LOG_DIR, DEFAULT_TAG_PREFIX};
use fluentd_common::traits::{Annotated, Labeled};

/// Boolean annotation values: only `true` in any ASCII case enables.
/// Surrounding whitespace is not trimmed.
pub fn is_enabled(value: Option<&String>) -> bool {
    value.map(|v| v.eq_ignore_ascii_case("true")).unwrap_or(false)
}

/// Per Pod injection settings.
///
/// Precedence for each field:
///  - `enabled`: `fluentd-injector/inject` annotation, else `false`
///  - `log_dir`: `fluentd-injector/log-dir` annotation, else `/var/log`
///  - `tag_prefix`: `fluentd-injector/tag-prefix` annotation, else the `app`
///    label, else `application`
#[derive(Debug, Clone, PartialEq)]
pub struct InjectionPolicy {
    pub enabled: bool,
    pub log_dir: String,
    pub tag_prefix: String,
}

impl InjectionPolicy {
    pub fn from_pod<P: Annotated + Labeled>(pod: &P) -> Self {
        InjectionPolicy {
            enabled: is_enabled(pod.annotation(FLUENTD_INJECTOR_ANNOTATION_INJECT)),
            log_dir: pod
                .annotation(FLUENTD_INJECTOR_ANNOTATION_LOG_DIR)
                .cloned()
                .unwrap_or_else(|| DEFAULT_LOG_DIR.to_string()),
            tag_prefix: pod
                .annotation(FLUENTD_INJECTOR_ANNOTATION_TAG_PREFIX)
                .or_else(|| pod.label(APP_LABEL))
                .cloned()
                .unwrap_or_else(|| DEFAULT_TAG_PREFIX.to_string()),
        }
    }
}

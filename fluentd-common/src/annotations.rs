use const_format::formatcp;

const COMPONENT_ANNOTATION: &str = "fluentd-injector";

macro_rules! fluentd_annotate {
    ($annotation:literal) => {{
        formatcp!("{}/{}", COMPONENT_ANNOTATION, $annotation)
    }};
}

pub const FLUENTD_INJECTOR_ANNOTATION_INJECT: &str = fluentd_annotate!("inject");
pub const FLUENTD_INJECTOR_ANNOTATION_LOG_DIR: &str = fluentd_annotate!("log-dir");
pub const FLUENTD_INJECTOR_ANNOTATION_TAG_PREFIX: &str = fluentd_annotate!("tag-prefix");

use std::collections::BTreeMap;

use fluentd_common::constants::{FLUENTD_SIDECAR_NAME, LOG_VOLUME_NAME};
use fluentd_common::errors::FluentdServiceError;
use fluentd_common::kubernetes::{containers, volumes};
use fluentd_macros::{fluentd_debug, fluentd_log, logger, with_dollar_sign};
use json_patch::PatchOperation::Add;
use json_patch::{AddOperation, Patch};
use k8s_openapi::api::core::v1::{
    Container, EmptyDirVolumeSource, EnvVar, EnvVarSource, ObjectFieldSelector, Pod,
    ResourceRequirements, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;

use crate::config::InjectorConfig;
use crate::policy::InjectionPolicy;

logger!("FluentdPatch");

const SIDECAR_MEMORY_LIMIT: &str = "200Mi";
const SIDECAR_CPU_REQUEST: &str = "100m";
const SIDECAR_MEMORY_REQUEST: &str = "100Mi";

macro_rules! env_var {
    (value :: $env_name:expr => $value:expr) => {{
        let mut env: EnvVar = Default::default();
        env.name = $env_name.to_string();
        env.value = Some($value);
        env
    }};

    (fieldRef :: $env_name:expr => $field_path:expr) => {{
        let mut env: EnvVar = Default::default();
        env.name = $env_name.to_string();
        let mut env_source: EnvVarSource = Default::default();
        env_source.field_ref = Some(ObjectFieldSelector {
            field_path: $field_path.to_string(),
            api_version: None,
        });
        env.value_from = Some(env_source);
        env
    }};
}

macro_rules! add {
    ($path:expr => $value:expr) => {{
        Add(AddOperation {
            path: $path.to_string(),
            value: serde_json::to_value($value)?,
        })
    }};
}

pub trait Patched {
    fn patch(&self, pod: &Pod, policy: &InjectionPolicy) -> Result<Patch, FluentdServiceError>;
}

/// Builds the operations that add the fluentd sidecar to a Pod.
pub struct FluentdPod<'a> {
    pub config: &'a InjectorConfig,
}

fn log_volume_mount(log_dir: &str) -> VolumeMount {
    VolumeMount {
        name: LOG_VOLUME_NAME.to_string(),
        mount_path: log_dir.to_string(),
        ..Default::default()
    }
}

fn log_volume() -> Volume {
    Volume {
        name: LOG_VOLUME_NAME.to_string(),
        empty_dir: Some(EmptyDirVolumeSource::default()),
        ..Default::default()
    }
}

impl FluentdPod<'_> {
    fn variables(&self, policy: &InjectionPolicy) -> Vec<EnvVar> {
        vec![
            env_var!(value :: "FLUENT_AGGREGATOR_HOST" => self.config.aggregator_host.clone()),
            env_var!(value :: "FLUENT_AGGREGATOR_PORT" => self.config.aggregator_port.clone()),
            env_var!(value :: "LOG_DIR" => policy.log_dir.clone()),
            env_var!(value :: "TAG_PREFIX" => policy.tag_prefix.clone()),
            env_var!(fieldRef :: "POD_NAME" => "metadata.name"),
            env_var!(fieldRef :: "POD_NAMESPACE" => "metadata.namespace"),
        ]
    }

    fn sidecar(&self, policy: &InjectionPolicy) -> Container {
        Container {
            name: FLUENTD_SIDECAR_NAME.to_string(),
            image: Some(self.config.sidecar_image.clone()),
            resources: Some(ResourceRequirements {
                limits: Some(BTreeMap::from([(
                    "memory".to_string(),
                    Quantity(SIDECAR_MEMORY_LIMIT.to_string()),
                )])),
                requests: Some(BTreeMap::from([
                    ("cpu".to_string(), Quantity(SIDECAR_CPU_REQUEST.to_string())),
                    (
                        "memory".to_string(),
                        Quantity(SIDECAR_MEMORY_REQUEST.to_string()),
                    ),
                ])),
                ..Default::default()
            }),
            env: Some(self.variables(policy)),
            volume_mounts: Some(vec![log_volume_mount(&policy.log_dir)]),
            ..Default::default()
        }
    }
}

impl Patched for FluentdPod<'_> {
    fn patch(&self, pod: &Pod, policy: &InjectionPolicy) -> Result<Patch, FluentdServiceError> {
        let mut patches = vec![];

        if volumes(pod).is_none() {
            patches.push(add!("/spec/volumes" => Vec::<Volume>::new()));
        }
        patches.push(add!("/spec/volumes/-" => log_volume()));

        // Indices refer to the containers as submitted, the sidecar goes last
        let empty = vec![];
        let pod_containers = containers(pod).unwrap_or(&empty);
        for (i, c) in pod_containers.iter().enumerate() {
            if c.volume_mounts.is_none() {
                patches.push(add!(
                    format!("/spec/containers/{}/volumeMounts", i) => Vec::<VolumeMount>::new()
                ));
            }
            patches.push(add!(
                format!("/spec/containers/{}/volumeMounts/-", i) => log_volume_mount(&policy.log_dir)
            ));
        }

        // A null or missing containers list has nothing to append to
        if pod_containers.is_empty() {
            patches.push(add!("/spec/containers" => Vec::<Container>::new()));
        }
        patches.push(add!("/spec/containers/-" => self.sidecar(policy)));
        debug!("Pod patches: {:?}", patches);
        Ok(Patch(patches))
    }
}

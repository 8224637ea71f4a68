//! Fixture builders shared by the workspace tests.
//!
//! Expansions refer to `k8s_openapi` and `serde_json`, so the calling crate
//! needs both as dependencies.

/// Builds a container named `$name`, optionally with volume mounts given as
/// `(volume, mount_path)` pairs.
#[macro_export]
macro_rules! container {
    ($name:expr) => {{
        ::k8s_openapi::api::core::v1::Container {
            name: $name.to_string(),
            image: Some("busybox".to_string()),
            ..Default::default()
        }
    }};

    ($name:expr, mounts => $mounts:expr) => {{
        let mut c = $crate::container!($name);
        c.volume_mounts = Some(
            $mounts
                .iter()
                .map(|(n, p)| ::k8s_openapi::api::core::v1::VolumeMount {
                    name: n.to_string(),
                    mount_path: p.to_string(),
                    ..Default::default()
                })
                .collect(),
        );
        c
    }};
}

#[macro_export]
macro_rules! set_pod_field {
    ($pod:ident, annotations => $annotations:expr) => {
        $pod.metadata.annotations = Some(
            $annotations
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<::std::collections::BTreeMap<String, String>>(),
        );
    };

    ($pod:ident, labels => $labels:expr) => {
        $pod.metadata.labels = Some(
            $labels
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<::std::collections::BTreeMap<String, String>>(),
        );
    };

    ($pod:ident, containers => $containers:expr) => {
        if let Some(spec) = $pod.spec.as_mut() {
            spec.containers = $containers;
        }
    };

    ($pod:ident, volumes => $volumes:expr) => {
        if let Some(spec) = $pod.spec.as_mut() {
            spec.volumes = Some(
                $volumes
                    .iter()
                    .map(|n| ::k8s_openapi::api::core::v1::Volume {
                        name: n.to_string(),
                        ..Default::default()
                    })
                    .collect(),
            );
        }
    };

    ($pod:ident, name => $name:expr) => {
        $pod.metadata.name = $name.map(|n: &str| n.to_string());
    };
}

/// `pod!(n)` is a Pod `pod{n}` in namespace `ns{n}` with a single container
/// `app` and neither volumes nor volume mounts.
#[macro_export]
macro_rules! pod {
    ($n:tt) => {{
        ::k8s_openapi::api::core::v1::Pod {
            metadata: ::k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta {
                name: Some(format!("pod{}", $n)),
                namespace: Some(format!("ns{}", $n)),
                ..Default::default()
            },
            spec: Some(::k8s_openapi::api::core::v1::PodSpec {
                containers: vec![$crate::container!("app")],
                ..Default::default()
            }),
            status: None,
        }
    }};

    ($n:tt, $($field:ident => $value:expr),+ $(,)?) => {{
        let mut pod = $crate::pod!($n);
        $(
            $crate::set_pod_field!(pod, $field => $value);
        )+
        pod
    }};
}

/// AdmissionReview JSON for a CREATE of `$object` with kind `$kind`.
#[macro_export]
macro_rules! admission_review {
    ($kind:expr, $object:expr) => {
        $crate::admission_review!($kind, $object, "705ab4f5-6393-11e8-b7cc-42010a800002")
    };

    ($kind:expr, $object:expr, $uid:expr) => {{
        let kind: &str = $kind;
        ::serde_json::json!({
            "apiVersion": "admission.k8s.io/v1",
            "kind": "AdmissionReview",
            "request": {
                "uid": $uid,
                "kind": {"group": "", "version": "v1", "kind": kind},
                "resource": {"group": "", "version": "v1", "resource": format!("{}s", kind.to_lowercase())},
                "requestKind": {"group": "", "version": "v1", "kind": kind},
                "requestResource": {"group": "", "version": "v1", "resource": format!("{}s", kind.to_lowercase())},
                "namespace": "ns0",
                "operation": "CREATE",
                "userInfo": {
                    "username": "admin",
                    "uid": "014fbff9a07c",
                    "groups": ["system:authenticated", "my-admin-group"]
                },
                "object": $object
            }
        })
    }};
}

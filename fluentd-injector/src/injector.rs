use crate::config::{InjectorConfig, ServerConfig};
use crate::errors::FluentdPatchError;
use crate::patch::{FluentdPod, Patched};
use crate::policy::InjectionPolicy;
use fluentd_common::constants::UNKNOWN;
use fluentd_common::errors::FluentdServiceError;
use fluentd_common::kubernetes::{admission_request_name, admission_request_namespace};
use fluentd_common::traits::{MaybeNamed, ObjectRequest};
use fluentd_macros::{
    fluentd_debug, fluentd_error, fluentd_info, fluentd_log, fluentd_warn, logger,
    with_dollar_sign,
};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{Method, StatusCode};
use hyper::body::Bytes;
use hyper::{Body, Request, Response};
use k8s_openapi::api::core::v1::Pod;
use kube::api::DynamicObject;
use kube::core::admission::{AdmissionRequest, AdmissionResponse, AdmissionReview};
use kube::Resource;
use rustls::{Certificate, PrivateKey, ServerConfig as TlsServerConfig};
use rustls_pemfile::{certs, pkcs8_private_keys, rsa_private_keys};
use serde::Serialize;
use std::fs;
use std::path::Path;
use std::str::from_utf8;
use std::sync::Arc;

logger!("FluentdInjector");

const POD_KIND: &str = "Pod";

macro_rules! admission_request {
    ($body:ident, $typ:tt) => {{
        let admission_review: AdmissionReview<$typ> =
            serde_json::from_str(&$body).map_err(FluentdPatchError::malformed(&format!(
                "Unable to parse AdmissionReview<{}>",
                stringify!($typ)
            )))?;
        let admission_request: AdmissionRequest<$typ> =
            admission_review
                .try_into()
                .map_err(FluentdPatchError::malformed(&format!(
                    "Unable to parse AdmissionReview<{}>",
                    stringify!($typ)
                )))?;
        admission_request
    }};
}

macro_rules! response {
    (json :: $status:expr => $body:expr) => {{
        let mut response = response!($status => Body::from($body));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }};

    ($status:expr => $body:expr) => {{
        let mut response = Response::new($body);
        *response.status_mut() = $status;
        response
    }};
}

macro_rules! fail_response {
    (error => $e:ident) => {{
        error!("Admission request failed: {}", $e);
        response!($e.status_code() => Body::from($e.to_string()))
    }};
}

#[derive(Serialize)]
struct HealthStatus {
    status: &'static str,
}

pub struct FluentdInjectorContext {
    pub(crate) injector_config: InjectorConfig,
}

/// What happened to an admission request, used for logging.
#[derive(Debug, PartialEq)]
pub enum Decision {
    SkippedKind(String),
    SkippedPod,
    Injected(usize),
}

fn or_unknown(value: Option<String>, field: &str) -> String {
    value.unwrap_or_else(|| {
        warn!("Could not log request details: missing {}", field);
        UNKNOWN.to_string()
    })
}

fn log_admission_request<E: Resource>(admission_request: &AdmissionRequest<E>) {
    info!(
        "Processing {:?} request for {}/{} in namespace {}",
        admission_request.operation,
        admission_request.kind.kind,
        or_unknown(admission_request_name(admission_request), "name"),
        or_unknown(admission_request_namespace(admission_request), "namespace")
    );
}

/// Decides on a Pod admission request. Pods are always allowed, the patch
/// is only attached when the injection annotation is enabled.
pub fn patch_pod(
    admission_request: AdmissionRequest<Pod>,
    config: &InjectorConfig,
) -> Result<(AdmissionResponse, Decision), FluentdPatchError> {
    let admission_response = AdmissionResponse::from(&admission_request);
    let pod_name = admission_request
        .name()
        .unwrap_or_else(|| UNKNOWN.to_string());
    let pod = match admission_request.object() {
        Some(pod) => pod,
        None => {
            warn!("Admission request for Pod {} carries no object", pod_name);
            return Ok((admission_response, Decision::SkippedPod));
        }
    };
    let policy = InjectionPolicy::from_pod(&admission_request);
    if !policy.enabled {
        info!("Skipping Pod {}: injection not enabled", pod_name);
        return Ok((admission_response, Decision::SkippedPod));
    }
    let fluentd_pod = FluentdPod { config };
    let patch = fluentd_pod
        .patch(pod, &policy)
        .map_err(|e| e.with_service(format!("Pod {}", pod_name)))?;
    let n_patches = patch.0.len();
    let admission_response = admission_response
        .with_patch(patch)
        .map_err(FluentdPatchError::invalid_patch("Error serializing JSONPatch"))?;
    info!(
        "Injecting Fluentd sidecar into Pod {} with {} patches",
        pod_name, n_patches
    );
    Ok((admission_response, Decision::Injected(n_patches)))
}

pub fn mutate(
    body: &Bytes,
    config: &InjectorConfig,
) -> Result<(AdmissionResponse, Decision), FluentdPatchError> {
    let body = from_utf8(body)
        .map(|s| s.to_string())
        .map_err(FluentdPatchError::malformed("Unable to parse request body"))?;
    let admission_request = admission_request!(body, DynamicObject);
    log_admission_request(&admission_request);
    match admission_request.kind.kind.as_str() {
        POD_KIND => {
            let admission_request = admission_request!(body, Pod);
            patch_pod(admission_request, config)
        }
        kind => {
            info!("Skipping non-Pod resource {}: allowed without patch", kind);
            Ok((
                AdmissionResponse::from(&admission_request),
                Decision::SkippedKind(kind.to_string()),
            ))
        }
    }
}

fn review_body(response: AdmissionResponse) -> Result<String, FluentdPatchError> {
    serde_json::to_string(&response.into_review())
        .map_err(FluentdPatchError::invalid_patch("Unable to serialize AdmissionReview"))
}

pub async fn injector_handler(
    req: Request<Body>,
    fluentd_context: Arc<FluentdInjectorContext>,
) -> Result<Response<Body>, hyper::Error> {
    match (req.method(), req.uri().path()) {
        (&Method::GET, "/") => match serde_json::to_string(&HealthStatus { status: "healthy" }) {
            Ok(body) => Ok(response!(json :: StatusCode::OK => body)),
            Err(e) => Ok(response!(StatusCode::INTERNAL_SERVER_ERROR => Body::from(e.to_string()))),
        },
        (&Method::POST, "/mutate") => {
            info!("Received admission request");
            let bs = hyper::body::to_bytes(req).await?;
            let body = mutate(&bs, &fluentd_context.injector_config)
                .and_then(|(response, decision)| {
                    debug!("Admission decision: {:?}", decision);
                    review_body(response)
                });
            match body {
                Ok(body) => Ok(response!(json :: StatusCode::OK => body)),
                Err(e) => Ok(fail_response!(error => e)),
            }
        }
        _ => Ok(response!(StatusCode::NOT_FOUND => Body::empty())),
    }
}

fn read_pem(path: &Path, what: &str) -> Result<Vec<u8>, FluentdServiceError> {
    fs::read(path).map_err(|e| {
        FluentdServiceError::from_string(format!(
            "Unable to open {} file {}: {}",
            what,
            path.display(),
            e
        ))
    })
}

pub fn load_ssl(server_config: &ServerConfig) -> Result<TlsServerConfig, FluentdServiceError> {
    let cert_pem = read_pem(&server_config.cert_file, "cert")?;
    let key_pem = read_pem(&server_config.key_file, "key")?;

    let certs: Vec<Certificate> = certs(&mut cert_pem.as_slice())
        .map_err(FluentdServiceError::from_error("Unable to load certificates"))?
        .into_iter()
        .map(Certificate)
        .collect();
    if certs.is_empty() {
        return Err(FluentdServiceError::from(
            "No certificates found in cert file",
        ));
    }

    let mut keys = pkcs8_private_keys(&mut key_pem.as_slice())
        .map_err(FluentdServiceError::from_error("Unable to load keys"))?;
    if keys.is_empty() {
        keys = rsa_private_keys(&mut key_pem.as_slice())
            .map_err(FluentdServiceError::from_error("Unable to load keys"))?;
    }
    let key = keys
        .into_iter()
        .next()
        .map(PrivateKey)
        .ok_or("No private key found in key file")?;

    TlsServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, key)
        .map_err(FluentdServiceError::from_error(
            "Unable to create ServerConfig with TLS certificate",
        ))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use fluentd_common::annotations::{
        FLUENTD_INJECTOR_ANNOTATION_INJECT, FLUENTD_INJECTOR_ANNOTATION_TAG_PREFIX,
    };
    use fluentd_test_macros::{admission_review, container, pod};
    use http::{Method, StatusCode};
    use hyper::body::Bytes;
    use hyper::{Body, Request};
    use json_patch::Patch;
    use k8s_openapi::api::core::v1::Pod;
    use kube::core::admission::AdmissionResponse;
    use serde_json::{json, Value};

    use super::{injector_handler, load_ssl, mutate, Decision, FluentdInjectorContext};
    use crate::config::{InjectorConfig, ServerConfig};
    use crate::errors::FluentdPatchError;

    const UID: &str = "705ab4f5-6393-11e8-b7cc-42010a800002";

    fn mutate_value(review: Value) -> Result<(AdmissionResponse, Decision), FluentdPatchError> {
        let body = Bytes::from(serde_json::to_vec(&review).expect("Unable to serialize review"));
        mutate(&body, &InjectorConfig::default())
    }

    fn decoded_patch(response: &AdmissionResponse) -> Option<Patch> {
        response.patch.as_ref().map(|bs| {
            serde_json::from_slice::<Patch>(bs).expect("Patch in response is not a JSON Patch")
        })
    }

    fn patch_values(response: &AdmissionResponse) -> Vec<Value> {
        response
            .patch
            .as_ref()
            .map(|bs| serde_json::from_slice::<Vec<Value>>(bs).expect("Patch is not an array"))
            .unwrap_or_default()
    }

    fn sidecar_env(response: &AdmissionResponse, name: &str) -> Option<String> {
        patch_values(response)
            .iter()
            .find(|op| op["path"] == "/spec/containers/-")
            .and_then(|op| {
                op["value"]["env"]
                    .as_array()
                    .and_then(|env| env.iter().find(|e| e["name"] == name))
                    .and_then(|e| e["value"].as_str().map(|s| s.to_string()))
            })
    }

    fn injected_pod(n: u32) -> Pod {
        pod!(n, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, "true")])
    }

    async fn call(method: Method, path: &str, body: Body) -> (StatusCode, Bytes) {
        let context = Arc::new(FluentdInjectorContext {
            injector_config: InjectorConfig::default(),
        });
        let request = Request::builder()
            .method(method)
            .uri(path)
            .body(body)
            .expect("Unable to build request");
        let response = injector_handler(request, context)
            .await
            .expect("Handler failed");
        let status = response.status();
        let body = hyper::body::to_bytes(response.into_body())
            .await
            .expect("Unable to read response body");
        (status, body)
    }

    #[test]
    fn test_non_pod_kinds_are_allowed_untouched() {
        for kind in ["Deployment", "Service", "ConfigMap", "pod"] {
            let (response, decision) = mutate_value(admission_review!(
                kind,
                json!({"metadata": {"name": "x", "annotations": {"fluentd-injector/inject": "true"}}})
            ))
            .expect("Unable to mutate");
            assert!(response.allowed);
            assert!(response.patch.is_none());
            assert_eq!(response.uid, UID);
            assert_eq!(decision, Decision::SkippedKind(kind.to_string()));
        }
    }

    #[test]
    fn test_pods_without_annotation_are_not_patched() {
        let values = [None, Some("false"), Some("1"), Some("yes"), Some(" true"), Some("True ")];
        for v in values {
            let pod = match v {
                Some(v) => pod!(0, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, v)]),
                None => pod!(0),
            };
            let (response, decision) =
                mutate_value(admission_review!("Pod", pod)).expect("Unable to mutate");
            assert!(response.allowed);
            assert!(response.patch.is_none(), "{:?} should not patch", v);
            assert_eq!(decision, Decision::SkippedPod);
        }
    }

    #[test]
    fn test_pods_with_annotation_are_patched() {
        for v in ["true", "TRUE", "True"] {
            let pod = pod!(0, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, v)]);
            let (response, decision) =
                mutate_value(admission_review!("Pod", pod)).expect("Unable to mutate");
            assert!(response.allowed);
            assert!(response.patch.is_some(), "{} should patch", v);
            assert_eq!(decision, Decision::Injected(5));
        }
    }

    #[test]
    fn test_uid_is_echoed() {
        let uids = ["a", "705ab4f5-6393-11e8-b7cc-42010a800002", "ÜID with spaces", ""];
        for uid in uids {
            let (response, _) = mutate_value(admission_review!("Pod", injected_pod(0), uid))
                .expect("Unable to mutate");
            assert_eq!(response.uid, uid);
            let (response, _) = mutate_value(admission_review!("Pod", pod!(0), uid))
                .expect("Unable to mutate");
            assert_eq!(response.uid, uid);
            let (response, _) = mutate_value(admission_review!("Secret", json!({"metadata": {"name": "s0"}}), uid))
                .expect("Unable to mutate");
            assert_eq!(response.uid, uid);
        }
    }

    #[test]
    fn test_patch_is_well_formed_and_applies() {
        let pods = vec![
            injected_pod(0),
            pod!(1, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, "true")],
                    volumes => vec!["data"]),
            pod!(2, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, "true")],
                    containers => vec![
                        container!("a", mounts => vec![("data", "/data")]),
                        container!("b"),
                    ],
                    volumes => vec!["data"]),
            pod!(3, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, "true")],
                    containers => vec![]),
        ];
        for pod in pods {
            let (response, _) =
                mutate_value(admission_review!("Pod", pod)).expect("Unable to mutate");
            for op in patch_values(&response) {
                let op = op.as_object().expect("Patch operation is not an object");
                assert_eq!(op.get("op"), Some(&json!("add")));
                assert!(op.contains_key("path"));
                assert!(op.contains_key("value"));
            }
            let patch = decoded_patch(&response).expect("Missing patch");
            let mut doc = serde_json::to_value(&pod).expect("Unable to serialize Pod");
            json_patch::patch(&mut doc, &patch.0).expect("Patch does not apply");
            let containers = doc["spec"]["containers"]
                .as_array()
                .expect("containers is not an array");
            assert_eq!(
                containers.len(),
                pod.spec.as_ref().map(|s| s.containers.len()).unwrap_or(0) + 1
            );
            assert_eq!(
                containers.last().map(|c| c["name"].clone()),
                Some(json!("fluentd-sidecar"))
            );
        }
    }

    #[test]
    fn test_tag_prefix_fallback() {
        let pod = pod!(0, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, "true")],
                          labels => vec![("app", "billing")]);
        let (response, _) = mutate_value(admission_review!("Pod", pod)).expect("Unable to mutate");
        assert_eq!(sidecar_env(&response, "TAG_PREFIX"), Some("billing".to_string()));

        let (response, _) =
            mutate_value(admission_review!("Pod", injected_pod(0))).expect("Unable to mutate");
        assert_eq!(
            sidecar_env(&response, "TAG_PREFIX"),
            Some("application".to_string())
        );

        let pod = pod!(0, annotations => vec![
            (FLUENTD_INJECTOR_ANNOTATION_INJECT, "true"),
            (FLUENTD_INJECTOR_ANNOTATION_TAG_PREFIX, "ledger"),
        ], labels => vec![("app", "billing")]);
        let (response, _) = mutate_value(admission_review!("Pod", pod)).expect("Unable to mutate");
        assert_eq!(sidecar_env(&response, "TAG_PREFIX"), Some("ledger".to_string()));
    }

    #[test]
    fn test_single_container_without_volumes() {
        let (response, _) =
            mutate_value(admission_review!("Pod", injected_pod(0))).expect("Unable to mutate");
        let ops = patch_values(&response);
        assert_eq!(ops.len(), 5);
        assert_eq!(ops[0], json!({"op": "add", "path": "/spec/volumes", "value": []}));
        assert_eq!(
            ops[1],
            json!({"op": "add", "path": "/spec/volumes/-", "value": {"name": "log-volume", "emptyDir": {}}})
        );
        assert_eq!(
            ops[2],
            json!({"op": "add", "path": "/spec/containers/0/volumeMounts", "value": []})
        );
        assert_eq!(
            ops[3],
            json!({"op": "add", "path": "/spec/containers/0/volumeMounts/-",
                   "value": {"name": "log-volume", "mountPath": "/var/log"}})
        );
        assert_eq!(ops[4]["op"], "add");
        assert_eq!(ops[4]["path"], "/spec/containers/-");
        assert_eq!(ops[4]["value"]["name"], "fluentd-sidecar");
        assert_eq!(ops[4]["value"]["image"], "fluent/fluentd:v1.14");
    }

    #[test]
    fn test_single_container_with_volumes() {
        let pod = pod!(0, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, "true")],
                          volumes => vec!["data"]);
        let (response, decision) =
            mutate_value(admission_review!("Pod", pod)).expect("Unable to mutate");
        let ops = patch_values(&response);
        assert_eq!(ops.len(), 4);
        assert_eq!(decision, Decision::Injected(4));
        assert!(ops.iter().all(|op| op["path"] != "/spec/volumes"));
    }

    #[test]
    fn test_pod_with_null_containers_is_patched() {
        let object = json!({
            "metadata": {
                "name": "pod0",
                "annotations": {FLUENTD_INJECTOR_ANNOTATION_INJECT: "true"}
            },
            "spec": {"containers": null}
        });
        let (response, decision) =
            mutate_value(admission_review!("Pod", object.clone())).expect("Unable to mutate");
        assert_eq!(decision, Decision::Injected(4));
        let paths: Vec<Value> = patch_values(&response)
            .iter()
            .map(|op| op["path"].clone())
            .collect();
        assert_eq!(
            paths,
            vec![
                json!("/spec/volumes"),
                json!("/spec/volumes/-"),
                json!("/spec/containers"),
                json!("/spec/containers/-"),
            ]
        );
        let patch = decoded_patch(&response).expect("Missing patch");
        let mut doc = object;
        json_patch::patch(&mut doc, &patch.0).expect("Patch does not apply");
        assert_eq!(doc["spec"]["containers"][0]["name"], json!("fluentd-sidecar"));
    }

    #[test]
    fn test_pod_without_name_or_namespace_is_patched() {
        let mut pod = pod!(0, annotations => vec![(FLUENTD_INJECTOR_ANNOTATION_INJECT, "true")],
                              name => None);
        pod.metadata.namespace = None;
        let mut review = admission_review!("Pod", pod);
        if let Some(request) = review["request"].as_object_mut() {
            request.remove("namespace");
        }
        let (response, decision) = mutate_value(review).expect("Unable to mutate");
        assert!(response.patch.is_some());
        assert_eq!(decision, Decision::Injected(5));
    }

    #[test]
    fn test_pod_request_without_object_is_allowed() {
        let mut review = admission_review!("Pod", injected_pod(0));
        if let Some(request) = review["request"].as_object_mut() {
            request.remove("object");
        }
        let (response, decision) = mutate_value(review).expect("Unable to mutate");
        assert!(response.allowed);
        assert!(response.patch.is_none());
        assert_eq!(decision, Decision::SkippedPod);
    }

    #[test]
    fn test_malformed_requests() {
        let mut missing_uid = admission_review!("Pod", injected_pod(0));
        if let Some(request) = missing_uid["request"].as_object_mut() {
            request.remove("uid");
        }
        let mut missing_kind = admission_review!("Pod", injected_pod(0));
        if let Some(kind) = missing_kind["request"]["kind"].as_object_mut() {
            kind.remove("kind");
        }
        let mut wrong_uid = admission_review!("Pod", injected_pod(0));
        wrong_uid["request"]["uid"] = json!(42);
        let missing_request = json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview"});
        for review in [missing_uid, missing_kind, wrong_uid, missing_request] {
            match mutate_value(review) {
                Err(FluentdPatchError::MalformedRequest(_)) => (),
                Err(e) => panic!("Expected malformed request, got {}", e),
                Ok((response, _)) => panic!("Expected malformed request, got {:?}", response),
            }
        }
        let not_utf8 = Bytes::from_static(&[0xff, 0xfe, 0xfd]);
        assert!(matches!(
            mutate(&not_utf8, &InjectorConfig::default()),
            Err(FluentdPatchError::MalformedRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_handler_health() {
        let (status, body) = call(Method::GET, "/", Body::empty()).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).expect("Health body is not JSON");
        assert_eq!(body, json!({"status": "healthy"}));
    }

    #[tokio::test]
    async fn test_handler_mutate_with_patch() {
        let review = admission_review!("Pod", injected_pod(0));
        let (status, body) = call(Method::POST, "/mutate", Body::from(review.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).expect("Response is not JSON");
        assert_eq!(body["apiVersion"], "admission.k8s.io/v1");
        assert_eq!(body["kind"], "AdmissionReview");
        assert_eq!(body["response"]["uid"], UID);
        assert_eq!(body["response"]["allowed"], true);
        assert_eq!(body["response"]["patchType"], "JSONPatch");
        assert!(body["response"].get("patch").is_some());
    }

    #[tokio::test]
    async fn test_handler_mutate_without_annotation() {
        let review = admission_review!("Pod", pod!(0));
        let (status, body) = call(Method::POST, "/mutate", Body::from(review.to_string())).await;
        assert_eq!(status, StatusCode::OK);
        let body: Value = serde_json::from_slice(&body).expect("Response is not JSON");
        assert_eq!(body["response"]["uid"], UID);
        assert_eq!(body["response"]["allowed"], true);
        assert!(body["response"].get("patch").is_none());
        assert!(body["response"].get("patchType").is_none());
    }

    #[tokio::test]
    async fn test_handler_mutate_malformed() {
        let (status, _) = call(Method::POST, "/mutate", Body::from("{not json")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let (status, _) = call(
            Method::POST,
            "/mutate",
            Body::from(json!({"apiVersion": "admission.k8s.io/v1", "kind": "AdmissionReview", "request": {}}).to_string()),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_handler_unknown_routes() {
        let (status, body) = call(Method::GET, "/mutate", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.is_empty());
        let (status, _) = call(Method::POST, "/validate", Body::empty()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_load_ssl_missing_files() {
        let server_config = ServerConfig {
            port: 8443,
            cert_file: PathBuf::from("/nonexistent/fluentd-injector.crt"),
            key_file: PathBuf::from("/nonexistent/fluentd-injector.key"),
            log_config_file: PathBuf::from("/nonexistent/log4rs.yaml"),
        };
        let error = load_ssl(&server_config).unwrap_err();
        assert!(error.error.starts_with("Unable to open cert file"));
    }
}

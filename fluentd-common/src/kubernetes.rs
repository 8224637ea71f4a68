use std::collections::BTreeMap;

use k8s_openapi::api::core::v1::{Container, Pod, Volume};
use kube::core::admission::AdmissionRequest;
use kube::Resource;

use crate::traits::{Annotated, Labeled, MaybeNamed, ObjectRequest};

pub fn containers(pod: &Pod) -> Option<&Vec<Container>> {
    pod.spec.as_ref().map(|s| &s.containers)
}

pub fn volumes(pod: &Pod) -> Option<&Vec<Volume>> {
    pod.spec.as_ref().and_then(|s| s.volumes.as_ref())
}

// Implement required traits for Pod

impl Annotated for Pod {
    fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.annotations.as_ref()
    }
}

impl Labeled for Pod {
    fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.metadata.labels.as_ref()
    }
}

// Implement required traits for AdmissionRequest<Pod>

impl ObjectRequest<Pod> for AdmissionRequest<Pod> {
    fn object(&self) -> Option<&Pod> {
        self.object.as_ref()
    }
}

impl Annotated for AdmissionRequest<Pod> {
    fn annotations(&self) -> Option<&BTreeMap<String, String>> {
        self.object.as_ref().and_then(Annotated::annotations)
    }
}

impl Labeled for AdmissionRequest<Pod> {
    fn labels(&self) -> Option<&BTreeMap<String, String>> {
        self.object.as_ref().and_then(Labeled::labels)
    }
}

/// Name of the object under review, falling back to the name Kubernetes put
/// in the request envelope. Pods created through `generateName` have neither.
pub fn admission_request_name<E: Resource>(
    admission_request: &AdmissionRequest<E>,
) -> Option<String> {
    admission_request
        .object
        .as_ref()
        .and_then(|o| o.meta().name.clone())
        .or_else(|| Some(admission_request.name.clone()).filter(|n| !n.is_empty()))
}

pub fn admission_request_namespace<E: Resource>(
    admission_request: &AdmissionRequest<E>,
) -> Option<String> {
    admission_request
        .object
        .as_ref()
        .and_then(|o| o.meta().namespace.clone())
        .or_else(|| admission_request.namespace.clone())
}

impl MaybeNamed for AdmissionRequest<Pod> {
    fn name(&self) -> Option<String> {
        admission_request_name(self)
    }
}

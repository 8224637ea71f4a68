use std::collections::BTreeMap;

use kube::Resource;

pub trait MaybeNamed {
    fn name(&self) -> Option<String>;
}

pub trait Annotated {
    fn annotations(&self) -> Option<&BTreeMap<String, String>>;

    fn annotation(&self, annotation: &str) -> Option<&String> {
        self.annotations().and_then(|m| m.get(annotation))
    }
}

pub trait Labeled {
    fn labels(&self) -> Option<&BTreeMap<String, String>>;

    fn label(&self, label: &str) -> Option<&String> {
        self.labels().and_then(|m| m.get(label))
    }
}

pub trait ObjectRequest<O: Resource> {
    fn object(&self) -> Option<&O>;
}

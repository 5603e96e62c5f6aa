use filter_policy_controller_k8s_api::ResourceExt;
use std::fmt;

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct ResourceId {
    pub namespace: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(namespace: String, name: String) -> Self {
        Self { namespace, name }
    }

    /// Identity of a namespaced resource.
    pub fn of<T: ResourceExt>(resource: &T) -> Self {
        let namespace = resource.namespace().expect("resource must be namespaced");
        Self::new(namespace, resource.name_unchecked())
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

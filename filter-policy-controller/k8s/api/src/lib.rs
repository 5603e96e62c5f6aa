#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

pub mod istio;
pub mod policy;
mod validation;

pub use self::validation::{
    validate_gateway, validate_http_filter_policy, validate_virtual_service, ValidationError,
};
pub use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
pub use kube::api::{Api, ObjectMeta, Patch, PatchParams, ResourceExt};
pub use kube::{Client, Resource};

/// Label set on every generated EnvoyFilter so the controller can tell its
/// own output apart from user-authored configuration of the same kind.
pub const LABEL_CREATED_BY: &str = "meshfilter.io/created-by";

/// Value of [`LABEL_CREATED_BY`] on objects owned by this controller.
pub const CREATED_BY: &str = "HTTPFilterPolicy";

//! Endpoint paths and well-known names.

use crate::Error;
use std::fmt;
use std::str::FromStr;

/// Default origin of the open platform.
pub const BASE_URL: &str = "https://open.fxiaoke.com";

/// Mints a corporate access token. Unauthenticated.
pub const TOKEN_ENDPOINT: &str = "/cgi/corpAccessToken/get/V2";
/// Returns schema metadata for an object type.
pub const DESCRIBE_ENDPOINT: &str = "/cgi/crm/v2/object/describe";
/// Lists the users of a department.
pub const USER_LIST_ENDPOINT: &str = "/cgi/user/list";
/// Fetches a single user by open user id.
pub const USER_GET_ENDPOINT: &str = "/cgi/user/get";

/// API names of fields every object carries.
pub mod field {
    pub const NAME: &str = "name";
    pub const OWNER: &str = "owner";
    pub const CREATE_TIME: &str = "create_time";
    pub const CREATED_BY: &str = "created_by";
    pub const LAST_MODIFIED_TIME: &str = "last_modified_time";
    pub const LAST_MODIFIED_BY: &str = "last_modified_by";
    /// Business type.
    pub const RECORD_TYPE: &str = "record_type";
    /// Lifecycle status.
    pub const LIFE_STATUS: &str = "life_status";
    /// Primary key of a record.
    pub const ID: &str = "_id";
    /// Object type a record belongs to.
    pub const DATA_OBJECT_API_NAME: &str = "dataObjectApiName";
}

/// Names of optional request parameters.
pub mod param {
    /// Whether the call triggers workflows.
    pub const TRIGGER_WORK_FLOW: &str = "triggerWorkFlow";
    /// Whether the call triggers approval flows.
    pub const TRIGGER_APPROVAL_FLOW: &str = "triggerApprovalFlow";
}

/// Which family of objects a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Objects predefined by the platform.
    Package,
    /// Objects defined by the tenant.
    Custom,
}

impl Namespace {
    /// Returns the wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Package => "package",
            Namespace::Custom => "custom",
        }
    }

    /// Returns the path prefix shared by every action in this namespace.
    pub fn prefix(&self) -> &'static str {
        match self {
            Namespace::Package => "/cgi/crm/v2/data/",
            Namespace::Custom => "/cgi/crm/custom/v2/data/",
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "package" => Ok(Namespace::Package),
            "custom" => Ok(Namespace::Custom),
            other => Err(Error::validation(
                "namespace",
                format!("unknown object namespace {:?}", other),
            )),
        }
    }
}

/// An operation on object data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Query,
    Get,
    Create,
    Update,
    Delete,
    Invalid,
    ChangeOwner,
}

impl Action {
    /// Returns the path segment naming this action.
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Query => "query",
            Action::Get => "get",
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::Invalid => "invalid",
            Action::ChangeOwner => "changeOwner",
        }
    }
}

/// Resolves the endpoint path for an action within a namespace.
///
/// # Examples
///
/// ```
/// use fxiaoke::endpoint::{endpoint, Action, Namespace};
///
/// assert_eq!(endpoint(Namespace::Package, Action::Query), "/cgi/crm/v2/data/query");
/// assert_eq!(
///     endpoint(Namespace::Custom, Action::ChangeOwner),
///     "/cgi/crm/custom/v2/data/changeOwner"
/// );
/// ```
pub fn endpoint(namespace: Namespace, action: Action) -> &'static str {
    use Action::*;
    use Namespace::*;

    match (namespace, action) {
        (Package, Query) => "/cgi/crm/v2/data/query",
        (Package, Get) => "/cgi/crm/v2/data/get",
        (Package, Create) => "/cgi/crm/v2/data/create",
        (Package, Update) => "/cgi/crm/v2/data/update",
        (Package, Delete) => "/cgi/crm/v2/data/delete",
        (Package, Invalid) => "/cgi/crm/v2/data/invalid",
        (Package, ChangeOwner) => "/cgi/crm/v2/data/changeOwner",
        (Custom, Query) => "/cgi/crm/custom/v2/data/query",
        (Custom, Get) => "/cgi/crm/custom/v2/data/get",
        (Custom, Create) => "/cgi/crm/custom/v2/data/create",
        (Custom, Update) => "/cgi/crm/custom/v2/data/update",
        (Custom, Delete) => "/cgi/crm/custom/v2/data/delete",
        (Custom, Invalid) => "/cgi/crm/custom/v2/data/invalid",
        (Custom, ChangeOwner) => "/cgi/crm/custom/v2/data/changeOwner",
    }
}

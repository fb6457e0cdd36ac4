//! Typed wrappers for the introspection entrypoints every server provides.

use serde_json::Value;
use std::fmt;
use std::time::Duration;

use crate::client::Client;
use crate::err::RpcResult;

pub const GET_VERSION_METHOD: &str = "get-version";
pub const REGISTRY_METHOD: &str = "registry";
pub const SCHEMA_METHOD: &str = "schema";

#[derive(Clone, Deserialize, Serialize, PartialEq, Eq, Debug)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if let Some(revision) = &self.revision {
            write!(f, " ({})", revision)?;
        }
        Ok(())
    }
}

/// Description of one method the server accepts.
#[derive(Clone, Deserialize, Serialize, PartialEq, Debug)]
pub struct Entrypoint {
    #[serde(alias = "title")]
    pub method: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub plugin: String,
    #[serde(rename = "async", default)]
    pub is_async: bool,
    #[serde(default)]
    pub deprecated: bool,
    /// JSON schema of the params.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    /// JSON schema of the result.
    #[serde(alias = "returns", default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
}

#[derive(Serialize)]
struct SchemaParams<'a> {
    endpoint: &'a str,
}

impl Client {
    /// The version of the server.
    pub fn get_version(&self, timeout: Option<Duration>) -> RpcResult<Version> {
        self.request_as(GET_VERSION_METHOD, &Value::Null, timeout)
    }

    /// The names of all methods the server accepts.
    pub fn get_methods(&self, timeout: Option<Duration>) -> RpcResult<Vec<String>> {
        self.request_as(REGISTRY_METHOD, &Value::Null, timeout)
    }

    /// The description of `method`.
    pub fn get_entrypoint(&self, method: &str, timeout: Option<Duration>) -> RpcResult<Entrypoint> {
        self.request_as(SCHEMA_METHOD, &SchemaParams { endpoint: method }, timeout)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entrypoint_from_schema() {
        let schema = json!({
            "title": "get-camera",
            "description": "Get the camera",
            "plugin": "Core",
            "async": false,
            "returns": {"type": "object"},
        });
        let entrypoint: Entrypoint = serde_json::from_value(schema).unwrap();
        assert_eq!("get-camera", entrypoint.method);
        assert_eq!("Core", entrypoint.plugin);
        assert!(!entrypoint.is_async);
        assert!(!entrypoint.deprecated);
        assert_eq!(None, entrypoint.params);
        assert_eq!(Some(json!({"type": "object"})), entrypoint.result);
    }

    #[test]
    fn test_version_display() {
        let version: Version =
            serde_json::from_value(json!({"major": 3, "minor": 1, "patch": 0})).unwrap();
        assert_eq!("3.1.0", version.to_string());
    }
}

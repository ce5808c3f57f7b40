// src/template/model.rs

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::ResourceName;

/// One deployable unit of a template.
///
/// ```json
/// { "name": "web", "type": "drm/site", "properties": {}, "dependsOn": ["db"] }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub name: ResourceName,

    #[serde(rename = "type")]
    pub resource_type: String,

    #[serde(default)]
    pub properties: Map<String, Value>,

    /// Names of resources that must be deployed before this one.
    #[serde(default)]
    pub depends_on: Vec<ResourceName>,
}

impl Resource {
    pub fn new(name: impl Into<String>, resource_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            resource_type: resource_type.into(),
            properties: Map::new(),
            depends_on: Vec::new(),
        }
    }
}

/// A parameter as supplied by the parameter document.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    /// Literal value (`{ "value": ... }`).
    Value(Value),
    /// Secret reference (`{ "reference": ... }`), resolved remotely with the
    /// caller's access token.
    Reference(Value),
}

impl ParameterValue {
    /// Interpret one entry of a parameter document's `parameters` object.
    pub fn from_document_entry(entry: &Value) -> Option<Self> {
        let obj = entry.as_object()?;
        if let Some(reference) = obj.get("reference") {
            return Some(ParameterValue::Reference(reference.clone()));
        }
        obj.get("value").map(|v| ParameterValue::Value(v.clone()))
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ParameterValue::Reference(_))
    }

    /// JSON substituted for a `[parameters('name')]` expression.
    pub fn to_json(&self) -> Value {
        match self {
            ParameterValue::Value(v) => v.clone(),
            ParameterValue::Reference(r) => {
                let mut obj = Map::new();
                obj.insert("reference".to_string(), r.clone());
                Value::Object(obj)
            }
        }
    }
}

/// A built template: the resources to deploy, in template order, plus the
/// effective parameter set. Read-only for the lifetime of a job.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    pub resources: Vec<Resource>,
    pub parameters: BTreeMap<String, ParameterValue>,
}

impl Template {
    pub fn new(resources: Vec<Resource>) -> Self {
        Self {
            resources,
            parameters: BTreeMap::new(),
        }
    }

    pub fn resource(&self, name: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Wire form of the request body passed to `start_job`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployRequest {
    pub template: Value,

    #[serde(default)]
    pub parameters: Value,

    #[serde(
        rename = "azureProfile",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub azure_profile: Option<AzureProfile>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AzureProfile {
    pub key_vault_access_token: String,
}

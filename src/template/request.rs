// src/template/request.rs

//! Assembly of the request body handed to `start_job`: template document,
//! parameter document, command-line parameter overrides and, when secrets are
//! referenced, the caller's access token.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::errors::{DeployError, Result, ValidationError};
use crate::template::model::{AzureProfile, DeployRequest};

/// `$schema` of a parameter document generated from overrides alone.
pub const PARAMETERS_SCHEMA_URL: &str =
    "https://schemas.drmtemplates.io/2021-03-01/deploymentParameters.json#";

/// `contentVersion` of a parameter document generated from overrides alone.
pub const PARAMETERS_CONTENT_VERSION: &str = "1.0.0.0";

/// Read a JSON document that must be an object (template or parameter file).
pub fn load_json_document(path: impl AsRef<Path>) -> Result<Value> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)
        .with_context(|| format!("reading JSON document {}", path.display()))?;

    let value: Value = serde_json::from_str(&contents)?;
    if !value.is_object() {
        return Err(DeployError::Validation(ValidationError::with_code(
            "InvalidDocument",
            format!("{} must contain a JSON object", path.display()),
        )));
    }

    Ok(value)
}

/// Merge `NAME=VALUE` overrides into an optional parameter document.
///
/// - No document (or an empty one) and no overrides: an empty object.
/// - No document but overrides: a new document with the default `$schema`
///   and `contentVersion`.
/// - A document and overrides: each override replaces or adds
///   `parameters.<NAME> = { "value": VALUE }`.
pub fn merge_parameter_overrides(
    document: Option<Value>,
    overrides: &[(String, Value)],
) -> Result<Value> {
    let mut document = document.unwrap_or_else(|| Value::Object(Map::new()));

    let is_empty = document.as_object().is_none_or(|obj| obj.is_empty());
    if is_empty {
        if overrides.is_empty() {
            return Ok(Value::Object(Map::new()));
        }

        debug!(
            schema = PARAMETERS_SCHEMA_URL,
            content_version = PARAMETERS_CONTENT_VERSION,
            "no parameter file present; generating parameter document from overrides"
        );

        let mut parameters = Map::new();
        for (name, value) in overrides {
            parameters.insert(name.clone(), json!({ "value": value }));
        }

        return Ok(json!({
            "$schema": PARAMETERS_SCHEMA_URL,
            "contentVersion": PARAMETERS_CONTENT_VERSION,
            "parameters": Value::Object(parameters),
        }));
    }

    if overrides.is_empty() {
        return Ok(document);
    }

    let root = document.as_object_mut().ok_or_else(|| {
        DeployError::Validation(ValidationError::with_code(
            "InvalidDocument",
            "parameter document must be a JSON object",
        ))
    })?;

    let parameters = root
        .entry("parameters")
        .or_insert_with(|| Value::Object(Map::new()));
    let parameters = parameters.as_object_mut().ok_or_else(|| {
        DeployError::Validation(ValidationError::with_code(
            "InvalidDocument",
            "'parameters' in the parameter document must be a JSON object",
        ))
    })?;

    for (name, value) in overrides {
        let replaced = parameters
            .insert(name.clone(), json!({ "value": value }))
            .is_some();
        debug!(parameter = %name, replaced, "applied parameter override");
    }

    Ok(document)
}

/// Whether any parameter in the document is a secret `reference`, which
/// means the request needs an access token.
pub fn requires_credential(parameters: &Value) -> bool {
    parameters
        .get("parameters")
        .and_then(Value::as_object)
        .is_some_and(|params| {
            params
                .values()
                .any(|p| p.as_object().is_some_and(|obj| obj.contains_key("reference")))
        })
}

/// Serialize the request body for `start_job`.
pub fn build_request_body(
    template: Value,
    parameters: Value,
    access_token: Option<&str>,
) -> Result<String> {
    let request = DeployRequest {
        template,
        parameters,
        azure_profile: access_token.map(|token| AzureProfile {
            key_vault_access_token: token.to_string(),
        }),
    };

    Ok(serde_json::to_string(&request)?)
}

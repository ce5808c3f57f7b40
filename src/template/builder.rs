// src/template/builder.rs

//! Template build/compile stage.
//!
//! The orchestrator only knows the [`TemplateBuilder`] trait. The default
//! [`CompiledTemplateBuilder`] understands the request body produced by
//! [`crate::template::request::build_request_body`]: it reads the resources,
//! resolves whole-string `[parameters('name')]` expressions in their
//! properties, and rejects structurally invalid templates before any remote
//! call is made.

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::errors::ValidationError;
use crate::template::model::{DeployRequest, ParameterValue, Resource, Template};
use crate::types::BoxFuture;

static PARAMETER_EXPR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[parameters\('([^']+)'\)\]$").expect("parameter expression regex is valid")
});

/// Contract of the template build/compile collaborator.
pub trait TemplateBuilder: Send + Sync {
    /// Turn a raw request body into a deployable [`Template`], or explain
    /// why it cannot be deployed.
    fn build<'a>(
        &'a self,
        request_body: &'a str,
    ) -> BoxFuture<'a, std::result::Result<Template, ValidationError>>;
}

/// Default builder for JSON request bodies.
#[derive(Debug, Clone, Default)]
pub struct CompiledTemplateBuilder;

impl CompiledTemplateBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of [`TemplateBuilder::build`].
    pub fn compile(&self, request_body: &str) -> std::result::Result<Template, ValidationError> {
        let request: DeployRequest = serde_json::from_str(request_body).map_err(|e| {
            ValidationError::with_code(
                "InvalidRequest",
                format!("request body is not a valid deployment request: {e}"),
            )
        })?;

        let template = request.template.as_object().ok_or_else(|| {
            ValidationError::with_code("InvalidTemplate", "template must be a JSON object")
        })?;

        let raw_resources = match template.get("resources") {
            Some(Value::Array(items)) => items.as_slice(),
            Some(_) => {
                return Err(ValidationError::with_code(
                    "InvalidTemplate",
                    "template 'resources' must be an array",
                ));
            }
            None => {
                return Err(ValidationError::with_code(
                    "InvalidTemplate",
                    "template has no 'resources' array",
                ));
            }
        };

        let mut resources = raw_resources
            .iter()
            .enumerate()
            .map(|(idx, raw)| {
                serde_json::from_value::<Resource>(raw.clone()).map_err(|e| {
                    ValidationError::with_code("InvalidResource", format!("resource #{idx}: {e}"))
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let parameters = collect_parameters(template.get("parameters"), &request.parameters);

        let has_token = request
            .azure_profile
            .as_ref()
            .is_some_and(|p| !p.key_vault_access_token.trim().is_empty());
        if !has_token {
            if let Some((name, _)) = parameters.iter().find(|(_, p)| p.is_reference()) {
                return Err(ValidationError::with_code(
                    "MissingCredential",
                    format!(
                        "parameter '{name}' references a secret but no access token was supplied"
                    ),
                ));
            }
        }

        validate_resources(&resources)?;

        for resource in resources.iter_mut() {
            for value in resource.properties.values_mut() {
                substitute_parameters(&resource.name, value, &parameters)?;
            }
        }

        debug!(
            resources = resources.len(),
            parameters = parameters.len(),
            "template compiled"
        );

        Ok(Template {
            resources,
            parameters,
        })
    }
}

impl TemplateBuilder for CompiledTemplateBuilder {
    fn build<'a>(
        &'a self,
        request_body: &'a str,
    ) -> BoxFuture<'a, std::result::Result<Template, ValidationError>> {
        Box::pin(async move { self.compile(request_body) })
    }
}

/// Effective parameter set: template-declared `defaultValue`s overridden by
/// the parameter document.
fn collect_parameters(
    declared: Option<&Value>,
    document: &Value,
) -> BTreeMap<String, ParameterValue> {
    let mut parameters = BTreeMap::new();

    if let Some(declared) = declared.and_then(Value::as_object) {
        for (name, decl) in declared {
            if let Some(default) = decl.get("defaultValue") {
                parameters.insert(name.clone(), ParameterValue::Value(default.clone()));
            }
        }
    }

    if let Some(supplied) = document.get("parameters").and_then(Value::as_object) {
        for (name, entry) in supplied {
            match ParameterValue::from_document_entry(entry) {
                Some(value) => {
                    parameters.insert(name.clone(), value);
                }
                None => debug!(parameter = %name, "parameter entry has neither value nor reference; ignoring"),
            }
        }
    }

    parameters
}

fn validate_resources(resources: &[Resource]) -> std::result::Result<(), ValidationError> {
    let mut names: HashSet<&str> = HashSet::new();

    for resource in resources {
        if resource.name.trim().is_empty() {
            return Err(ValidationError::with_code(
                "InvalidResource",
                format!("a resource of type '{}' has an empty name", resource.resource_type),
            ));
        }
        if !names.insert(resource.name.as_str()) {
            return Err(ValidationError::with_code(
                "DuplicateResource",
                format!("resource name '{}' is used more than once", resource.name),
            ));
        }
    }

    for resource in resources {
        for dep in &resource.depends_on {
            if dep == &resource.name {
                return Err(ValidationError::with_code(
                    "SelfDependency",
                    format!("resource '{}' cannot depend on itself", resource.name),
                ));
            }
            if !names.contains(dep.as_str()) {
                return Err(ValidationError::with_code(
                    "UnknownDependency",
                    format!(
                        "resource '{}' has unknown dependency '{}' in dependsOn",
                        resource.name, dep
                    ),
                ));
            }
        }
    }

    Ok(())
}

/// Replace whole-string `[parameters('name')]` expressions, recursively.
fn substitute_parameters(
    resource: &str,
    value: &mut Value,
    parameters: &BTreeMap<String, ParameterValue>,
) -> std::result::Result<(), ValidationError> {
    match value {
        Value::String(s) => {
            if let Some(caps) = PARAMETER_EXPR.captures(s) {
                let name = &caps[1];
                let param = parameters.get(name).ok_or_else(|| {
                    ValidationError::with_code(
                        "UnresolvedParameter",
                        format!("resource '{resource}' references undefined parameter '{name}'"),
                    )
                })?;
                *value = param.to_json();
            }
        }
        Value::Array(items) => {
            for item in items.iter_mut() {
                substitute_parameters(resource, item, parameters)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                substitute_parameters(resource, item, parameters)?;
            }
        }
        _ => {}
    }
    Ok(())
}

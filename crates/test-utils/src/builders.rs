#![allow(dead_code)]

use drmdeploy::config::{ConfigFile, RawConfigFile};
use drmdeploy::template::Resource;
use drmdeploy::template::request::build_request_body;
use serde_json::{Map, Value, json};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_batch_size(mut self, n: usize) -> Self {
        self.config.deploy.batch_size = n;
        self
    }

    pub fn with_poll_interval_ms(mut self, ms: u64) -> Self {
        self.config.deploy.poll_interval_ms = ms;
        self
    }

    pub fn with_base_url(mut self, url: &str) -> Self {
        self.config.api.base_url = url.to_string();
        self
    }

    pub fn with_token_command(mut self, cmd: &str) -> Self {
        self.config.credentials.token_command = Some(cmd.to_string());
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for one template resource.
#[derive(Clone)]
pub struct ResourceBuilder {
    resource: Resource,
}

impl ResourceBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            resource: Resource::new(name, "drm/test"),
        }
    }

    pub fn of_type(mut self, resource_type: &str) -> Self {
        self.resource.resource_type = resource_type.to_string();
        self
    }

    pub fn depends_on(mut self, deps: &[&str]) -> Self {
        self.resource
            .depends_on
            .extend(deps.iter().map(|d| d.to_string()));
        self
    }

    pub fn property(mut self, key: &str, value: Value) -> Self {
        self.resource.properties.insert(key.to_string(), value);
        self
    }

    pub fn build(self) -> Resource {
        self.resource
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(&self.resource).expect("resource serializes")
    }
}

/// Shorthand for a list of resources given as `(name, dependsOn)`.
pub fn resources(entries: &[(&str, &[&str])]) -> Vec<Resource> {
    entries.iter()
        .map(|(name, deps)| ResourceBuilder::new(name).depends_on(deps).build())
        .collect()
}

/// Builder for a complete `start_job` request body.
#[derive(Default)]
pub struct RequestBodyBuilder {
    resources: Vec<Value>,
    declared: Map<String, Value>,
    parameters: Map<String, Value>,
    access_token: Option<String>,
}

impl RequestBodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resource(mut self, resource: ResourceBuilder) -> Self {
        self.resources.push(resource.to_json());
        self
    }

    /// Resource given as raw JSON, for malformed-input tests.
    pub fn raw_resource(mut self, resource: Value) -> Self {
        self.resources.push(resource);
        self
    }

    /// Template-declared parameter with a default value.
    pub fn declared_parameter(mut self, name: &str, default: Value) -> Self {
        self.declared
            .insert(name.to_string(), json!({ "type": "string", "defaultValue": default }));
        self
    }

    pub fn parameter(mut self, name: &str, value: Value) -> Self {
        self.parameters
            .insert(name.to_string(), json!({ "value": value }));
        self
    }

    /// Secret reference parameter; needs an access token.
    pub fn reference_parameter(mut self, name: &str, secret: &str) -> Self {
        self.parameters.insert(
            name.to_string(),
            json!({ "reference": { "keyVault": { "id": "vault-1" }, "secretName": secret } }),
        );
        self
    }

    pub fn access_token(mut self, token: &str) -> Self {
        self.access_token = Some(token.to_string());
        self
    }

    pub fn template_json(&self) -> Value {
        json!({
            "parameters": Value::Object(self.declared.clone()),
            "resources": self.resources.clone(),
        })
    }

    pub fn parameters_json(&self) -> Value {
        json!({ "parameters": Value::Object(self.parameters.clone()) })
    }

    pub fn build(self) -> String {
        build_request_body(
            self.template_json(),
            self.parameters_json(),
            self.access_token.as_deref(),
        )
        .expect("request body serializes")
    }
}

use std::sync::Mutex;

use drmdeploy::errors::{DeployError, Result};
use drmdeploy::generate::{TemplateEnvelope, TemplateSource};
use drmdeploy::types::BoxFuture;
use serde_json::{Value, json};

/// A fake template source that answers every filter with one scripted
/// envelope (or a transport error) and records the filters it was asked for.
pub struct FakeTemplateSource {
    answer: std::result::Result<TemplateEnvelope, String>,
    filters: Mutex<Vec<String>>,
}

impl FakeTemplateSource {
    pub fn responding(status_code: u16, body: Value) -> Self {
        Self {
            answer: Ok(TemplateEnvelope { status_code, body }),
            filters: Mutex::new(Vec::new()),
        }
    }

    /// 200 envelope carrying `template` serialized as a string, the way the
    /// service sends it.
    pub fn with_template(template: Value) -> Self {
        Self::responding(
            200,
            json!({
                "data": { "template": template.to_string() },
                "message": "Template generated",
                "statusCode": "OK"
            }),
        )
    }

    pub fn unreachable(detail: &str) -> Self {
        Self {
            answer: Err(detail.to_string()),
            filters: Mutex::new(Vec::new()),
        }
    }

    pub fn filters(&self) -> Vec<String> {
        self.filters.lock().unwrap().clone()
    }
}

impl TemplateSource for FakeTemplateSource {
    fn generate<'a>(&'a self, filter: &'a str) -> BoxFuture<'a, Result<TemplateEnvelope>> {
        Box::pin(async move {
            self.filters.lock().unwrap().push(filter.to_string());
            self.answer
                .clone()
                .map_err(DeployError::TemplateGeneration)
        })
    }
}

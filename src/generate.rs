// src/generate.rs

//! Template generation.
//!
//! The service builds a template for every record matching a filter and
//! answers with a response envelope whose `data.template` carries it. The
//! template is lifted out of the envelope (which keeps an empty `"{}"` in
//! its place) so the two can be shown and stored separately.

use std::fs;
use std::path::Path;

use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ApiSection;
use crate::errors::{DeployError, Result};
use crate::exec::http::build_client;
use crate::types::BoxFuture;

/// Raw answer of the generation endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateEnvelope {
    pub status_code: u16,
    pub body: Value,
}

/// Anything that can produce a template envelope for a filter.
pub trait TemplateSource: Send + Sync {
    fn generate<'a>(&'a self, filter: &'a str) -> BoxFuture<'a, Result<TemplateEnvelope>>;
}

/// [`TemplateSource`] backed by `GET {base_url}/templates/generate?filter=..`.
#[derive(Debug, Clone)]
pub struct HttpTemplateSource {
    client: Client,
    base_url: String,
}

impl HttpTemplateSource {
    pub fn new(config: &ApiSection) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn generate_url(&self) -> String {
        format!("{}/templates/generate", self.base_url)
    }

    async fn generate_inner(&self, filter: &str) -> Result<TemplateEnvelope> {
        let url = self.generate_url();
        debug!(%url, filter, "requesting template");

        let response = self
            .client
            .get(&url)
            .query(&[("filter", filter)])
            .send()
            .await?;
        let status_code = response.status().as_u16();
        let text = response.text().await?;

        // Error pages are not always JSON; keep them readable in the envelope.
        let body = serde_json::from_str(&text).unwrap_or_else(|_| {
            serde_json::json!({ "statusCode": status_code, "message": text.trim() })
        });

        Ok(TemplateEnvelope { status_code, body })
    }
}

impl TemplateSource for HttpTemplateSource {
    fn generate<'a>(&'a self, filter: &'a str) -> BoxFuture<'a, Result<TemplateEnvelope>> {
        Box::pin(self.generate_inner(filter))
    }
}

/// Envelope with the template taken out, plus the template itself.
///
/// `template` is only present when the service answered 200.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedTemplate {
    pub status_code: u16,
    pub envelope: Value,
    pub template: Option<Value>,
}

/// Ask `source` for a template matching `filter` and split it from its
/// envelope.
pub async fn generate_template(
    source: &dyn TemplateSource,
    filter: &str,
) -> Result<GeneratedTemplate> {
    let TemplateEnvelope {
        status_code,
        mut body,
    } = source.generate(filter).await?;

    if status_code != 200 {
        info!(status_code, "template generation was not successful");
        return Ok(GeneratedTemplate {
            status_code,
            envelope: body,
            template: None,
        });
    }

    let slot = body
        .get_mut("data")
        .and_then(|data| data.get_mut("template"))
        .ok_or_else(|| {
            DeployError::TemplateGeneration("response carries no data.template".to_string())
        })?;

    let template = match slot.take() {
        Value::String(raw) => serde_json::from_str(&raw).map_err(|e| {
            DeployError::TemplateGeneration(format!("unreadable template in response: {e}"))
        })?,
        Value::Null => {
            return Err(DeployError::TemplateGeneration(
                "response carries no data.template".to_string(),
            ));
        }
        inline => inline,
    };
    *slot = Value::String("{}".to_string());

    Ok(GeneratedTemplate {
        status_code,
        envelope: body,
        template: Some(template),
    })
}

/// Write `template` to `path` as indented JSON.
pub fn write_template(path: impl AsRef<Path>, template: &Value) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(template)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "template written");
    Ok(())
}

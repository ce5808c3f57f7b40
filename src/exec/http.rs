// src/exec/http.rs

//! HTTP client for the resource API.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::ApiSection;
use crate::errors::Result;
use crate::exec::backend::{DeployContext, ResourceApi, ResourceOutcome};
use crate::template::Resource;
use crate::types::{BoxFuture, RequestCounters};

/// Success payload of a resource deployment.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployResponse {
    #[serde(default)]
    data: Option<DeployResponseData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeployResponseData {
    #[serde(default)]
    odata_request_count: u64,
    #[serde(default)]
    odata_internal_request_count: u64,
}

/// [`ResourceApi`] backed by the deployment service's REST endpoint.
///
/// Each resource is `POST`ed to `{base_url}/jobs/{job_id}/resources`.
/// 2xx is a success, 4xx an application failure carrying the response body,
/// and 5xx or a transport error an infrastructure exception.
#[derive(Debug, Clone)]
pub struct HttpResourceApi {
    client: Client,
    base_url: String,
}

impl HttpResourceApi {
    pub fn new(config: &ApiSection) -> Result<Self> {
        Ok(Self {
            client: build_client(config)?,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn resources_url(&self, job_id: &str) -> String {
        format!("{}/jobs/{}/resources", self.base_url, job_id)
    }

    async fn deploy_inner(&self, resource: &Resource, context: &DeployContext) -> ResourceOutcome {
        let url = self.resources_url(&context.job_id);
        debug!(resource = %resource.name, %url, "posting resource");

        let mut request = self.client.post(&url).json(resource);
        if let Some(token) = &context.access_token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(resource = %resource.name, error = %e, "resource API unreachable");
                return ResourceOutcome::InfrastructureException(e.to_string());
            }
        };

        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return ResourceOutcome::InfrastructureException(e.to_string()),
        };

        classify_response(status, &body)
    }
}

impl ResourceApi for HttpResourceApi {
    fn deploy<'a>(
        &'a self,
        resource: &'a Resource,
        context: &'a DeployContext,
    ) -> BoxFuture<'a, ResourceOutcome> {
        Box::pin(self.deploy_inner(resource, context))
    }
}

/// HTTP client configured from the `[api]` section.
pub(crate) fn build_client(config: &ApiSection) -> Result<Client> {
    let mut builder = Client::builder();
    if let Some(secs) = config.timeout_secs {
        builder = builder.timeout(Duration::from_secs(secs));
    }
    Ok(builder.build()?)
}

/// Map an HTTP status and body to a resource outcome.
fn classify_response(status: StatusCode, body: &str) -> ResourceOutcome {
    if status.is_success() {
        let parsed: DeployResponse = if body.trim().is_empty() {
            DeployResponse::default()
        } else {
            match serde_json::from_str(body) {
                Ok(parsed) => parsed,
                Err(e) => {
                    return ResourceOutcome::InfrastructureException(format!(
                        "unreadable response from resource API: {e}"
                    ));
                }
            }
        };

        let counters = parsed
            .data
            .map(|d| RequestCounters::new(d.odata_request_count, d.odata_internal_request_count))
            .unwrap_or_default();
        return ResourceOutcome::Success(counters);
    }

    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{status}: {}", body.trim())
    };

    if status.is_client_error() {
        ResourceOutcome::ApplicationFailure(detail)
    } else {
        ResourceOutcome::InfrastructureException(detail)
    }
}

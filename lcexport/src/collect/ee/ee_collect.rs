use chrono::Utc;
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use url::Url;

use crate::collect::ee::expression::{Image, ImageCollection, Region, ValueNode};
use crate::collect::ee::platform::EarthEngine;
use crate::collect::global_variables::EE_API_BASE_URL;
use crate::error::{Error, Result};
use crate::geo_core::Projection;
use crate::geometric::export::{ExportDescriptor, ExportTask};

/// Asset metadata returned by `GET {base}/{assetName}`
#[derive(Debug, Deserialize)]
struct AssetInfo {
    #[serde(rename = "type")]
    asset_type: String,
}

/// Long-running operation returned by `image:export`
#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
}

/// Earth Engine REST client
/// Every request is a blocking round-trip; timeouts are the HTTP client's.
pub struct EeCollect {
    client: Client,
    base_url: String,
    project: String,
    access_token: Option<String>,
}

impl EeCollect {
    pub fn new(project: &str, access_token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(EeCollect {
            client,
            base_url: EE_API_BASE_URL.to_string(),
            project: project.to_string(),
            access_token,
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn project(&self) -> &str {
        &self.project
    }

    /// Resource URL for `path`, each segment percent-encoded
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| match segment.split_once(':') {
                // custom methods like `value:compute` keep their colon
                Some((name, method)) if !method.contains('/') && !name.is_empty() => {
                    format!("{}:{}", urlencoding::encode(name), method)
                }
                _ => urlencoding::encode(segment).into_owned(),
            })
            .collect();
        let raw = format!("{}/{}", self.base_url, encoded.join("/"));
        Url::parse(&raw).map_err(|e| Error::config(format!("invalid API URL {}: {}", raw, e)))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.access_token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    fn send(&self, request: RequestBuilder) -> Result<Response> {
        self.authorize(request)
            .send()
            .map_err(|e| Error::Network(e.to_string()))
    }

    /// Check that `asset_id` exists and has one of `expected` types
    fn check_asset(&self, asset_id: &str, expected: &[&str]) -> Result<()> {
        let url = self.endpoint(&asset_name(asset_id))?;
        tracing::debug!("GET {}", url);
        let response = self.send(self.client.get(url))?;
        let status = response.status();
        let body = response.text().map_err(|e| Error::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(lookup_error(asset_id, status, &body));
        }

        let info: AssetInfo = serde_json::from_str(&body)?;
        if !expected.contains(&info.asset_type.as_str()) {
            return Err(Error::config(format!(
                "asset {} is a {}, expected {}",
                asset_id,
                info.asset_type,
                expected.join(" or ")
            )));
        }
        Ok(())
    }

    /// Evaluate `node` with `value:compute` and return its `result`
    fn compute_value(&self, asset_id: &str, node: &ValueNode) -> Result<Value> {
        let url = self.endpoint(&format!("projects/{}/value:compute", self.project))?;
        tracing::debug!("POST {}", url);
        let body = json!({ "expression": node.to_expression() });
        let response = self.send(self.client.post(url).json(&body))?;
        let status = response.status();
        let text = response.text().map_err(|e| Error::Network(e.to_string()))?;

        if is_retryable(status) {
            return Err(Error::Network(format!("{}: {}", status, error_message(&text))));
        }
        if !status.is_success() {
            return Err(Error::ProjectionResolution {
                asset_id: asset_id.to_string(),
                reason: error_message(&text),
            });
        }

        let mut parsed: Value = serde_json::from_str(&text)?;
        Ok(parsed
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null))
    }
}

impl EarthEngine for EeCollect {
    fn load_collection(&self, collection_id: &str) -> Result<ImageCollection> {
        self.check_asset(collection_id, &["IMAGE_COLLECTION"])?;
        Ok(ImageCollection::load(collection_id))
    }

    fn load_image(&self, image_id: &str) -> Result<Image> {
        self.check_asset(image_id, &["IMAGE"])?;
        Ok(Image::load(image_id))
    }

    fn load_region(&self, table_id: &str) -> Result<Region> {
        self.check_asset(table_id, &["TABLE"])?;
        Ok(Region::asset(table_id))
    }

    fn projection(&self, asset_id: &str, image: &Image) -> Result<Projection> {
        let info = self.compute_value(asset_id, &image.projection())?;
        Projection::from_info(asset_id, &info)
    }

    fn submit_export(&self, descriptor: &ExportDescriptor) -> Result<ExportTask> {
        let url = self.endpoint(&format!("projects/{}/image:export", self.project))?;
        tracing::debug!("POST {}", url);
        let response = self.send(self.client.post(url).json(&descriptor.to_request_body()))?;
        let status = response.status();
        let text = response.text().map_err(|e| Error::Network(e.to_string()))?;

        if status.is_server_error() {
            return Err(Error::Network(format!("{}: {}", status, error_message(&text))));
        }
        if !status.is_success() {
            return Err(Error::ExportSubmission {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        let operation: Operation = serde_json::from_str(&text)?;
        Ok(ExportTask {
            name: operation.name,
            description: descriptor.description.clone(),
            destination: descriptor.destination_uri(),
            submitted_at: Utc::now(),
        })
    }
}

/// REST resource name of an asset id
///
/// `projects/<p>/<path>` becomes `projects/<p>/assets/<path>`, `users/...` lives
/// under `earthengine-legacy`, anything else is a public catalog id.
pub fn asset_name(asset_id: &str) -> String {
    let id = asset_id.trim_matches('/');
    if let Some(rest) = id.strip_prefix("projects/") {
        let (project, path) = rest.split_once('/').unwrap_or((rest, ""));
        if path.starts_with("assets/") || path.is_empty() {
            return format!("projects/{}", rest);
        }
        return format!("projects/{}/assets/{}", project, path);
    }
    if id.starts_with("users/") {
        return format!("projects/earthengine-legacy/assets/{}", id);
    }
    format!("projects/earthengine-public/assets/{}", id)
}

/// Server errors and rate limiting clear up on their own
fn is_retryable(status: StatusCode) -> bool {
    status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS
}

/// Error for a failed asset lookup
fn lookup_error(asset_id: &str, status: StatusCode, body: &str) -> Error {
    if status == StatusCode::NOT_FOUND || status == StatusCode::FORBIDDEN {
        // inaccessible assets are indistinguishable from missing ones
        return Error::AssetNotFound {
            asset_id: asset_id.to_string(),
        };
    }
    if is_retryable(status) {
        return Error::Network(format!("{}: {}", status, error_message(body)));
    }
    Error::config(format!(
        "asset lookup for {} failed ({}): {}",
        asset_id,
        status,
        error_message(body)
    ))
}

/// `error.message` of a Google API error body, or the body itself
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

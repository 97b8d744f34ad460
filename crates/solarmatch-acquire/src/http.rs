use async_trait::async_trait;
use reqwest::{header, StatusCode};
use serde::Deserialize;
use solarmatch_core::models::{Coordinates, HeatmapScheme, RawAnalysis};
use std::time::Duration;

use crate::error::{AcquireError, Result};
use crate::ports::{ImageFetch, SolarDataSource};

/// HTTP adapter for the SolarMatch analysis backend
pub struct HttpSolarSource {
    /// Base URL of the backend (e.g., "http://localhost:8000")
    base_url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpSolarSource {
    /// Create a new source with a per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AcquireError::Client(e.to_string()))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// Create with default localhost URL
    pub fn localhost() -> Result<Self> {
        Self::new("http://localhost:8000", Duration::from_secs(30))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn analysis_url(&self, coords: Coordinates) -> String {
        format!(
            "{}/api/solar/analysis?lat={}&lon={}",
            self.base_url, coords.latitude, coords.longitude
        )
    }

    fn imagery_url(&self, coords: Coordinates, radius_meters: f64) -> String {
        format!(
            "{}/api/solar/imagery?lat={}&lon={}&radius={}",
            self.base_url, coords.latitude, coords.longitude, radius_meters
        )
    }

    fn heatmap_url(&self, coords: Coordinates, radius_meters: f64, scheme: HeatmapScheme) -> String {
        format!(
            "{}/api/solar/heatmap?lat={}&lon={}&radius={}&colormap={}",
            self.base_url,
            coords.latitude,
            coords.longitude,
            radius_meters,
            scheme.as_str()
        )
    }

    async fn get(&self, endpoint: &str, url: &str) -> Result<reqwest::Response> {
        tracing::debug!(endpoint, url, "Requesting");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| AcquireError::Transport {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })
    }

    /// Fetch an image, mapping "no imagery here" answers to [`ImageFetch::Unavailable`]
    async fn fetch_image(&self, endpoint: &str, url: &str) -> Result<ImageFetch> {
        let response = self.get(endpoint, url).await?;
        let status = response.status();

        if status == StatusCode::NOT_FOUND || status == StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Ok(ImageFetch::Unavailable {
                reason: unavailable_reason(status, &body),
            });
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AcquireError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        // The backend answers 200 with a JSON message when a location has no coverage
        if is_json(response.headers()) {
            let body = response.text().await.unwrap_or_default();
            return Ok(ImageFetch::Unavailable {
                reason: unavailable_reason(status, &body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| AcquireError::Transport {
                endpoint: endpoint.to_string(),
                reason: format!("Failed to read image body: {}", e),
            })?;

        Ok(ImageFetch::Bytes(bytes.to_vec()))
    }
}

#[async_trait]
impl SolarDataSource for HttpSolarSource {
    async fn fetch_analysis(&self, coords: Coordinates) -> Result<RawAnalysis> {
        let endpoint = "analysis";
        let response = self.get(endpoint, &self.analysis_url(coords)).await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AcquireError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<RawAnalysis>()
            .await
            .map_err(|e| AcquireError::InvalidResponse {
                endpoint: endpoint.to_string(),
                reason: format!("Failed to parse analysis: {}", e),
            })
    }

    async fn fetch_imagery(&self, coords: Coordinates, radius_meters: f64) -> Result<ImageFetch> {
        self.fetch_image("imagery", &self.imagery_url(coords, radius_meters))
            .await
    }

    async fn fetch_heatmap(
        &self,
        coords: Coordinates,
        radius_meters: f64,
        scheme: HeatmapScheme,
    ) -> Result<ImageFetch> {
        self.fetch_image("heatmap", &self.heatmap_url(coords, radius_meters, scheme))
            .await
    }

    fn source_name(&self) -> &str {
        &self.base_url
    }
}

/// Message body the backend sends alongside "no imagery" answers
#[derive(Debug, Deserialize)]
struct UnavailableBody {
    #[serde(alias = "detail", alias = "error")]
    message: String,
}

fn is_json(headers: &header::HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.starts_with("application/json"))
        .unwrap_or(false)
}

fn unavailable_reason(status: StatusCode, body: &str) -> String {
    match serde_json::from_str::<UnavailableBody>(body) {
        Ok(parsed) => parsed.message,
        Err(_) if !body.trim().is_empty() => body.trim().to_string(),
        Err(_) => format!("no imagery available (HTTP {})", status.as_u16()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> HttpSolarSource {
        HttpSolarSource::new("http://solar.test:8000/", Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_source_creation() {
        let source = HttpSolarSource::localhost().unwrap();
        assert_eq!(source.base_url(), "http://localhost:8000");
        assert_eq!(source.source_name(), "http://localhost:8000");
    }

    #[test]
    fn test_trailing_slash_is_trimmed() {
        assert_eq!(source().base_url(), "http://solar.test:8000");
    }

    #[test]
    fn test_endpoint_urls() {
        let source = source();
        let coords = Coordinates::new(53.35, -6.26).unwrap();

        assert_eq!(
            source.analysis_url(coords),
            "http://solar.test:8000/api/solar/analysis?lat=53.35&lon=-6.26"
        );
        assert_eq!(
            source.imagery_url(coords, 50.0),
            "http://solar.test:8000/api/solar/imagery?lat=53.35&lon=-6.26&radius=50"
        );
        assert_eq!(
            source.heatmap_url(coords, 75.5, HeatmapScheme::Viridis),
            "http://solar.test:8000/api/solar/heatmap?lat=53.35&lon=-6.26&radius=75.5&colormap=viridis"
        );
    }

    #[test]
    fn test_unavailable_reason() {
        assert_eq!(
            unavailable_reason(StatusCode::NOT_FOUND, r#"{"detail": "No imagery for location"}"#),
            "No imagery for location"
        );
        assert_eq!(
            unavailable_reason(StatusCode::NOT_FOUND, "outside coverage\n"),
            "outside coverage"
        );
        assert_eq!(
            unavailable_reason(StatusCode::NO_CONTENT, ""),
            "no imagery available (HTTP 204)"
        );
    }

    #[test]
    fn test_json_content_type_detection() {
        let mut headers = header::HeaderMap::new();
        assert!(!is_json(&headers));

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json; charset=utf-8"),
        );
        assert!(is_json(&headers));

        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("image/png"));
        assert!(!is_json(&headers));
    }
}

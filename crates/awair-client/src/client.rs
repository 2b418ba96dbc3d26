//! Blocking HTTP implementation of the data source.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use awair_types::format_timestamp;

use crate::error::{Error, Result};
use crate::source::{AirDataSource, PageRequest, RawSample};

/// Base URL of the Awair developer API.
pub const DEFAULT_BASE_URL: &str = "https://developer-apis.awair.is/v1";

/// Identity of the device whose readings are fetched.
///
/// Supplied by the caller; device discovery is not this crate's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    /// Device type slug (e.g. `awair-element`).
    pub device_type: String,
    /// Numeric device id.
    pub device_id: u64,
}

impl Device {
    /// Create a device identity.
    pub fn new(device_type: impl Into<String>, device_id: u64) -> Self {
        Self {
            device_type: device_type.into(),
            device_id,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawResponse {
    data: Vec<RawSample>,
}

/// Blocking client for the raw-readings endpoint.
///
/// The bearer token and device identity are injected at construction; the
/// client never reaches into environment variables or other shared state.
pub struct ApiClient {
    http: reqwest::blocking::Client,
    base_url: String,
    token: String,
    device: Device,
}

impl ApiClient {
    /// Create a client against the default API base URL.
    pub fn new(token: impl Into<String>, device: Device) -> Self {
        Self::with_base_url(token, device, DEFAULT_BASE_URL)
    }

    /// Create a client against a custom base URL.
    pub fn with_base_url(
        token: impl Into<String>,
        device: Device,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            base_url: base_url.into(),
            token: token.into(),
            device,
        }
    }

    /// The device this client fetches for.
    pub fn device(&self) -> &Device {
        &self.device
    }

    fn raw_url(&self) -> String {
        format!(
            "{}/users/self/devices/{}/{}/air-data/raw",
            self.base_url, self.device.device_type, self.device.device_id
        )
    }
}

impl AirDataSource for ApiClient {
    fn fetch_page(&mut self, request: &PageRequest) -> Result<Vec<RawSample>> {
        let from = format_timestamp(request.from);
        let to = format_timestamp(request.to);

        debug!("GET raw readings {} to {} (limit {})", from, to, request.limit);

        let response = self
            .http
            .get(self.raw_url())
            .bearer_auth(&self.token)
            .query(&[
                ("fahrenheit", "true".to_string()),
                ("limit", request.limit.to_string()),
                ("from", from.clone()),
                ("to", to.clone()),
            ])
            .send()?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(Error::RateLimited { from, to });
        }
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(Error::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body: RawResponse = response.json()?;
        Ok(body.data)
    }
}

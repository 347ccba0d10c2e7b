use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use log::debug;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::ACCEPT;
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::model::{
    AddDevicesRequest, PingReport, ScanOptions, ScanRequest, ScanStatusReport, ScanTicket,
    TopologySnapshot,
};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("HTTP {status}: {reason}")]
    Status {
        url: String,
        status: u16,
        reason: String,
    },
    #[error("unexpected response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn url(&self) -> &str {
        match self {
            Self::Transport { url, .. } | Self::Status { url, .. } | Self::Decode { url, .. } => url,
        }
    }
}

pub trait TopologyApi: Send + Sync {
    fn fetch_topology(&self) -> Result<TopologySnapshot, ApiError>;
    fn save_topology(&self, snapshot: &TopologySnapshot) -> Result<(), ApiError>;
    fn submit_scan(&self, range: &str, options: ScanOptions) -> Result<ScanTicket, ApiError>;
    fn scan_status(&self, job_id: &str) -> Result<ScanStatusReport, ApiError>;
    fn add_devices(&self, job_id: &str, device_ids: &[String]) -> Result<(), ApiError>;
    fn ping_device(&self, device_id: &str) -> Result<PingReport, ApiError>;
    fn remove_device(&self, device_id: &str) -> Result<(), ApiError>;
}

pub struct HttpTopologyApi {
    client: Client,
    base_url: Url,
}

impl HttpTopologyApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url =
            Url::parse(base_url).with_context(|| format!("invalid API base URL: {base_url}"))?;
        if base_url.cannot_be_a_base() {
            return Err(anyhow!("API base URL cannot carry a path: {base_url}"));
        }

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("router-topology/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to create HTTP client")?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    pub fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.send(Method::GET, segments, None::<&()>)
    }

    pub fn post<B, T>(&self, segments: &[&str], body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send(Method::POST, segments, Some(body))
    }

    pub fn delete<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.send(Method::DELETE, segments, None::<&()>)
    }

    fn send<B, T>(&self, method: Method, segments: &[&str], body: Option<&B>) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.endpoint(segments);
        debug!("{method} {url}");

        let mut request: RequestBuilder = self
            .client
            .request(method, url.clone())
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.json(body);
        }

        let transport = |source| ApiError::Transport {
            url: url.to_string(),
            source,
        };
        let response = request.send().map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_owned(),
            });
        }

        let text = response.text().map_err(transport)?;
        decode_body(&text).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

/// Empty bodies decode as JSON `null` so acknowledgements without content work.
fn decode_body<T: DeserializeOwned>(text: &str) -> Result<T, serde_json::Error> {
    if text.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(text)
    }
}

impl TopologyApi for HttpTopologyApi {
    fn fetch_topology(&self) -> Result<TopologySnapshot, ApiError> {
        self.get(&["api", "topology", "network"])
    }

    fn save_topology(&self, snapshot: &TopologySnapshot) -> Result<(), ApiError> {
        self.post::<_, Value>(&["api", "topology", "network"], snapshot)
            .map(drop)
    }

    fn submit_scan(&self, range: &str, options: ScanOptions) -> Result<ScanTicket, ApiError> {
        self.post(&["api", "topology", "scan"], &ScanRequest { range, options })
    }

    fn scan_status(&self, job_id: &str) -> Result<ScanStatusReport, ApiError> {
        self.get(&["api", "topology", "scan", job_id])
    }

    fn add_devices(&self, job_id: &str, device_ids: &[String]) -> Result<(), ApiError> {
        let body = AddDevicesRequest {
            devices: device_ids,
            job_id,
        };
        self.post::<_, Value>(&["api", "topology", "devices", "add"], &body)
            .map(drop)
    }

    fn ping_device(&self, device_id: &str) -> Result<PingReport, ApiError> {
        self.get(&["api", "topology", "device", device_id, "ping"])
    }

    fn remove_device(&self, device_id: &str) -> Result<(), ApiError> {
        self.delete::<Value>(&["api", "topology", "device", device_id])
            .map(drop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpTopologyApi {
        HttpTopologyApi::new(base, Duration::from_secs(1)).unwrap()
    }

    #[test]
    fn endpoints_are_joined_and_escaped() {
        let api = api("http://router.local:5000/");
        assert_eq!(
            api.endpoint(&["api", "topology", "scan", "job 7"]).as_str(),
            "http://router.local:5000/api/topology/scan/job%207"
        );

        let prefixed = self::api("http://router.local/console");
        assert_eq!(
            prefixed.endpoint(&["api", "topology", "network"]).as_str(),
            "http://router.local/console/api/topology/network"
        );
    }

    #[test]
    fn rejects_unusable_base_urls() {
        assert!(HttpTopologyApi::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpTopologyApi::new("mailto:admin@router", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn empty_acknowledgement_decodes() {
        let ack: Value = decode_body("").unwrap();
        assert_eq!(ack, Value::Null);
        let ticket: ScanTicket = decode_body(r#"{"job_id": 42}"#).unwrap();
        assert_eq!(ticket.job_id, "42");
        assert!(decode_body::<ScanTicket>("<html>").is_err());
    }

    #[test]
    fn status_errors_render_code_and_reason() {
        let error = ApiError::Status {
            url: "http://router.local/api/topology/network".to_owned(),
            status: 503,
            reason: "Service Unavailable".to_owned(),
        };
        assert_eq!(error.to_string(), "HTTP 503: Service Unavailable");
        assert_eq!(error.url(), "http://router.local/api/topology/network");
    }
}

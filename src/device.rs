use crate::config::DeviceConfig;
use crate::error::Result;
use crate::normalize::{normalize_payload, NormalizedReading};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Candidate data endpoints, probed in order on every poll. The first one
/// returning a well-formed, non-empty payload wins for that call; no
/// stickiness is assumed, so a flapping endpoint heals itself next tick.
pub const DATA_ENDPOINTS: [&str; 4] = [
    "/api/v1/energy/realtime",
    "/api/v1/data/current",
    "/api/v1/circuits/data",
    "/cgi-bin/luci/admin/refoss/energy",
];

const INFO_ENDPOINT: &str = "/api/v1/device/info";
const HTTP_TIMEOUT: Duration = Duration::from_secs(5);

/// Best-effort identity attributes from the device info endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeviceInfo {
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
    pub name: Option<String>,
    pub mac: Option<String>,
    pub firmware: Option<String>,
}

pub struct DeviceClient {
    http: reqwest::Client,
    base_url: String,
    ip: String,
    device_id: String,
    synthetic_fallback: bool,
}

impl DeviceClient {
    /// Build the client and resolve the device identifier once. Identity
    /// discovery failure falls back to an IP-derived identifier; only
    /// constructing the HTTP client itself can fail here.
    pub async fn connect(cfg: &DeviceConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
        let base_url = format!("http://{}", cfg.ip);

        let device_id = match &cfg.device_id {
            Some(id) => id.clone(),
            None => resolve_device_id(&http, &base_url, &cfg.ip).await,
        };

        Ok(Self {
            http,
            base_url,
            ip: cfg.ip.clone(),
            device_id,
            synthetic_fallback: cfg.synthetic_fallback,
        })
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    /// Device attributes for the identity upsert; empty on any failure.
    pub async fn device_info(&self) -> DeviceInfo {
        match self.get_json(INFO_ENDPOINT).await {
            Some(body) => serde_json::from_value(body).unwrap_or_default(),
            None => DeviceInfo::default(),
        }
    }

    /// Fetch and normalize one batch of per-circuit readings. Network and
    /// data-shape failures degrade to an empty batch; the collector decides
    /// the retry cadence.
    pub async fn fetch_readings(&self) -> Vec<NormalizedReading> {
        for endpoint in DATA_ENDPOINTS {
            if let Some(body) = self.get_json(endpoint).await {
                let batch = normalize_payload(&body);
                if !batch.is_empty() {
                    debug!(endpoint, count = batch.len(), "device data received");
                    return batch;
                }
            }
        }

        if self.synthetic_fallback {
            warn!("no device endpoint yielded data; generating synthetic readings (development aid, not live-device data)");
            return synthetic_readings();
        }

        warn!(device = %self.device_id, "no device endpoint yielded data this tick");
        Vec::new()
    }

    async fn get_json(&self, endpoint: &str) -> Option<Value> {
        let url = format!("{}{}", self.base_url, endpoint);
        match self.http.get(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<Value>().await {
                Ok(body) => Some(body),
                Err(e) => {
                    debug!(endpoint, error = %e, "device response was not JSON");
                    None
                }
            },
            Ok(resp) => {
                debug!(endpoint, status = %resp.status(), "device endpoint rejected request");
                None
            }
            Err(e) => {
                debug!(endpoint, error = %e, "device endpoint unreachable");
                None
            }
        }
    }
}

async fn resolve_device_id(http: &reqwest::Client, base_url: &str, ip: &str) -> String {
    let url = format!("{}{}", base_url, INFO_ENDPOINT);
    let discovered = match http.get(&url).send().await {
        Ok(resp) if resp.status().is_success() => resp
            .json::<DeviceInfo>()
            .await
            .ok()
            .and_then(|info| info.device_id),
        _ => None,
    };

    match discovered {
        Some(id) => id,
        None => {
            let fallback = format!("em16_{}", ip.replace('.', "_"));
            warn!(fallback = %fallback, "could not discover device id; using IP-derived identifier");
            fallback
        }
    }
}

/// 18-circuit synthetic batch (2 mains, 16 branches) for development and
/// testing when no live device is reachable.
fn synthetic_readings() -> Vec<NormalizedReading> {
    let mut rng = rand::thread_rng();
    (1..=18)
        .map(|n| {
            let (power, voltage) = if n <= 2 {
                (rng.gen_range(2000.0..8000.0), rng.gen_range(235.0..245.0))
            } else {
                (rng.gen_range(0.0..2000.0), rng.gen_range(115.0..125.0))
            };
            let current = if voltage > 0.0 { power / voltage } else { 0.0 };
            NormalizedReading {
                circuit_number: n,
                voltage,
                current,
                power,
                energy: rng.gen_range(0.0..100.0),
                power_factor: rng.gen_range(0.8..1.0),
                frequency: rng.gen_range(59.5..60.5),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_batch_covers_full_panel() {
        let batch = synthetic_readings();
        assert_eq!(batch.len(), 18);
        assert_eq!(batch[0].circuit_number, 1);
        assert_eq!(batch[17].circuit_number, 18);
        // Mains run hotter than branches.
        for r in &batch[..2] {
            assert!(r.power >= 2000.0);
        }
        for r in &batch {
            assert!(r.current >= 0.0);
            assert!((59.5..=60.5).contains(&r.frequency));
        }
    }
}

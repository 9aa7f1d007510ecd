//! HTTP probe
//!
//! Issues a HEAD request per URL and reports the elapsed wall-clock time.
//! Any completed transfer counts as a measurement regardless of status code;
//! transport failures and timeouts are `Unknown`.
//!
//! The probe owns a current-thread tokio runtime. It must be built inside the
//! worker process, after the fork, never in the coordinator.

use super::{has_scheme_prefix, Classification, Classifier};
use crate::config::ProbeConfig;
use crate::error::{PulseError, Result};
use reqwest::redirect::Policy;
use std::time::{Duration, Instant};

/// Maximum redirect hops when redirects are followed
const MAX_REDIRECTS: usize = 10;

/// HEAD-request latency probe
pub struct HttpProbe {
    runtime: tokio::runtime::Runtime,
    client: reqwest::Client,
    scheme_prefix: String,
}

impl HttpProbe {
    /// Build a probe from configuration
    pub fn new(config: &ProbeConfig) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| PulseError::Probe(format!("failed to create runtime: {}", e)))?;

        let redirect = if config.follow_redirects {
            Policy::limited(MAX_REDIRECTS)
        } else {
            Policy::none()
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(redirect)
            .build()
            .map_err(|e| PulseError::Probe(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            runtime,
            client,
            scheme_prefix: config.scheme_prefix.clone(),
        })
    }
}

impl Classifier for HttpProbe {
    fn classify(&mut self, url: &str) -> Classification {
        if !has_scheme_prefix(url, &self.scheme_prefix) {
            return Classification::Invalid;
        }

        let start = Instant::now();
        let request = self.client.head(url).send();
        match self.runtime.block_on(request) {
            Ok(response) => {
                let elapsed = start.elapsed().as_secs_f64();
                tracing::trace!(url, status = response.status().as_u16(), elapsed, "probe ok");
                Classification::Latency(elapsed)
            }
            Err(e) => {
                tracing::debug!(url, error = %e, "probe failed");
                Classification::Unknown
            }
        }
    }
}

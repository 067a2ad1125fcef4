use std::time::Duration;

use chrono::NaiveDate;
use reqwest::blocking::Client;
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::StatusCode;
use tracing::{debug, info};

use crate::error::EpssError;
use crate::remote::{parse, ScoreSource};
use crate::scores::Snapshot;
use crate::settings::Settings;

pub struct EpssHttpClient {
    client: Client,
    // Redirects are left unfollowed so the "current" alias can be resolved.
    probe: Client,
    base_url: String,
}

impl EpssHttpClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> crate::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EpssError::UpstreamUnavailable(e.to_string()))?;
        let probe = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|e| EpssError::UpstreamUnavailable(e.to_string()))?;

        Ok(Self {
            client,
            probe,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn from_settings(settings: &Settings) -> crate::Result<Self> {
        Self::new(
            settings.base_url.clone(),
            Duration::from_secs(settings.timeout_secs),
        )
    }

    pub fn current_url(&self) -> String {
        format!("{}/epss_scores-current.csv.gz", self.base_url)
    }
}

/// `<base>/epss_scores-<YYYY-MM-DD>.csv.gz`
pub fn build_download_url(base_url: &str, date: NaiveDate) -> String {
    format!(
        "{}/epss_scores-{}.csv.gz",
        base_url.trim_end_matches('/'),
        date.format("%Y-%m-%d")
    )
}

impl ScoreSource for EpssHttpClient {
    fn download_url(&self, date: NaiveDate) -> String {
        build_download_url(&self.base_url, date)
    }

    fn fetch_snapshot(&self, date: NaiveDate) -> crate::Result<Snapshot> {
        let url = self.download_url(date);
        info!("Downloading {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| EpssError::UpstreamUnavailable(format!("{}: {}", url, e)))?;

        let status = response.status();
        if matches!(status, StatusCode::NOT_FOUND | StatusCode::FORBIDDEN) {
            return Err(EpssError::UpstreamNotFound { date, url });
        }
        if !status.is_success() {
            return Err(EpssError::UpstreamUnavailable(format!(
                "{} returned {}",
                url, status
            )));
        }

        if let Some(length) = response.content_length() {
            debug!("Streaming {} bytes from {}", length, url);
        }

        parse::read_snapshot(response, date)
    }

    fn snapshot_exists(&self, date: NaiveDate) -> crate::Result<bool> {
        let url = self.download_url(date);
        let response = self
            .probe
            .head(&url)
            .send()
            .map_err(|e| EpssError::UpstreamUnavailable(format!("{}: {}", url, e)))?;
        debug!("HEAD {} -> {}", url, response.status());
        Ok(response.status() == StatusCode::OK)
    }

    fn current_date(&self) -> crate::Result<NaiveDate> {
        let url = self.current_url();
        let response = self
            .probe
            .head(&url)
            .send()
            .map_err(|e| EpssError::UpstreamUnavailable(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !(status.is_redirection() || status.is_success()) {
            return Err(EpssError::UpstreamUnavailable(format!(
                "{} returned {}",
                url, status
            )));
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| {
                EpssError::MalformedUpstreamResponse(format!("{} did not redirect", url))
            })?;

        parse::extract_date(location)
    }
}

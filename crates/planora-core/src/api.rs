//! HTTP client for the study server's timer endpoints.
//!
//! Every endpoint answers with a `{ "success": bool, ... }` envelope; a
//! `false` flag is surfaced as [`ApiError::Rejected`] with the server's
//! message.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{ApiError, CoreError};
use crate::report::{SessionReporter, SessionSummary};
use crate::storage::Config;

const SUBJECTS_PATH: &str = "timer/api/subjects";
const SAVE_SESSION_PATH: &str = "timer/api/save-session";
const RECENT_SESSIONS_PATH: &str = "timer/api/sessions/recent";
const SESSION_STATS_PATH: &str = "timer/api/sessions/stats";

#[derive(Debug, Deserialize)]
struct SubjectsResponse {
    success: bool,
    #[serde(default)]
    subjects: Vec<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Acknowledgement of a saved session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveAck {
    pub success: bool,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RecentSessionsResponse {
    success: bool,
    #[serde(default)]
    sessions: Vec<serde_json::Value>,
    #[serde(default)]
    error: Option<String>,
}

/// Aggregates over a trailing window of days.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStats {
    pub total_sessions: u64,
    pub total_time: u64,
    pub total_cycles: u64,
    pub completed_sessions: u64,
    pub total_pauses: u64,
    pub avg_time_per_session: f64,
    pub completion_rate: f64,
    pub avg_cycles_per_session: f64,
}

#[derive(Debug, Deserialize)]
struct SessionStatsResponse {
    success: bool,
    #[serde(default)]
    stats: SessionStats,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the `/timer/api/*` endpoints.
#[derive(Debug, Clone)]
pub struct PlanoraClient {
    http: Client,
    base_url: Url,
}

impl PlanoraClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        let mut base_url = Url::parse(base_url)?;
        // Endpoints are joined relative to the base, which needs a trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base_url })
    }

    pub fn from_config(config: &Config) -> Result<Self, ApiError> {
        Self::new(
            &config.server.base_url,
            Duration::from_secs(config.server.timeout_secs),
        )
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path)?)
    }

    /// Subjects the user can study, failing on any transport or server error.
    pub async fn try_fetch_subjects(&self) -> Result<Vec<String>, ApiError> {
        let resp = self.http.get(self.endpoint(SUBJECTS_PATH)?).send().await?;
        let body: SubjectsResponse = read_envelope(resp).await?;
        if !body.success {
            return Err(ApiError::Rejected(body.error.unwrap_or_default()));
        }
        Ok(body.subjects)
    }

    /// Subjects the user can study; failures are logged and yield an empty list.
    pub async fn fetch_subjects(&self) -> Vec<String> {
        match self.try_fetch_subjects().await {
            Ok(subjects) => subjects,
            Err(e) => {
                warn!("error loading subjects: {e}");
                Vec::new()
            }
        }
    }

    pub async fn save_session(&self, summary: &SessionSummary) -> Result<SaveAck, ApiError> {
        debug!(?summary, "saving session");
        let resp = self
            .http
            .post(self.endpoint(SAVE_SESSION_PATH)?)
            .json(summary)
            .send()
            .await?;
        let ack: SaveAck = read_envelope(resp).await?;
        if !ack.success {
            return Err(ApiError::Rejected(ack.error.unwrap_or_default()));
        }
        Ok(ack)
    }

    pub async fn recent_sessions(
        &self,
        user_id: Option<&str>,
        limit: u32,
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let mut url = self.endpoint(RECENT_SESSIONS_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(user_id) = user_id {
                query.append_pair("user_id", user_id);
            }
            query.append_pair("limit", &limit.to_string());
        }
        let body: RecentSessionsResponse = read_envelope(self.http.get(url).send().await?).await?;
        if !body.success {
            return Err(ApiError::Rejected(body.error.unwrap_or_default()));
        }
        Ok(body.sessions)
    }

    pub async fn session_stats(
        &self,
        user_id: Option<&str>,
        days: u32,
    ) -> Result<SessionStats, ApiError> {
        let mut url = self.endpoint(SESSION_STATS_PATH)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(user_id) = user_id {
                query.append_pair("user_id", user_id);
            }
            query.append_pair("days", &days.to_string());
        }
        let body: SessionStatsResponse = read_envelope(self.http.get(url).send().await?).await?;
        if !body.success {
            return Err(ApiError::Rejected(body.error.unwrap_or_default()));
        }
        Ok(body.stats)
    }
}

/// Decode an envelope, falling back to the HTTP status when the body is not JSON.
async fn read_envelope<T: DeserializeOwned>(resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let body = resp.text().await?;
    match serde_json::from_str::<T>(&body) {
        Ok(value) => Ok(value),
        Err(_) if !status.is_success() => Err(ApiError::Status {
            status: status.as_u16(),
            body,
        }),
        Err(e) => Err(ApiError::InvalidResponse(e.to_string())),
    }
}

/// Posts summaries to the save-session endpoint on the tokio runtime.
///
/// `submit` spawns and returns; the task only logs. Short-lived processes
/// call [`HttpReporter::flush`] before exiting so the request is not dropped.
pub struct HttpReporter {
    client: PlanoraClient,
    runtime: Handle,
    in_flight: Mutex<Vec<JoinHandle<()>>>,
}

impl HttpReporter {
    /// Must be called from within a tokio runtime.
    pub fn new(client: PlanoraClient) -> Result<Self, CoreError> {
        let runtime = Handle::try_current().map_err(|e| CoreError::Runtime(e.to_string()))?;
        Ok(Self {
            client,
            runtime,
            in_flight: Mutex::new(Vec::new()),
        })
    }

    /// Wait for every submitted report to finish.
    pub async fn flush(&self) {
        let pending = match self.in_flight.lock() {
            Ok(mut in_flight) => std::mem::take(&mut *in_flight),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        for handle in pending {
            if let Err(e) = handle.await {
                warn!("session report task did not complete: {e}");
            }
        }
    }
}

impl SessionReporter for HttpReporter {
    fn submit(&self, summary: SessionSummary) {
        let client = self.client.clone();
        let handle = self.runtime.spawn(async move {
            match client.save_session(&summary).await {
                Ok(ack) => info!(
                    session_id = ack.session_id.as_deref().unwrap_or("-"),
                    "session saved successfully"
                ),
                Err(e) => error!("error saving session: {e}"),
            }
        });
        let mut in_flight = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        in_flight.retain(|h| !h.is_finished());
        in_flight.push(handle);
    }
}

use std::time::Duration;

use babytrack_core::checklist::ChecklistView;
use babytrack_core::notes::Note;
use babytrack_core::wire::{
    ChecklistResponse, CustomItemRequest, DeleteResponse, ProfileRequest, ProfileView,
    ReportResponse, StatusRequest, StatusView,
};
use babytrack_core::{Id, TimeRange, TrackerEntry, TrackerType};
use reqwest::{Method, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{ClientError, extract_error_message};

/// Timeout applied to every request unless configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Authenticated client for the babytrack API.
///
/// Every call carries the Cognito ID token as a bearer header. Responses
/// outside 2xx become [`ClientError::Api`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    id_token: String,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        id_token: impl Into<String>,
    ) -> Result<Self, ClientError> {
        Self::with_timeout(base_url, id_token, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        id_token: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ClientError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ClientError::Config("base URL is empty".to_string()));
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url,
            id_token: id_token.into(),
        })
    }

    /// Build a client from `BABYTRACK_API_URL`, `BABYTRACK_ID_TOKEN` and the
    /// optional `BABYTRACK_TIMEOUT` (e.g. `10s`).
    pub fn from_env() -> Result<Self, ClientError> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| ClientError::Config(format!("{name} is not set")))
        };
        let timeout = match std::env::var("BABYTRACK_TIMEOUT") {
            Ok(raw) => humantime::parse_duration(&raw)
                .map_err(|e| ClientError::Config(format!("BABYTRACK_TIMEOUT: {e}")))?,
            Err(_) => DEFAULT_TIMEOUT,
        };
        Self::with_timeout(var("BABYTRACK_API_URL")?, var("BABYTRACK_ID_TOKEN")?, timeout)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, path, "api request");
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .bearer_auth(&self.id_token)
    }

    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ClientError> {
        let resp = request.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let message = extract_error_message(status, &body);
            debug!(%status, %message, "api error");
            return Err(ClientError::Api { status, message });
        }
        Ok(resp.json().await?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(Method::GET, path)).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::POST, path).json(body)).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        self.execute(self.request(Method::PUT, path).json(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        self.execute(self.request(Method::DELETE, path)).await
    }

    // Profiles

    pub async fn health(&self) -> Result<Value, ClientError> {
        self.get("/health").await
    }

    pub async fn list_profiles(&self) -> Result<Vec<ProfileView>, ClientError> {
        self.get("/profiles").await
    }

    pub async fn create_profile(&self, profile: &ProfileRequest) -> Result<ProfileView, ClientError> {
        self.post("/profiles", profile).await
    }

    pub async fn get_profile(&self, id: &Id) -> Result<ProfileView, ClientError> {
        self.get(&format!("/profiles/{id}")).await
    }

    pub async fn update_profile(
        &self,
        id: &Id,
        profile: &ProfileRequest,
    ) -> Result<ProfileView, ClientError> {
        self.put(&format!("/profiles/{id}"), profile).await
    }

    pub async fn delete_profile(&self, id: &Id) -> Result<DeleteResponse, ClientError> {
        self.delete(&format!("/profiles/{id}")).await
    }

    // Tracker entries

    pub async fn list_entries(
        &self,
        profile: &Id,
        tracker: TrackerType,
    ) -> Result<Vec<TrackerEntry>, ClientError> {
        self.get(&format!("/profiles/{profile}/trackers/{tracker}")).await
    }

    pub async fn create_entry(
        &self,
        profile: &Id,
        tracker: TrackerType,
        payload: &Map<String, Value>,
    ) -> Result<TrackerEntry, ClientError> {
        self.post(&format!("/profiles/{profile}/trackers/{tracker}"), payload)
            .await
    }

    pub async fn get_entry(
        &self,
        profile: &Id,
        tracker: TrackerType,
        entry: &Id,
    ) -> Result<TrackerEntry, ClientError> {
        self.get(&format!("/profiles/{profile}/trackers/{tracker}/{entry}"))
            .await
    }

    pub async fn update_entry(
        &self,
        profile: &Id,
        tracker: TrackerType,
        entry: &Id,
        payload: &Map<String, Value>,
    ) -> Result<TrackerEntry, ClientError> {
        self.put(
            &format!("/profiles/{profile}/trackers/{tracker}/{entry}"),
            payload,
        )
        .await
    }

    pub async fn delete_entry(
        &self,
        profile: &Id,
        tracker: TrackerType,
        entry: &Id,
    ) -> Result<DeleteResponse, ClientError> {
        self.delete(&format!("/profiles/{profile}/trackers/{tracker}/{entry}"))
            .await
    }

    // Reports and notes

    /// Fetch chart data. An empty `trackers` slice asks for the server's
    /// default set.
    pub async fn report(
        &self,
        profile: &Id,
        trackers: &[TrackerType],
        time_range: Option<TimeRange>,
    ) -> Result<ReportResponse, ClientError> {
        self.get(&filtered_path("/reports", profile, trackers, time_range))
            .await
    }

    /// Entries with notes, newest first. An empty `trackers` slice covers
    /// every tracker.
    pub async fn notes(
        &self,
        profile: &Id,
        trackers: &[TrackerType],
        time_range: Option<TimeRange>,
    ) -> Result<Vec<Note>, ClientError> {
        self.get(&filtered_path("/notes", profile, trackers, time_range))
            .await
    }

    // Checklist

    pub async fn checklist(&self, profile: Option<&Id>) -> Result<ChecklistResponse, ClientError> {
        match profile {
            Some(id) => self.get(&format!("/checklist?profileId={id}")).await,
            None => self.get("/checklist").await,
        }
    }

    pub async fn create_custom_item(
        &self,
        item: &CustomItemRequest,
    ) -> Result<ChecklistView, ClientError> {
        self.post("/checklist", item).await
    }

    pub async fn delete_custom_item(&self, item: &Id) -> Result<DeleteResponse, ClientError> {
        self.delete(&format!("/checklist/{item}")).await
    }

    pub async fn statuses(&self) -> Result<Vec<StatusView>, ClientError> {
        self.get("/checklist/status").await
    }

    pub async fn set_status(&self, item: &Id, completed: bool) -> Result<StatusView, ClientError> {
        self.put(
            &format!("/checklist/status/{item}"),
            &StatusRequest { completed },
        )
        .await
    }
}

/// `{endpoint}?profileId=..[&trackers=..][&timeRange=..]`
fn filtered_path(
    endpoint: &str,
    profile: &Id,
    trackers: &[TrackerType],
    time_range: Option<TimeRange>,
) -> String {
    let mut path = format!("{endpoint}?profileId={profile}");
    if !trackers.is_empty() {
        let names: Vec<&str> = trackers.iter().map(|t| t.as_str()).collect();
        path.push_str(&format!("&trackers={}", names.join(",")));
    }
    if let Some(range) = time_range {
        path.push_str(&format!("&timeRange={range}"));
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filtered_path_includes_only_given_filters() {
        let profile = Id::new("baby_1").unwrap();
        assert_eq!(
            filtered_path("/notes", &profile, &[], None),
            "/notes?profileId=baby_1"
        );
        assert_eq!(
            filtered_path(
                "/notes",
                &profile,
                &[TrackerType::Sleep, TrackerType::Bottle],
                Some(TimeRange::Last30Days)
            ),
            "/notes?profileId=baby_1&trackers=sleep,bottle&timeRange=last30days"
        );
    }

    #[test]
    fn trims_trailing_slash() {
        let client = ApiClient::new("https://api.example.com/prod/", "token").unwrap();
        assert_eq!(client.base_url(), "https://api.example.com/prod");
    }

    #[test]
    fn rejects_empty_base_url() {
        assert!(matches!(
            ApiClient::new("/", "token"),
            Err(ClientError::Config(_))
        ));
    }
}

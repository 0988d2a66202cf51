use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{multipart, Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{CallLogEntry, CarrierRecord},
    error::ApiError,
    protocol::{
        BatchStatus, BulkCallItem, BulkCallRequest, BulkCallResponse, LogCallAck, LogCallRequest,
        PlaceCallRequest, PlaceCallResponse, ScrapeRequest, ScrapeResponse, UploadResponse,
    },
};
use tracing::debug;
use url::Url;

use crate::{config::normalize_base_url, DialerService};

/// Dialer service client over the console's HTTP API.
pub struct HttpDialerService {
    http: Client,
    base_url: String,
}

impl HttpDialerService {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = normalize_base_url(&base_url.into());
        Url::parse(&base_url).with_context(|| format!("invalid API base URL '{base_url}'"))?;
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }
}

/// Turn a non-2xx response into an error carrying the service's message when
/// the body decodes as an `ApiError`, or a generic transport message otherwise.
async fn decode_or_fail<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return response
            .json::<T>()
            .await
            .with_context(|| format!("malformed {what} response"));
    }
    Err(service_error(status, &response.text().await.unwrap_or_default(), what))
}

fn service_error(status: StatusCode, body: &str, what: &str) -> anyhow::Error {
    match serde_json::from_str::<ApiError>(body) {
        Ok(api_error) => anyhow!("{}", api_error.message),
        Err(_) => anyhow!("{what} request failed with status {status}"),
    }
}

#[async_trait]
impl DialerService for HttpDialerService {
    async fn upload_carriers(&self, file_name: &str, csv_text: &str) -> Result<UploadResponse> {
        let part = multipart::Part::text(csv_text.to_string())
            .file_name(file_name.to_string())
            .mime_str("text/csv")
            .context("invalid upload mime type")?;
        let form = multipart::Form::new().part("file", part);
        let response = self
            .http
            .post(self.endpoint("upload_csv"))
            .multipart(form)
            .send()
            .await
            .context("failed to reach dialer service for CSV upload")?;
        decode_or_fail(response, "upload").await
    }

    async fn list_carriers(&self) -> Result<Vec<CarrierRecord>> {
        let response = self
            .http
            .get(self.endpoint("carriers"))
            .send()
            .await
            .context("failed to reach dialer service for carrier list")?;
        decode_or_fail(response, "carrier list").await
    }

    async fn list_call_logs(&self) -> Result<Vec<CallLogEntry>> {
        let response = self
            .http
            .get(self.endpoint("call_logs"))
            .send()
            .await
            .context("failed to reach dialer service for call logs")?;
        decode_or_fail(response, "call log list").await
    }

    async fn place_call(&self, request: PlaceCallRequest) -> Result<PlaceCallResponse> {
        let response = self
            .http
            .post(self.endpoint("call"))
            .json(&request)
            .send()
            .await
            .context("failed to reach dialer service for call")?;
        decode_or_fail(response, "call").await
    }

    async fn place_bulk_calls(&self, items: Vec<BulkCallItem>) -> Result<BulkCallResponse> {
        let response = self
            .http
            .post(self.endpoint("bulk_call"))
            .json(&BulkCallRequest { items })
            .send()
            .await
            .context("failed to reach dialer service for bulk call")?;

        let status = response.status();
        if status.is_success() {
            return response
                .json::<BulkCallResponse>()
                .await
                .context("malformed bulk call response");
        }

        // A failing status whose body still carries a recognized
        // partial-success envelope is an outcome, not a transport error.
        let body = response.text().await.unwrap_or_default();
        if let Ok(envelope) = serde_json::from_str::<BulkCallResponse>(&body) {
            if envelope.status == BatchStatus::PartialSuccess {
                debug!(%status, "bulk call returned partial success under an error status");
                return Ok(envelope);
            }
        }
        Err(service_error(status, &body, "bulk call"))
    }

    async fn log_call(&self, request: LogCallRequest) -> Result<LogCallAck> {
        let response = self
            .http
            .post(self.endpoint("log_call"))
            .json(&request)
            .send()
            .await
            .context("failed to reach dialer service to log call")?;
        decode_or_fail(response, "log call").await
    }

    async fn scrape_range(&self, start_id: u64, end_id: u64) -> Result<ScrapeResponse> {
        let response = self
            .http
            .post(self.endpoint("scrape"))
            .json(&ScrapeRequest { start_id, end_id })
            .send()
            .await
            .context("failed to reach dialer service for scrape")?;
        decode_or_fail(response, "scrape").await
    }
}

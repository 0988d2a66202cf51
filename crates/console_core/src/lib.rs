use std::{collections::HashSet, fmt, sync::Arc, time::Duration};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use shared::{
    domain::{CallLogEntry, CarrierRecord, McNumber, PhoneNumber},
    protocol::{
        BatchStatus, BulkCallItem, BulkCallResponse, BulkItemResult, CallStatus, LogCallAck,
        LogCallRequest, PlaceCallRequest, PlaceCallResponse, ScrapeResponse, UploadResponse,
    },
};
use thiserror::Error;
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info, warn};

pub mod bulk;
pub mod call_log;
pub mod config;
pub mod filter;
pub mod http;
pub mod ingest;
pub mod selection;

pub use bulk::BulkSummary;
pub use config::{load_settings, Settings};
pub use filter::{CompareOp, FilterSet, NumericFilter};
pub use http::HttpDialerService;
pub use selection::SelectionSet;

/// The remote side of the console: telephony, CSV ingestion, and FMCSA-style
/// scraping all live behind this seam. The service is the system of record;
/// the engine holds a session-local working copy.
#[async_trait]
pub trait DialerService: Send + Sync {
    async fn upload_carriers(&self, file_name: &str, csv_text: &str) -> Result<UploadResponse>;
    async fn list_carriers(&self) -> Result<Vec<CarrierRecord>>;
    async fn list_call_logs(&self) -> Result<Vec<CallLogEntry>>;
    async fn place_call(&self, request: PlaceCallRequest) -> Result<PlaceCallResponse>;
    async fn place_bulk_calls(&self, items: Vec<BulkCallItem>) -> Result<BulkCallResponse>;
    async fn log_call(&self, request: LogCallRequest) -> Result<LogCallAck>;
    async fn scrape_range(&self, start_id: u64, end_id: u64) -> Result<ScrapeResponse>;
}

pub struct MissingDialerService;

#[async_trait]
impl DialerService for MissingDialerService {
    async fn upload_carriers(&self, file_name: &str, _csv_text: &str) -> Result<UploadResponse> {
        Err(anyhow!("dialer service unavailable for upload of '{file_name}'"))
    }

    async fn list_carriers(&self) -> Result<Vec<CarrierRecord>> {
        Err(anyhow!("dialer service unavailable for carrier list"))
    }

    async fn list_call_logs(&self) -> Result<Vec<CallLogEntry>> {
        Err(anyhow!("dialer service unavailable for call logs"))
    }

    async fn place_call(&self, request: PlaceCallRequest) -> Result<PlaceCallResponse> {
        Err(anyhow!(
            "dialer service unavailable for call to {}",
            request.phone_number
        ))
    }

    async fn place_bulk_calls(&self, items: Vec<BulkCallItem>) -> Result<BulkCallResponse> {
        Err(anyhow!(
            "dialer service unavailable for bulk call of {} items",
            items.len()
        ))
    }

    async fn log_call(&self, request: LogCallRequest) -> Result<LogCallAck> {
        Err(anyhow!(
            "dialer service unavailable to log call to {}",
            request.phone_number
        ))
    }

    async fn scrape_range(&self, start_id: u64, end_id: u64) -> Result<ScrapeResponse> {
        Err(anyhow!(
            "dialer service unavailable for scrape {start_id}..{end_id}"
        ))
    }
}

/// One kind per user-triggerable long-running action; at most one of each
/// kind may be outstanding at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Upload,
    Scrape,
    Call,
    BulkCall,
    RefreshCarriers,
    RefreshCallLogs,
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Upload => "upload",
            ActionKind::Scrape => "scrape",
            ActionKind::Call => "call",
            ActionKind::BulkCall => "bulk call",
            ActionKind::RefreshCarriers => "carrier refresh",
            ActionKind::RefreshCallLogs => "call log refresh",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("another {0} is already in progress")]
    Busy(ActionKind),
    #[error("{0}")]
    Service(String),
}

#[derive(Debug, Clone)]
pub enum EngineEvent {
    CarriersReplaced { count: usize },
    CallLogsReplaced { count: usize },
    CallLogged { entry: CallLogEntry },
    BulkCompleted { success_count: usize, error_count: usize },
    Error(String),
}

#[derive(Debug, Clone)]
pub struct UploadOutcome {
    pub uploaded_count: usize,
    pub message: String,
    pub carriers_loaded: usize,
}

#[derive(Debug, Clone)]
pub struct CallOutcome {
    pub status: CallStatus,
    pub message: Option<String>,
    pub hook: Option<String>,
    pub voicemail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BulkOutcome {
    pub envelope: BatchStatus,
    pub summary: BulkSummary,
    pub per_item: Vec<BulkItemResult>,
}

#[derive(Debug, Clone, Copy)]
pub struct RefreshOutcome {
    pub count: usize,
    /// False when the response arrived after the store had already been
    /// replaced and was dropped as stale.
    pub applied: bool,
}

#[derive(Debug, Clone)]
pub struct ScrapeOutcome {
    pub message: String,
}

struct SessionState {
    carriers: Vec<CarrierRecord>,
    call_logs: Vec<CallLogEntry>,
    carrier_generation: u64,
    log_generation: u64,
    carrier_selection: SelectionSet,
    log_selection: SelectionSet,
    inflight: HashSet<ActionKind>,
}

/// Owned session context for one console session. All state lives here; the
/// carrier store and call log are only ever mutated through the engine's own
/// update paths.
pub struct ConsoleEngine {
    service: Arc<dyn DialerService>,
    inner: Mutex<SessionState>,
    events: broadcast::Sender<EngineEvent>,
}

impl ConsoleEngine {
    pub fn new(service: Arc<dyn DialerService>) -> Arc<Self> {
        let (events, _) = broadcast::channel(256);
        Arc::new(Self {
            service,
            inner: Mutex::new(SessionState {
                carriers: Vec::new(),
                call_logs: Vec::new(),
                carrier_generation: 0,
                log_generation: 0,
                carrier_selection: SelectionSet::default(),
                log_selection: SelectionSet::default(),
                inflight: HashSet::new(),
            }),
            events,
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Arc<Self>> {
        let service = HttpDialerService::new(
            settings.api_base_url.clone(),
            Duration::from_secs(settings.request_timeout_secs),
        )?;
        Ok(Self::new(Arc::new(service)))
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    /// Read-through population of both stores at session start.
    pub async fn initialize(&self) -> Result<(), EngineError> {
        self.refresh_carriers().await?;
        self.refresh_call_logs().await?;
        Ok(())
    }

    // ---- single-flight guard ----

    async fn begin(&self, kind: ActionKind) -> Result<(), EngineError> {
        let mut guard = self.inner.lock().await;
        if !guard.inflight.insert(kind) {
            return Err(EngineError::Busy(kind));
        }
        Ok(())
    }

    async fn finish(&self, kind: ActionKind) {
        self.inner.lock().await.inflight.remove(&kind);
    }

    fn service_failure(&self, what: &str, err: anyhow::Error) -> EngineError {
        let message = format!("{what}: {err:#}");
        warn!("{message}");
        let _ = self.events.send(EngineEvent::Error(message.clone()));
        EngineError::Service(message)
    }

    // ---- store refresh ----

    pub async fn refresh_carriers(&self) -> Result<RefreshOutcome, EngineError> {
        self.begin(ActionKind::RefreshCarriers).await?;
        let result = self.refresh_carriers_inner().await;
        self.finish(ActionKind::RefreshCarriers).await;
        result
    }

    async fn refresh_carriers_inner(&self) -> Result<RefreshOutcome, EngineError> {
        let started = self.inner.lock().await.carrier_generation;
        let carriers = self
            .service
            .list_carriers()
            .await
            .map_err(|err| self.service_failure("failed to load carriers", err))?;

        let count = carriers.len();
        {
            let mut guard = self.inner.lock().await;
            if guard.carrier_generation != started {
                debug!("dropping stale carrier list response");
                return Ok(RefreshOutcome {
                    count,
                    applied: false,
                });
            }
            guard.carriers = carriers;
            guard.carrier_generation += 1;
            guard.carrier_selection.clear();
        }
        let _ = self.events.send(EngineEvent::CarriersReplaced { count });
        Ok(RefreshOutcome {
            count,
            applied: true,
        })
    }

    pub async fn refresh_call_logs(&self) -> Result<RefreshOutcome, EngineError> {
        self.begin(ActionKind::RefreshCallLogs).await?;
        let result = self.refresh_call_logs_inner().await;
        self.finish(ActionKind::RefreshCallLogs).await;
        result
    }

    async fn refresh_call_logs_inner(&self) -> Result<RefreshOutcome, EngineError> {
        let started = self.inner.lock().await.log_generation;
        let logs = self
            .service
            .list_call_logs()
            .await
            .map_err(|err| self.service_failure("failed to load call logs", err))?;

        let count = logs.len();
        {
            let mut guard = self.inner.lock().await;
            if guard.log_generation != started {
                debug!("dropping stale call log response");
                return Ok(RefreshOutcome {
                    count,
                    applied: false,
                });
            }
            guard.call_logs = logs;
            guard.log_generation += 1;
            guard.log_selection.clear();
        }
        let _ = self.events.send(EngineEvent::CallLogsReplaced { count });
        Ok(RefreshOutcome {
            count,
            applied: true,
        })
    }

    // ---- upload & scrape ----

    pub async fn upload_carriers(
        &self,
        file_name: &str,
        csv_text: &str,
    ) -> Result<UploadOutcome, EngineError> {
        if !file_name.to_ascii_lowercase().ends_with(".csv") {
            return Err(EngineError::Validation(
                "please upload a CSV file".to_string(),
            ));
        }
        let import = ingest::parse_carriers(csv_text)
            .map_err(|err| EngineError::Validation(err.to_string()))?;
        if import.records.is_empty() {
            return Err(EngineError::Validation(
                "CSV contains no carrier rows".to_string(),
            ));
        }
        if import.skipped_rows > 0 {
            warn!(
                skipped = import.skipped_rows,
                "CSV rows without an MC number will be ignored by the import"
            );
        }

        self.begin(ActionKind::Upload).await?;
        let result = self.upload_inner(file_name, csv_text).await;
        self.finish(ActionKind::Upload).await;
        result
    }

    async fn upload_inner(
        &self,
        file_name: &str,
        csv_text: &str,
    ) -> Result<UploadOutcome, EngineError> {
        let response = self
            .service
            .upload_carriers(file_name, csv_text)
            .await
            .map_err(|err| self.service_failure("CSV upload failed", err))?;

        // The service is the system of record: replace the working copy from
        // what it now holds rather than from the local parse.
        let carriers = self
            .service
            .list_carriers()
            .await
            .map_err(|err| self.service_failure("upload succeeded but carrier refresh failed", err))?;

        let carriers_loaded = carriers.len();
        {
            let mut guard = self.inner.lock().await;
            guard.carriers = carriers;
            guard.carrier_generation += 1;
            guard.carrier_selection.clear();
        }
        let _ = self.events.send(EngineEvent::CarriersReplaced {
            count: carriers_loaded,
        });
        info!(count = response.count, file = file_name, "carrier CSV uploaded");

        Ok(UploadOutcome {
            uploaded_count: response.count,
            message: response
                .message
                .unwrap_or_else(|| format!("Uploaded {file_name} successfully")),
            carriers_loaded,
        })
    }

    /// Fire-and-forget: the scrape runs remotely and a later carrier refresh
    /// is required to observe its output.
    pub async fn scrape_range(
        &self,
        start_id: u64,
        end_id: u64,
    ) -> Result<ScrapeOutcome, EngineError> {
        if start_id > end_id {
            return Err(EngineError::Validation(
                "starting MC number must not exceed ending MC number".to_string(),
            ));
        }
        self.begin(ActionKind::Scrape).await?;
        let result = self.scrape_inner(start_id, end_id).await;
        self.finish(ActionKind::Scrape).await;
        result
    }

    async fn scrape_inner(&self, start_id: u64, end_id: u64) -> Result<ScrapeOutcome, EngineError> {
        let response = self
            .service
            .scrape_range(start_id, end_id)
            .await
            .map_err(|err| self.service_failure("scrape request failed", err))?;
        info!(start_id, end_id, "scrape initiated");
        Ok(ScrapeOutcome {
            message: response.message,
        })
    }

    // ---- calling ----

    pub async fn place_call(
        &self,
        phone_number: PhoneNumber,
        mc_number: McNumber,
    ) -> Result<CallOutcome, EngineError> {
        if !phone_number.is_dialable() {
            return Err(EngineError::Validation(format!(
                "no phone number available for carrier {mc_number}"
            )));
        }
        self.begin(ActionKind::Call).await?;
        let result = self.place_call_inner(phone_number, mc_number).await;
        self.finish(ActionKind::Call).await;
        result
    }

    /// Call a number straight from the call log, reusing the carrier recorded
    /// at first contact.
    pub async fn recall(&self, log_entry_id: &str) -> Result<CallOutcome, EngineError> {
        let entry = {
            let guard = self.inner.lock().await;
            guard
                .call_logs
                .iter()
                .find(|entry| entry.id.as_str() == log_entry_id)
                .cloned()
        };
        let Some(entry) = entry else {
            return Err(EngineError::Validation(format!(
                "unknown call log entry '{log_entry_id}'"
            )));
        };
        self.place_call(entry.phone_number, entry.carrier_name).await
    }

    async fn place_call_inner(
        &self,
        phone_number: PhoneNumber,
        mc_number: McNumber,
    ) -> Result<CallOutcome, EngineError> {
        let state = {
            let guard = self.inner.lock().await;
            guard
                .carriers
                .iter()
                .find(|carrier| carrier.mc_number == mc_number)
                .map(|carrier| carrier.state.clone())
                .unwrap_or_default()
        };

        let response = self
            .service
            .place_call(PlaceCallRequest {
                phone_number: phone_number.clone(),
                mc_number: mc_number.clone(),
                state,
            })
            .await
            .map_err(|err| self.service_failure("call failed", err))?;

        if response.status == CallStatus::Success {
            self.fold_call_success(&phone_number, &mc_number).await;
        }

        Ok(CallOutcome {
            status: response.status,
            message: response.message,
            hook: response.hook,
            voicemail: response.voicemail,
        })
    }

    /// Apply one confirmed call to the log and tell the service about it.
    /// The remote notification is best-effort; the local fold already
    /// reflects a call the service reported as placed.
    async fn fold_call_success(&self, phone_number: &PhoneNumber, mc_number: &McNumber) {
        let entry = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            state.call_logs =
                call_log::record_call(&state.call_logs, phone_number, mc_number, Utc::now());
            state
                .call_logs
                .iter()
                .find(|entry| &entry.phone_number == phone_number)
                .cloned()
        };
        if let Some(entry) = entry {
            let _ = self.events.send(EngineEvent::CallLogged { entry });
        }

        let request = LogCallRequest {
            phone_number: phone_number.clone(),
            mc_number: mc_number.clone(),
        };
        if let Err(err) = self.service.log_call(request).await {
            warn!(
                phone = %phone_number,
                "failed to notify dialer service of call event: {err:#}"
            );
        }
    }

    // ---- bulk orchestration ----

    pub async fn bulk_call_selected_carriers(&self) -> Result<BulkOutcome, EngineError> {
        self.begin(ActionKind::BulkCall).await?;
        let result = self.bulk_carriers_inner().await;
        self.finish(ActionKind::BulkCall).await;
        result
    }

    pub async fn bulk_recall_selected_logs(&self) -> Result<BulkOutcome, EngineError> {
        self.begin(ActionKind::BulkCall).await?;
        let result = self.bulk_recall_inner().await;
        self.finish(ActionKind::BulkCall).await;
        result
    }

    async fn bulk_carriers_inner(&self) -> Result<BulkOutcome, EngineError> {
        let items = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let items =
                bulk::build_items(|id| state.carrier_selection.contains(id), &state.carriers);
            // Clear-on-submit: the selection empties the moment the batch is
            // handed off, not when it completes.
            state.carrier_selection.clear();
            items
        };
        self.submit_bulk(items).await
    }

    async fn bulk_recall_inner(&self) -> Result<BulkOutcome, EngineError> {
        let items = {
            let mut guard = self.inner.lock().await;
            let state = &mut *guard;
            let items = bulk::recall_items(|id| state.log_selection.contains(id), &state.call_logs);
            state.log_selection.clear();
            items
        };
        self.submit_bulk(items).await
    }

    async fn submit_bulk(&self, items: Vec<BulkCallItem>) -> Result<BulkOutcome, EngineError> {
        if items.is_empty() {
            return Err(EngineError::Validation(
                "no valid items selected for bulk call".to_string(),
            ));
        }

        let response = self
            .service
            .place_bulk_calls(items)
            .await
            .map_err(|err| self.service_failure("bulk call failed", err))?;

        // Fold successes in the order the service reported them, so the same
        // phone number listed twice gets two increments.
        for result in &response.results {
            if result.status == CallStatus::Success {
                self.fold_call_success(&result.item.phone_number, &result.item.mc_number)
                    .await;
            }
        }

        let summary = bulk::summarize(&response.results);
        info!(
            success = summary.success_count,
            error = summary.error_count,
            "bulk call completed"
        );
        let _ = self.events.send(EngineEvent::BulkCompleted {
            success_count: summary.success_count,
            error_count: summary.error_count,
        });

        Ok(BulkOutcome {
            envelope: response.status,
            summary,
            per_item: response.results,
        })
    }

    // ---- selection commands ----

    pub async fn select_all_carriers(&self, visible_ids: Vec<String>) {
        self.inner
            .lock()
            .await
            .carrier_selection
            .select_all(visible_ids);
    }

    pub async fn toggle_carrier(&self, mc_number: &str, on: bool) {
        self.inner.lock().await.carrier_selection.toggle(mc_number, on);
    }

    pub async fn clear_carrier_selection(&self) {
        self.inner.lock().await.carrier_selection.clear();
    }

    /// Prune the selection after the visible row set changed structurally.
    pub async fn retain_visible_carriers(&self, visible_ids: &[String]) {
        self.inner
            .lock()
            .await
            .carrier_selection
            .retain_visible(visible_ids.iter().map(String::as_str));
    }

    pub async fn selected_carriers(&self) -> Vec<String> {
        let guard = self.inner.lock().await;
        guard.carrier_selection.ids().map(str::to_string).collect()
    }

    pub async fn select_all_logs(&self, visible_ids: Vec<String>) {
        self.inner.lock().await.log_selection.select_all(visible_ids);
    }

    pub async fn toggle_log(&self, log_entry_id: &str, on: bool) {
        self.inner.lock().await.log_selection.toggle(log_entry_id, on);
    }

    pub async fn clear_log_selection(&self) {
        self.inner.lock().await.log_selection.clear();
    }

    pub async fn selected_logs(&self) -> Vec<String> {
        let guard = self.inner.lock().await;
        guard.log_selection.ids().map(str::to_string).collect()
    }

    // ---- snapshots for the view layer ----

    pub async fn carriers(&self) -> Vec<CarrierRecord> {
        self.inner.lock().await.carriers.clone()
    }

    pub async fn filtered_carriers(&self, filters: &FilterSet) -> Vec<CarrierRecord> {
        let guard = self.inner.lock().await;
        filter::apply(&guard.carriers, filters)
    }

    pub async fn distinct_states(&self) -> Vec<String> {
        let guard = self.inner.lock().await;
        filter::distinct_states(&guard.carriers)
    }

    pub async fn call_logs(&self) -> Vec<CallLogEntry> {
        self.inner.lock().await.call_logs.clone()
    }

    pub async fn call_logs_for_display(&self) -> Vec<CallLogEntry> {
        let guard = self.inner.lock().await;
        call_log::sorted_for_display(&guard.call_logs)
    }

    pub async fn total_calls(&self) -> u64 {
        let guard = self.inner.lock().await;
        call_log::total_calls(&guard.call_logs)
    }
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;

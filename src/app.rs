use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::AppError;
use crate::event::Event;
use crate::http::builder::{CompiledRequest, compile};
use crate::http::executor::{HttpTransport, RawResponse, execute};
use crate::http::history::{HistoryEntry, HistorySink, record_in_background};
use crate::state::app_state::AppState;
use crate::state::request_state::RequestData;
use crate::state::response_state::ResponseData;
use crate::state::workspace::{CloseOutcome, RequestStatus};
use crate::storage::workspace::CollectionStore;

struct InFlight {
    send_id: u64,
    cancel: CancellationToken,
}

pub struct App {
    pub state: AppState,
    /// Record history after successful sends. Only set for an
    /// authenticated, non-anonymous session.
    pub record_history: bool,
    transport: Arc<dyn HttpTransport>,
    history: Arc<dyn HistorySink>,
    tx: UnboundedSender<Event>,
    in_flight: HashMap<String, InFlight>,
    next_send_id: u64,
    pending_history: Vec<JoinHandle<()>>,
}

impl App {
    pub fn new(
        state: AppState,
        transport: Arc<dyn HttpTransport>,
        history: Arc<dyn HistorySink>,
        tx: UnboundedSender<Event>,
    ) -> Self {
        Self {
            state,
            record_history: false,
            transport,
            history,
            tx,
            in_flight: HashMap::new(),
            next_send_id: 0,
            pending_history: Vec::new(),
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Response {
                tab_id,
                send_id,
                request,
                result,
            } => self.handle_response(&tab_id, send_id, &request, result),
        }
    }

    /// Compile the active tab against the active environment, as it would be sent.
    pub fn compile_active(&self) -> Option<CompiledRequest> {
        let tab = self.state.tabs.active()?;
        Some(compile(tab.request(), self.state.active_environment()))
    }

    pub fn send_active_tab(&mut self) -> Result<(), AppError> {
        let tab_id = self
            .state
            .tabs
            .active_id()
            .ok_or_else(|| AppError::validation("No open tab"))?
            .to_string();
        self.send_tab(&tab_id)
    }

    /// Start sending a tab's request. Environment values are read now; edits
    /// made while the request is in flight do not affect it.
    pub fn send_tab(&mut self, tab_id: &str) -> Result<(), AppError> {
        let env = self.state.active_environment().cloned();
        let tab = self
            .state
            .tabs
            .get_mut(tab_id)
            .ok_or_else(|| AppError::validation(format!("Unknown tab: {tab_id}")))?;

        if tab.is_loading() {
            return Err(AppError::validation("A request is already in flight for this tab"));
        }
        if tab.request().url.trim().is_empty() {
            return Err(AppError::validation("URL is empty"));
        }

        let compiled = compile(tab.request(), env.as_ref());
        tab.status = RequestStatus::Loading;
        tab.set_response(None);

        self.next_send_id += 1;
        let send_id = self.next_send_id;
        let cancel = CancellationToken::new();
        self.in_flight.insert(
            tab_id.to_string(),
            InFlight {
                send_id,
                cancel: cancel.clone(),
            },
        );

        info!(tab = tab_id, method = compiled.method.as_str(), url = %compiled.url, "send");

        let transport = Arc::clone(&self.transport);
        let tx = self.tx.clone();
        let tab_id = tab_id.to_string();
        tokio::spawn(async move {
            execute(transport, tab_id, send_id, compiled, tx, cancel).await;
        });
        Ok(())
    }

    /// Cancel an in-flight send. Returns `false` if nothing was pending.
    pub fn cancel_tab(&mut self, tab_id: &str) -> bool {
        let Some(flight) = self.in_flight.remove(tab_id) else {
            return false;
        };
        flight.cancel.cancel();
        if let Some(tab) = self.state.tabs.get_mut(tab_id) {
            tab.status = RequestStatus::Idle;
        }
        true
    }

    /// Close a tab. An in-flight send is left running; its result is dropped.
    pub fn close_tab(&mut self, tab_id: &str, confirmed: bool) -> CloseOutcome {
        let outcome = self.state.tabs.close(tab_id, confirmed);
        if outcome == CloseOutcome::Closed {
            self.in_flight.remove(tab_id);
        }
        outcome
    }

    fn handle_response(
        &mut self,
        tab_id: &str,
        send_id: u64,
        request: &CompiledRequest,
        result: Result<RawResponse, AppError>,
    ) {
        if self.in_flight.get(tab_id).map(|f| f.send_id) != Some(send_id) {
            debug!(tab = tab_id, send_id, "discarding result of a superseded or closed send");
            return;
        }
        self.in_flight.remove(tab_id);
        let Some(tab) = self.state.tabs.get_mut(tab_id) else {
            debug!(tab = tab_id, "discarding result for closed tab");
            return;
        };

        match result {
            Ok(raw) => {
                let response = ResponseData::capture(
                    raw.status,
                    raw.status_text,
                    raw.headers,
                    &raw.body_text,
                    raw.elapsed_ms,
                );
                info!(
                    tab = tab_id,
                    status = response.status(),
                    time_ms = response.time_ms(),
                    size = response.size(),
                    "response"
                );
                if self.record_history {
                    let entry = HistoryEntry::from_exchange(request, &response);
                    self.pending_history.retain(|h| !h.is_finished());
                    self.pending_history
                        .push(record_in_background(Arc::clone(&self.history), entry));
                }
                tab.set_response(Some(response));
                tab.status = RequestStatus::Idle;
            }
            Err(AppError::Cancelled) => {
                tab.status = RequestStatus::Idle;
            }
            Err(e) => {
                warn!(tab = tab_id, error = %e, "send failed");
                tab.set_response(None);
                tab.status = RequestStatus::Error(e.user_message());
            }
        }
    }

    /// History writes started and not yet reaped.
    pub fn pending_history(&self) -> usize {
        self.pending_history.len()
    }

    /// Wait for background history writes started so far.
    pub async fn flush_history(&mut self) {
        for handle in self.pending_history.drain(..) {
            let _ = handle.await;
        }
    }

    /// Open a saved request from a collection in a new tab.
    pub fn open_saved(&mut self, collection: &str, request: &str) -> Result<String, AppError> {
        let col = self
            .state
            .find_collection(collection)
            .ok_or_else(|| AppError::validation(format!("Unknown collection: {collection}")))?;
        let saved = col
            .find_request(request)
            .ok_or_else(|| AppError::validation(format!("Unknown request: {request}")))?
            .clone();
        let collection_id = col.id.clone();
        Ok(self.state.tabs.open_saved(saved, Some(collection_id)))
    }

    /// Save the active tab into a collection and mark it clean.
    pub fn save_active_tab(
        &mut self,
        name: &str,
        collection_id: &str,
        store: &mut dyn CollectionStore,
    ) -> Result<RequestData, AppError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("Request name is required"));
        }
        if collection_id.is_empty() {
            return Err(AppError::validation("Collection is required"));
        }
        let request = self
            .state
            .tabs
            .active()
            .ok_or_else(|| AppError::validation("No open tab"))?
            .request()
            .clone();

        let saved = store.save_request(name, collection_id, request)?;

        if let Some(tab) = self.state.tabs.active_mut() {
            tab.edit(|r| {
                r.id = saved.id.clone();
                r.name = saved.name.clone();
            });
            tab.collection_id = Some(collection_id.to_string());
            tab.mark_saved();
        }
        self.state.collections = store.load_collections()?;
        Ok(saved)
    }
}

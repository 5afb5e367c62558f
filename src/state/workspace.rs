use uuid::Uuid;

use crate::state::request_state::RequestData;
use crate::state::response_state::ResponseData;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum RequestStatus {
    #[default]
    Idle,
    Loading,
    Error(String),
}

/// Save state of a tab relative to its last-saved snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TabState {
    /// Never saved; there is nothing to diff against.
    New,
    Clean,
    Dirty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    NeedsConfirmation,
    RejectedLastTab,
    NotFound,
}

/// One open request tab (in-memory only).
#[derive(Debug, Clone)]
pub struct RequestTab {
    pub id: String,
    pub name: String,
    pub status: RequestStatus,
    pub collection_id: Option<String>,
    request: RequestData,
    response: Option<ResponseData>,
    original_request: Option<RequestData>,
    has_unsaved_changes: bool,
}

impl Default for RequestTab {
    fn default() -> Self {
        Self::with_request(RequestData::default(), None)
    }
}

impl RequestTab {
    fn with_request(request: RequestData, original: Option<RequestData>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: request.name.clone(),
            status: RequestStatus::Idle,
            collection_id: None,
            request,
            response: None,
            original_request: original,
            has_unsaved_changes: false,
        }
    }

    /// Open a saved request; the tab starts clean.
    pub fn from_saved(request: RequestData, collection_id: Option<String>) -> Self {
        let original = request.clone();
        let mut tab = Self::with_request(request, Some(original));
        tab.collection_id = collection_id;
        tab
    }

    pub fn request(&self) -> &RequestData {
        &self.request
    }

    pub fn original_request(&self) -> Option<&RequestData> {
        self.original_request.as_ref()
    }

    pub fn response(&self) -> Option<&ResponseData> {
        self.response.as_ref()
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.has_unsaved_changes
    }

    pub fn is_loading(&self) -> bool {
        self.status == RequestStatus::Loading
    }

    pub fn state(&self) -> TabState {
        match (&self.original_request, self.has_unsaved_changes) {
            (None, _) => TabState::New,
            (Some(_), false) => TabState::Clean,
            (Some(_), true) => TabState::Dirty,
        }
    }

    /// Apply an edit to the request and recompute the unsaved-changes flag.
    pub fn edit<F>(&mut self, f: F)
    where
        F: FnOnce(&mut RequestData),
    {
        f(&mut self.request);
        self.name = self.request.name.clone();
        self.refresh_dirty();
    }

    fn refresh_dirty(&mut self) {
        self.has_unsaved_changes = match &self.original_request {
            Some(original) => *original != self.request,
            None => false,
        };
    }

    /// The current request becomes the saved snapshot.
    pub fn mark_saved(&mut self) {
        self.original_request = Some(self.request.clone());
        self.name = self.request.name.clone();
        self.has_unsaved_changes = false;
    }

    /// Revert to the saved snapshot. Returns `false` for a never-saved tab.
    pub fn discard_changes(&mut self) -> bool {
        let Some(original) = &self.original_request else {
            return false;
        };
        self.request = original.clone();
        self.name = self.request.name.clone();
        self.has_unsaved_changes = false;
        true
    }

    /// Replace the response wholesale.
    pub fn set_response(&mut self, response: Option<ResponseData>) {
        self.response = response;
    }
}

/// The set of open tabs and which one is active. Never empty.
#[derive(Debug, Clone)]
pub struct TabTracker {
    tabs: Vec<RequestTab>,
    active_idx: usize,
}

impl Default for TabTracker {
    fn default() -> Self {
        Self {
            tabs: vec![RequestTab::default()],
            active_idx: 0,
        }
    }
}

impl TabTracker {
    pub fn tabs(&self) -> &[RequestTab] {
        &self.tabs
    }

    pub fn len(&self) -> usize {
        self.tabs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn active(&self) -> Option<&RequestTab> {
        self.tabs.get(self.active_idx)
    }

    pub fn active_mut(&mut self) -> Option<&mut RequestTab> {
        self.tabs.get_mut(self.active_idx)
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active().map(|t| t.id.as_str())
    }

    pub fn get(&self, tab_id: &str) -> Option<&RequestTab> {
        self.tabs.iter().find(|t| t.id == tab_id)
    }

    pub fn get_mut(&mut self, tab_id: &str) -> Option<&mut RequestTab> {
        self.tabs.iter_mut().find(|t| t.id == tab_id)
    }

    pub fn contains(&self, tab_id: &str) -> bool {
        self.get(tab_id).is_some()
    }

    fn push_active(&mut self, tab: RequestTab) -> String {
        let id = tab.id.clone();
        self.tabs.push(tab);
        self.active_idx = self.tabs.len() - 1;
        id
    }

    /// Open a blank tab and make it active.
    pub fn open_new(&mut self) -> String {
        self.push_active(RequestTab::default())
    }

    /// Open a saved request in a new, clean tab and make it active.
    pub fn open_saved(&mut self, request: RequestData, collection_id: Option<String>) -> String {
        self.push_active(RequestTab::from_saved(request, collection_id))
    }

    /// Copy a tab's request into a new unsaved tab.
    pub fn duplicate(&mut self, tab_id: &str) -> Option<String> {
        let source = self.get(tab_id)?;
        let mut request = source.request.clone();
        request.id.clear();
        request.name = format!("{} Copy", request.name);
        Some(self.push_active(RequestTab::with_request(request, None)))
    }

    pub fn switch_to(&mut self, tab_id: &str) -> bool {
        match self.tabs.iter().position(|t| t.id == tab_id) {
            Some(idx) => {
                self.active_idx = idx;
                true
            }
            None => false,
        }
    }

    /// Edit a tab's request. Returns `false` if the tab does not exist.
    pub fn update_request<F>(&mut self, tab_id: &str, f: F) -> bool
    where
        F: FnOnce(&mut RequestData),
    {
        match self.get_mut(tab_id) {
            Some(tab) => {
                tab.edit(f);
                true
            }
            None => false,
        }
    }

    /// Close a tab. A dirty tab needs `confirmed`; the last tab never closes.
    /// Closing the active tab activates the first remaining tab.
    pub fn close(&mut self, tab_id: &str, confirmed: bool) -> CloseOutcome {
        let Some(idx) = self.tabs.iter().position(|t| t.id == tab_id) else {
            return CloseOutcome::NotFound;
        };
        if self.tabs.len() == 1 {
            return CloseOutcome::RejectedLastTab;
        }
        if self.tabs[idx].has_unsaved_changes && !confirmed {
            return CloseOutcome::NeedsConfirmation;
        }

        self.tabs.remove(idx);
        if idx == self.active_idx {
            self.active_idx = 0;
        } else if idx < self.active_idx {
            self.active_idx -= 1;
        }
        CloseOutcome::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::request_state::{Header, HttpMethod};

    fn saved_request() -> RequestData {
        RequestData {
            id: "req-1".into(),
            name: "List users".into(),
            ..RequestData::new(HttpMethod::Get, "{{baseUrl}}/users")
        }
    }

    #[test]
    fn test_new_tracker_has_one_new_tab() {
        let tracker = TabTracker::default();
        assert_eq!(tracker.len(), 1);
        let tab = tracker.active().unwrap();
        assert_eq!(tab.state(), TabState::New);
        assert_eq!(*tab.request(), RequestData::default());
    }

    #[test]
    fn test_new_tab_never_dirty() {
        let mut tab = RequestTab::default();
        tab.edit(|r| r.url = "https://example.com".into());
        assert!(!tab.has_unsaved_changes());
        assert_eq!(tab.state(), TabState::New);
    }

    #[test]
    fn test_saved_tab_diffing() {
        let mut tab = RequestTab::from_saved(saved_request(), None);
        assert!(!tab.has_unsaved_changes());
        assert_eq!(tab.state(), TabState::Clean);

        tab.edit(|r| r.headers.push(Header::new("Accept", "application/json")));
        assert!(tab.has_unsaved_changes());
        assert_eq!(tab.state(), TabState::Dirty);

        tab.mark_saved();
        assert!(!tab.has_unsaved_changes());
        assert_eq!(tab.state(), TabState::Clean);
    }

    #[test]
    fn test_edit_back_to_original_is_clean() {
        let mut tab = RequestTab::from_saved(saved_request(), None);
        tab.edit(|r| r.method = HttpMethod::Post);
        tab.edit(|r| r.method = HttpMethod::Get);
        assert_eq!(tab.state(), TabState::Clean);
    }

    #[test]
    fn test_discard_changes() {
        let mut tab = RequestTab::from_saved(saved_request(), None);
        tab.edit(|r| r.url = "changed".into());
        assert!(tab.discard_changes());
        assert_eq!(tab.request().url, "{{baseUrl}}/users");
        assert_eq!(tab.state(), TabState::Clean);
        assert!(!RequestTab::default().discard_changes());
    }

    #[test]
    fn test_first_save_moves_new_to_clean() {
        let mut tab = RequestTab::default();
        tab.mark_saved();
        assert_eq!(tab.state(), TabState::Clean);
        assert_eq!(tab.original_request(), Some(tab.request()));
    }

    #[test]
    fn test_close_last_tab_rejected() {
        let mut tracker = TabTracker::default();
        let id = tracker.active_id().unwrap().to_string();
        assert_eq!(tracker.close(&id, true), CloseOutcome::RejectedLastTab);
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_close_dirty_needs_confirmation() {
        let mut tracker = TabTracker::default();
        let id = tracker.open_saved(saved_request(), None);
        tracker.update_request(&id, |r| r.body = "{}".into());
        assert_eq!(tracker.close(&id, false), CloseOutcome::NeedsConfirmation);
        assert!(tracker.contains(&id));
        assert_eq!(tracker.close(&id, true), CloseOutcome::Closed);
        assert!(!tracker.contains(&id));
    }

    #[test]
    fn test_close_active_selects_first_remaining() {
        let mut tracker = TabTracker::default();
        let first = tracker.active_id().unwrap().to_string();
        tracker.open_new();
        let third = tracker.open_new();
        assert_eq!(tracker.active_id(), Some(third.as_str()));
        assert_eq!(tracker.close(&third, false), CloseOutcome::Closed);
        assert_eq!(tracker.active_id(), Some(first.as_str()));
    }

    #[test]
    fn test_close_before_active_keeps_active() {
        let mut tracker = TabTracker::default();
        let first = tracker.active_id().unwrap().to_string();
        let second = tracker.open_new();
        tracker.close(&first, false);
        assert_eq!(tracker.active_id(), Some(second.as_str()));
    }

    #[test]
    fn test_close_unknown() {
        let mut tracker = TabTracker::default();
        assert_eq!(tracker.close("nope", true), CloseOutcome::NotFound);
    }

    #[test]
    fn test_duplicate_starts_new() {
        let mut tracker = TabTracker::default();
        let id = tracker.open_saved(saved_request(), Some("col".into()));
        let dup = tracker.duplicate(&id).unwrap();
        let tab = tracker.get(&dup).unwrap();
        assert_eq!(tab.state(), TabState::New);
        assert!(tab.request().id.is_empty());
        assert_eq!(tab.request().url, "{{baseUrl}}/users");
        assert_eq!(tracker.active_id(), Some(dup.as_str()));
    }

    #[test]
    fn test_switch_to() {
        let mut tracker = TabTracker::default();
        let first = tracker.active_id().unwrap().to_string();
        tracker.open_new();
        assert!(tracker.switch_to(&first));
        assert_eq!(tracker.active_id(), Some(first.as_str()));
        assert!(!tracker.switch_to("missing"));
    }
}

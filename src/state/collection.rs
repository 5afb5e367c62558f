use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::request_state::RequestData;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub requests: Vec<RequestData>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            requests: Vec::new(),
        }
    }

    /// Find a saved request by id, falling back to its display name.
    pub fn find_request(&self, id_or_name: &str) -> Option<&RequestData> {
        self.requests
            .iter()
            .find(|r| !r.id.is_empty() && r.id == id_or_name)
            .or_else(|| self.requests.iter().find(|r| r.name == id_or_name))
    }

    /// Replace the saved request with the same id, or append it.
    pub fn upsert_request(&mut self, request: RequestData) {
        match self.requests.iter_mut().find(|r| r.id == request.id) {
            Some(slot) => *slot = request,
            None => self.requests.push(request),
        }
    }

    /// Drop the saved request with `id`. Returns whether one was removed.
    pub fn remove_request(&mut self, id: &str) -> bool {
        let before = self.requests.len();
        self.requests.retain(|r| r.id != id);
        self.requests.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::request_state::HttpMethod;

    fn saved(id: &str, name: &str) -> RequestData {
        RequestData {
            id: id.into(),
            name: name.into(),
            ..RequestData::new(HttpMethod::Get, "/")
        }
    }

    #[test]
    fn test_find_by_id_then_name() {
        let mut col = Collection::new("Users");
        col.requests.push(saved("1", "List users"));
        col.requests.push(saved("2", "1"));
        assert_eq!(col.find_request("1").map(|r| r.name.as_str()), Some("List users"));
        assert_eq!(col.find_request("List users").map(|r| r.id.as_str()), Some("1"));
        assert!(col.find_request("missing").is_none());
    }

    #[test]
    fn test_upsert_replaces_same_id() {
        let mut col = Collection::new("Users");
        col.upsert_request(saved("1", "a"));
        col.upsert_request(saved("1", "b"));
        col.upsert_request(saved("2", "c"));
        assert_eq!(col.requests.len(), 2);
        assert_eq!(col.requests[0].name, "b");
    }

    #[test]
    fn test_remove_request() {
        let mut col = Collection::new("Users");
        col.upsert_request(saved("1", "a"));
        assert!(col.remove_request("1"));
        assert!(!col.remove_request("1"));
        assert!(col.requests.is_empty());
    }
}

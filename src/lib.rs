//! Request composition engine for an API client.
//!
//! A request template ([`state::request_state::RequestData`]) is compiled
//! against the active [`state::environment::Environment`] into a
//! transport-ready [`http::builder::CompiledRequest`]. Results come back as
//! immutable [`state::response_state::ResponseData`] attached to a tab.

pub mod app;
pub mod config;
pub mod env;
pub mod error;
pub mod event;
pub mod http;
pub mod state;
pub mod storage;

pub mod app_state;
pub mod collection;
pub mod environment;
pub mod request_state;
pub mod response_state;
pub mod workspace;

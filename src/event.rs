use crate::error::AppError;
use crate::http::builder::CompiledRequest;
use crate::http::executor::RawResponse;

#[derive(Debug)]
pub enum Event {
    /// A send finished (or failed) for `tab_id`. `send_id` identifies which
    /// send, so results from a superseded send can be dropped.
    Response {
        tab_id: String,
        send_id: u64,
        request: CompiledRequest,
        result: Result<RawResponse, AppError>,
    },
}

use reqwest::{Client, redirect::Policy};
use std::time::Duration;

use crate::config::NetworkSettings;
use crate::error::AppError;

pub fn build_client(settings: &NetworkSettings) -> Result<Client, AppError> {
    let redirect = if settings.follow_redirects {
        Policy::limited(settings.max_redirects)
    } else {
        Policy::none()
    };

    let client = Client::builder()
        .timeout(Duration::from_millis(settings.timeout_ms))
        .redirect(redirect)
        .danger_accept_invalid_certs(!settings.validate_ssl)
        .user_agent(settings.user_agent.as_str())
        .use_rustls_tls()
        .build()?;
    Ok(client)
}

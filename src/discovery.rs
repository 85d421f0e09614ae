use crate::errors::DiscoveryError;
use crate::models::Subject;
use crate::multiplexer::SubjectSource;
use reqwest::{Client, header, redirect};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Lists sensors through the backend's `GET /api/sensors`.
#[derive(Clone)]
pub struct HttpSubjectSource {
    client: Client,
    url: String,
    session_id: Option<String>,
}

impl HttpSubjectSource {
    pub fn new(backend_url: &str, session_id: Option<String>) -> Self {
        // Unauthenticated requests are redirected to the login page; following
        // that would turn a rejected session into an HTML decode error.
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(redirect::Policy::none())
            .build()
            .unwrap_or_default();

        Self {
            client,
            url: format!("{}/api/sensors", backend_url.trim_end_matches('/')),
            session_id,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn fetch(&self) -> Result<Vec<Subject>, DiscoveryError> {
        let mut request = self.client.get(&self.url);
        if let Some(session_id) = &self.session_id {
            request = request.header(header::COOKIE, session_cookie(session_id));
        }

        let response = request.send().await?;
        let status = response.status();
        if status.is_redirection() || status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(DiscoveryError::Unauthorized);
        }
        if !status.is_success() {
            return Err(DiscoveryError::Status(status));
        }

        let subjects: Vec<Subject> = response.json().await?;
        debug!("discovered {} subjects from {}", subjects.len(), self.url);
        Ok(subjects)
    }
}

impl SubjectSource for HttpSubjectSource {
    fn discover(&self) -> impl Future<Output = Result<Vec<Subject>, DiscoveryError>> + Send {
        self.fetch()
    }
}

pub fn session_cookie(session_id: &str) -> String {
    format!("sessionId={session_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sensors_url_tolerates_trailing_slash() {
        let source = HttpSubjectSource::new("http://127.0.0.1:8000/", None);
        assert_eq!(source.url(), "http://127.0.0.1:8000/api/sensors");
    }

    #[test]
    fn cookie_uses_backend_session_name() {
        assert_eq!(session_cookie("abc123"), "sessionId=abc123");
    }
}

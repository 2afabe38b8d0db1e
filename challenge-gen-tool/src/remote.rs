//! Game state retrieval from the gamification engine over HTTP.
use std::time::Duration;

use challenge_gen::{GenerationError, ParticipantSnapshot, SnapshotSource, parse_snapshots};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;

/// Basic-auth credentials for the engine.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Option<String>,
}

/// Reads `<host>gengine/state/<gameId>` with a single GET.
#[derive(Debug, Clone)]
pub struct HttpSnapshotSource {
    client: Client,
    host: String,
    credentials: Option<Credentials>,
}

impl HttpSnapshotSource {
    /// # Errors
    ///
    /// Returns [`GenerationError::Config`] if the HTTP client cannot be built.
    pub fn new(
        host: &str,
        credentials: Option<Credentials>,
        timeout: Duration,
    ) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("challenge-gen/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| GenerationError::Config(format!("http client build failed: {err}")))?;
        Ok(Self {
            client,
            host: host.trim().to_string(),
            credentials,
        })
    }

    #[must_use]
    pub fn state_url(&self, game_id: &str) -> String {
        let separator = if self.host.ends_with('/') { "" } else { "/" };
        format!("{}{separator}gengine/state/{game_id}", self.host)
    }
}

impl SnapshotSource for HttpSnapshotSource {
    type Error = GenerationError;

    fn read_game_state(&self, game_id: &str) -> Result<Vec<ParticipantSnapshot>, Self::Error> {
        let failure = |reason: String| GenerationError::FetchFailure {
            game_id: game_id.to_string(),
            reason,
        };
        let url = self.state_url(game_id);
        log::info!("reading game state from {url}");

        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(credentials) = &self.credentials {
            request = request.basic_auth(&credentials.username, credentials.password.as_ref());
        }
        let response = request
            .send()
            .map_err(|err| failure(format!("request to {url} failed: {err}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(failure(format!("{url} answered {status}")));
        }
        let body = response
            .text()
            .map_err(|err| failure(format!("reading body failed: {err}")))?;
        parse_snapshots(&body).map_err(|err| failure(format!("unexpected payload: {err}")))
    }
}

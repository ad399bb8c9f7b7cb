use std::env;
use std::time::Duration;

use anyhow::Result;

/// Which external toxicity scorer the gate may consult.
#[derive(Debug, Clone, PartialEq)]
pub enum ScorerBackend {
    /// No external scorer (default). Policies with external scoring enabled
    /// run in keyword-only mode and say so in the decision reason.
    None,
    /// Google Perspective API — requires PERSPECTIVE_API_KEY, 1 QPS limit
    Perspective,
}

/// Central configuration loaded from environment variables.
///
/// All secrets come from env vars (never hardcoded). The .env file
/// is loaded automatically at startup via dotenvy.
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    /// PostgreSQL connection URL (when set and starts with postgres://, uses Postgres backend)
    pub database_url: Option<String>,
    pub scorer_backend: ScorerBackend,
    pub perspective_api_key: String,
    /// Upper bound on one external scorer call before falling back to keywords
    pub scorer_timeout: Duration,
    /// Password for the admin web surface (EDUGATE_WEB_PASSWORD)
    pub web_password: String,
    /// Secret for HMAC session token signing (EDUGATE_SESSION_SECRET)
    pub session_secret: String,
    /// Recorded as `updatedBy` when settings change through the web surface
    pub admin_name: String,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self> {
        let scorer_backend = match env::var("EDUGATE_SCORER").as_deref() {
            Ok("perspective") => ScorerBackend::Perspective,
            Ok("none") | Ok("") | Err(_) => ScorerBackend::None,
            Ok(other) => anyhow::bail!(
                "Unknown EDUGATE_SCORER value '{other}'. Use 'perspective' or 'none'."
            ),
        };

        let scorer_timeout = match env::var("EDUGATE_SCORER_TIMEOUT_MS") {
            Ok(ms) => Duration::from_millis(ms.trim().parse().map_err(|_| {
                anyhow::anyhow!("EDUGATE_SCORER_TIMEOUT_MS must be a whole number of milliseconds, got '{ms}'")
            })?),
            Err(_) => crate::moderation::gate::DEFAULT_SCORER_TIMEOUT,
        };

        Ok(Self {
            db_path: env::var("EDUGATE_DB_PATH").unwrap_or_else(|_| "./edugate.db".to_string()),
            database_url: env::var("DATABASE_URL").ok(),
            scorer_backend,
            perspective_api_key: env::var("PERSPECTIVE_API_KEY").unwrap_or_default(),
            scorer_timeout,
            web_password: env::var("EDUGATE_WEB_PASSWORD").unwrap_or_default(),
            session_secret: env::var("EDUGATE_SESSION_SECRET").unwrap_or_default(),
            admin_name: env::var("EDUGATE_ADMIN_NAME").unwrap_or_else(|_| "admin".to_string()),
        })
    }

    /// True when DATABASE_URL selects the PostgreSQL backend.
    pub fn uses_postgres(&self) -> bool {
        self.database_url
            .as_deref()
            .is_some_and(|u| u.starts_with("postgres://") || u.starts_with("postgresql://"))
    }

    /// Check that the Perspective API key is configured.
    pub fn require_perspective(&self) -> Result<()> {
        if self.perspective_api_key.is_empty() {
            anyhow::bail!(
                "PERSPECTIVE_API_KEY not set. Add it to your .env file,\n\
                 or set EDUGATE_SCORER=none to moderate with keyword rules only."
            );
        }
        Ok(())
    }

    /// Validate that the chosen scorer backend has what it needs.
    pub fn require_scorer(&self) -> Result<()> {
        match self.scorer_backend {
            ScorerBackend::None => Ok(()),
            ScorerBackend::Perspective => self.require_perspective(),
        }
    }

    /// Check that the admin web surface can authenticate anyone.
    pub fn require_web(&self) -> Result<()> {
        if self.web_password.is_empty() || self.session_secret.is_empty() {
            anyhow::bail!(
                "EDUGATE_WEB_PASSWORD and EDUGATE_SESSION_SECRET must both be set to serve the admin API."
            );
        }
        Ok(())
    }
}

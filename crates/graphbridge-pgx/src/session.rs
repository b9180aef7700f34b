//! Bearer-token session for the REST graph service.
//!
//! One session per manager. Near expiry the token is refreshed; when the
//! refresh is rejected the manager falls back to a full login, so callers
//! only ever see an error when both fail.

use std::sync::Arc;

use chrono::Utc;
use graphbridge_core::{BridgeError, BridgeResult};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::transport::{RestTransport, TokenGrant};

/// Seconds before expiry at which a token is considered stale.
pub const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct Session {
    access_token: String,
    expires_at: i64,
}

impl Session {
    fn from_grant(grant: TokenGrant) -> Self {
        let expires_at = Utc::now().timestamp() + grant.lifetime_secs();
        Self {
            access_token: grant.access_token,
            expires_at,
        }
    }

    fn is_fresh(&self, now: i64) -> bool {
        now < self.expires_at - EXPIRY_MARGIN_SECS
    }
}

/// Owns the process-wide REST session.
pub struct SessionManager {
    transport: Arc<dyn RestTransport>,
    username: String,
    password: String,
    session: RwLock<Option<Session>>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn RestTransport>, username: &str, password: &str) -> Self {
        Self {
            transport,
            username: username.to_string(),
            password: password.to_string(),
            session: RwLock::new(None),
        }
    }

    /// Log in with the configured credentials and replace any stored session.
    pub async fn acquire(&self) -> BridgeResult<()> {
        let grant = self
            .transport
            .authenticate(&self.username, &self.password)
            .await
            .map_err(|e| match e {
                BridgeError::Authentication(_) => e,
                other => BridgeError::Authentication(other.to_string()),
            })?;

        info!(user = %self.username, expires_in = ?grant.expires_in, "Acquired REST session");
        *self.session.write().await = Some(Session::from_grant(grant));
        Ok(())
    }

    /// Make sure a usable token is stored, touching the network only when
    /// there is no session or it expires within the margin.
    pub async fn ensure_valid(&self) -> BridgeResult<()> {
        let current = self.session.read().await.clone();
        let session = match current {
            None => return self.acquire().await,
            Some(session) if session.is_fresh(Utc::now().timestamp()) => return Ok(()),
            Some(session) => session,
        };

        match self.transport.refresh(&session.access_token).await {
            Ok(grant) => {
                debug!(expires_in = ?grant.expires_in, "Refreshed REST session");
                *self.session.write().await = Some(Session::from_grant(grant));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Token refresh failed, logging in again");
                self.acquire().await
            }
        }
    }

    /// `Bearer <token>` for the current session.
    pub async fn authorization_header(&self) -> BridgeResult<String> {
        self.ensure_valid().await?;
        match self.session.read().await.as_ref() {
            Some(session) => Ok(format!("Bearer {}", session.access_token)),
            None => Err(BridgeError::Authentication("session was invalidated".to_string())),
        }
    }

    /// Drop the stored session; the next request logs in again.
    pub async fn invalidate(&self) {
        *self.session.write().await = None;
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }
}

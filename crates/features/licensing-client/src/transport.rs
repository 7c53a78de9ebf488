//! # Activation Transport Port
//!
//! How the client-side [`crate::manager::LicenseManager`] talks to a server-side
//! activation engine (C8). Concrete HTTP routing is out of scope for this crate —
//! this trait is the seam a vendor's real transport plugs into. The `online` feature
//! provides a JSON-over-HTTP default; [`DirectTransport`] wires a manager directly to
//! an in-process engine, for servers that embed both halves and for tests.

use crate::error::ManagerError;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use mhub_activation::{ActivationEngine, ActivationError};
use mhub_domain::LicenseId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Parameters a client supplies when requesting a seat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationRequest {
    pub license_id: LicenseId,
    pub hardware_id: Option<String>,
    pub user_name: Option<String>,
}

/// What the server hands back for a successful activation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivationResponse {
    pub activation_id: Uuid,
}

/// What the server hands back for a heartbeat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatResponse {
    pub still_active: bool,
}

/// The client-facing half of the activation protocol (C6 talking to C8).
#[async_trait]
pub trait ActivationTransport: Send + Sync {
    /// Requests a seat for `request.license_id`.
    async fn activate(&self, request: ActivationRequest) -> Result<ActivationResponse, ManagerError>;

    /// Reports liveness for a previously granted `activation_id`.
    async fn heartbeat(&self, activation_id: Uuid) -> Result<HeartbeatResponse, ManagerError>;

    /// Gives up a previously granted seat (client shutdown, user logout).
    async fn disconnect(&self, activation_id: Uuid) -> Result<(), ManagerError>;

    /// Requests a freshly re-encoded envelope for `license_id` (e.g. subscription
    /// renewal).
    async fn renew(&self, license_id: LicenseId) -> Result<Vec<u8>, ManagerError>;
}

/// JSON-over-HTTP implementation of [`ActivationTransport`].
#[cfg(feature = "online")]
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

#[cfg(feature = "online")]
impl HttpTransport {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), base_url: base_url.into() }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }

    fn transport_err(context: &'static str, e: impl std::fmt::Display) -> ManagerError {
        ManagerError::Transport { message: e.to_string().into(), context: Some(context.into()) }
    }
}

#[cfg(feature = "online")]
#[async_trait]
impl ActivationTransport for HttpTransport {
    async fn activate(&self, request: ActivationRequest) -> Result<ActivationResponse, ManagerError> {
        self.client
            .post(self.url("activations"))
            .json(&request)
            .send()
            .await
            .map_err(|e| Self::transport_err("activating license", e))?
            .error_for_status()
            .map_err(|e| Self::transport_err("activating license", e))?
            .json()
            .await
            .map_err(|e| Self::transport_err("parsing activation response", e))
    }

    async fn heartbeat(&self, activation_id: Uuid) -> Result<HeartbeatResponse, ManagerError> {
        self.client
            .post(self.url(&format!("activations/{activation_id}/heartbeat")))
            .send()
            .await
            .map_err(|e| Self::transport_err("sending heartbeat", e))?
            .error_for_status()
            .map_err(|e| Self::transport_err("sending heartbeat", e))?
            .json()
            .await
            .map_err(|e| Self::transport_err("parsing heartbeat response", e))
    }

    async fn disconnect(&self, activation_id: Uuid) -> Result<(), ManagerError> {
        self.client
            .delete(self.url(&format!("activations/{activation_id}")))
            .send()
            .await
            .map_err(|e| Self::transport_err("disconnecting activation", e))?
            .error_for_status()
            .map_err(|e| Self::transport_err("disconnecting activation", e))?;
        Ok(())
    }

    async fn renew(&self, license_id: LicenseId) -> Result<Vec<u8>, ManagerError> {
        let response = self
            .client
            .post(self.url(&format!("licenses/{license_id}/renew")))
            .send()
            .await
            .map_err(|e| Self::transport_err("renewing license", e))?
            .error_for_status()
            .map_err(|e| Self::transport_err("renewing license", e))?;
        response.bytes().await.map(|b| b.to_vec()).map_err(|e| Self::transport_err("reading renewal envelope", e))
    }
}

fn engine_err(context: &'static str, e: ActivationError) -> ManagerError {
    ManagerError::Transport { message: e.to_string().into(), context: Some(context.into()) }
}

/// In-process implementation of [`ActivationTransport`] wired directly to an
/// [`ActivationEngine`], for a server that embeds both the client-side manager and
/// its own activation engine in one process, and for tests that exercise the client
/// without a network hop.
///
/// The transport seam is keyed by `activation_id` alone (mirroring a real HTTP API,
/// where it is the opaque resource id in the URL), while the engine is keyed by
/// `(license_id, activation_id)`; this adapter keeps the small reverse index needed
/// to bridge the two without changing either port.
#[derive(Clone)]
pub struct DirectTransport {
    engine: Arc<ActivationEngine>,
    renewal_extension: ChronoDuration,
    license_of: Arc<RwLock<HashMap<Uuid, LicenseId>>>,
}

impl std::fmt::Debug for DirectTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectTransport").finish_non_exhaustive()
    }
}

impl DirectTransport {
    /// Wires a transport directly to `engine`. Renewals extend a `Subscription` by
    /// 30 days unless overridden with [`Self::renewal_extension`].
    #[must_use]
    pub fn new(engine: Arc<ActivationEngine>) -> Self {
        Self { engine, renewal_extension: ChronoDuration::days(30), license_of: Arc::new(RwLock::new(HashMap::new())) }
    }

    #[must_use]
    pub fn renewal_extension(mut self, extension: ChronoDuration) -> Self {
        self.renewal_extension = extension;
        self
    }

    async fn license_id_for(&self, activation_id: Uuid) -> Result<LicenseId, ManagerError> {
        self.license_of.read().await.get(&activation_id).copied().ok_or_else(|| ManagerError::Transport {
            message: format!("activation {activation_id} is not known to this transport").into(),
            context: Some("looking up activation".into()),
        })
    }
}

#[async_trait]
impl ActivationTransport for DirectTransport {
    async fn activate(&self, request: ActivationRequest) -> Result<ActivationResponse, ManagerError> {
        let license_id = request.license_id;
        let activation_id = self
            .engine
            .activate(license_id, request.hardware_id, request.user_name)
            .await
            .map_err(|e| engine_err("activating license", e))?;
        self.license_of.write().await.insert(activation_id, license_id);
        Ok(ActivationResponse { activation_id })
    }

    async fn heartbeat(&self, activation_id: Uuid) -> Result<HeartbeatResponse, ManagerError> {
        let license_id = self.license_id_for(activation_id).await?;
        match self.engine.heartbeat(license_id, activation_id).await {
            Ok(()) => Ok(HeartbeatResponse { still_active: true }),
            Err(ActivationError::NotFound { .. }) => Ok(HeartbeatResponse { still_active: false }),
            Err(e) => Err(engine_err("sending heartbeat", e)),
        }
    }

    async fn disconnect(&self, activation_id: Uuid) -> Result<(), ManagerError> {
        let license_id = self.license_id_for(activation_id).await?;
        self.license_of.write().await.remove(&activation_id);
        self.engine.disconnect_concurrent(license_id, activation_id).await.map_err(|e| engine_err("disconnecting activation", e))
    }

    #[cfg(feature = "issuance")]
    async fn renew(&self, license_id: LicenseId) -> Result<Vec<u8>, ManagerError> {
        self.engine.renew(license_id, self.renewal_extension).await.map_err(|e| engine_err("renewing license", e))
    }

    #[cfg(not(feature = "issuance"))]
    async fn renew(&self, license_id: LicenseId) -> Result<Vec<u8>, ManagerError> {
        Err(ManagerError::Transport {
            message: format!("renewing license {license_id} requires the issuance feature").into(),
            context: Some("renewing license".into()),
        })
    }
}

//! # Client License Manager (C6)
//!
//! Loads a license envelope from disk, validates it against the current machine,
//! and — for seat-pooled variants — keeps an activation alive against a server
//! through periodic heartbeats. One [`LicenseManager`] holds at most one loaded
//! license at a time; `load` replaces whatever was previously loaded.

use crate::error::ManagerError;
use crate::transport::{ActivationRequest, ActivationTransport};
use mhub_domain::{License, LicenseType};
use mhub_licensing::{HardwareIdentifier, LicenseSerializer, MachineHardwareIdentifier, RuleRegistry, ValidationContext};
use rsa::RsaPublicKey;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

/// Variants that track a seat pool against the activation server and so need an
/// active heartbeat while loaded.
fn requires_server_activation(license_type: LicenseType) -> bool {
    matches!(license_type, LicenseType::Floating | LicenseType::Concurrent)
}

/// The outcome of [`LicenseManager::load`]: whether the license ended up tracked by
/// a server-side activation, or validated purely offline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No server contact was needed or attempted; the license is self-contained
    /// (`Standard`, `Trial`, `NodeLocked`) or `Subscription` without seat pooling.
    Offline,
    /// A seat was granted by the activation server and is being kept alive.
    Online { activation_id: Uuid },
}

struct LoadedState {
    license: License,
    activation_id: Option<Uuid>,
    heartbeat_task: Option<JoinHandle<()>>,
}

/// Builds a [`LicenseManager`]. `public_key` is mandatory; everything else falls
/// back to sensible defaults.
pub struct LicenseManagerBuilder {
    public_key: RsaPublicKey,
    hardware_identifier: Arc<dyn HardwareIdentifier>,
    serializer: Arc<dyn LicenseSerializer>,
    rules: RuleRegistry,
    transport: Option<Arc<dyn ActivationTransport>>,
    heartbeat_interval: StdDuration,
}

impl LicenseManagerBuilder {
    #[must_use]
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self {
            public_key,
            hardware_identifier: Arc::new(MachineHardwareIdentifier),
            serializer: Arc::new(mhub_licensing::JsonLicenseSerializer),
            rules: RuleRegistry::with_builtin_rules(),
            transport: None,
            heartbeat_interval: StdDuration::from_secs(300),
        }
    }

    #[must_use]
    pub fn hardware_identifier(mut self, identifier: Arc<dyn HardwareIdentifier>) -> Self {
        self.hardware_identifier = identifier;
        self
    }

    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn ActivationTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    #[must_use]
    pub fn heartbeat_interval(mut self, interval: StdDuration) -> Self {
        self.heartbeat_interval = interval;
        self
    }

    #[must_use]
    pub fn build(self) -> LicenseManager {
        LicenseManager {
            public_key: self.public_key,
            hardware_identifier: self.hardware_identifier,
            serializer: self.serializer,
            rules: self.rules,
            transport: self.transport,
            heartbeat_interval: self.heartbeat_interval,
            state: Arc::new(RwLock::new(None)),
        }
    }
}

/// Client-side license lifecycle manager.
pub struct LicenseManager {
    public_key: RsaPublicKey,
    hardware_identifier: Arc<dyn HardwareIdentifier>,
    serializer: Arc<dyn LicenseSerializer>,
    rules: RuleRegistry,
    transport: Option<Arc<dyn ActivationTransport>>,
    heartbeat_interval: StdDuration,
    state: Arc<RwLock<Option<LoadedState>>>,
}

impl LicenseManager {
    /// Starts building a manager that verifies envelopes against `public_key`.
    #[must_use]
    pub fn builder(public_key: RsaPublicKey) -> LicenseManagerBuilder {
        LicenseManagerBuilder::new(public_key)
    }

    /// Loads and validates the license envelope at `path`, deriving the validation
    /// parameters (hardware id, user name) each variant needs, and — for
    /// seat-pooled variants — requests an activation from the configured transport.
    ///
    /// # Errors
    /// Returns [`ManagerError::Codec`] if the envelope doesn't parse or verify,
    /// [`ManagerError::Invalid`] if a validation rule rejects it, or
    /// [`ManagerError::Transport`] if a required server activation fails.
    pub async fn load(&self, path: &Path, user_name: Option<&str>) -> Result<LoadOutcome, ManagerError> {
        let envelope = std::fs::read(path).map_err(|e| ManagerError::Io {
            source: e,
            context: Some(format!("reading license file {}", path.display()).into()),
        })?;
        self.load_bytes(&envelope, user_name).await
    }

    /// As [`Self::load`], but takes already-read envelope bytes.
    ///
    /// # Errors
    /// See [`Self::load`].
    pub async fn load_bytes(&self, envelope: &[u8], user_name: Option<&str>) -> Result<LoadOutcome, ManagerError> {
        let payload = mhub_licensing::codec::decode(envelope, &self.public_key)
            .map_err(|e| ManagerError::Codec { source: e, context: Some("decoding license envelope".into()) })?;
        let license = self
            .serializer
            .deserialize(&payload)
            .map_err(|e| ManagerError::Codec { source: e, context: Some("parsing license payload".into()) })?;

        let hardware_id = if license.license_type() == LicenseType::NodeLocked {
            Some(self.hardware_identifier.current_hardware_id().map_err(|e| ManagerError::Internal {
                message: e.to_string().into(),
                context: Some("collecting hardware id for validation".into()),
            })?)
        } else {
            None
        };

        let max_active_users_count = match &license {
            License::Floating(l) => Some(l.max_active_users_count),
            License::Concurrent(l) => Some(l.max_active_users_count),
            _ => None,
        };

        let ctx = ValidationContext {
            hardware_id,
            user_name: user_name.map(str::to_owned),
            max_active_users_count,
            ..Default::default()
        };
        self.rules
            .validate(&license, &ctx)
            .map_err(|e| ManagerError::Invalid { source: e, context: Some("validating loaded license".into()) })?;

        let license_type = license.license_type();
        let license_id = license.base().license_id;

        let activation_id = if requires_server_activation(license_type) {
            let Some(transport) = &self.transport else {
                return Err(ManagerError::Transport {
                    message: "this license requires a seat activation but no transport is configured".into(),
                    context: Some("loading license".into()),
                });
            };
            let request = ActivationRequest { license_id, hardware_id: ctx.hardware_id.clone(), user_name: ctx.user_name.clone() };
            let response = transport
                .activate(request)
                .await
                .map_err(|e| ManagerError::Transport { message: e.to_string().into(), context: None })?;
            Some(response.activation_id)
        } else {
            None
        };

        let heartbeat_task = activation_id.map(|id| self.spawn_heartbeat(id));

        let mut state = self.state.write().await;
        if let Some(previous) = state.take() {
            if let Some(task) = previous.heartbeat_task {
                task.abort();
            }
        }
        *state = Some(LoadedState { license, activation_id, heartbeat_task });

        Ok(activation_id.map_or(LoadOutcome::Offline, |id| LoadOutcome::Online { activation_id: id }))
    }

    fn spawn_heartbeat(&self, activation_id: Uuid) -> JoinHandle<()> {
        let transport = self.transport.clone().expect("only called once a transport is known to exist");
        let interval = self.heartbeat_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick fires immediately; skip it, activation already confirmed liveness
            loop {
                ticker.tick().await;
                match transport.heartbeat(activation_id).await {
                    Ok(response) if !response.still_active => {
                        warn!(%activation_id, "server reports activation no longer active; stopping heartbeat");
                        return;
                    },
                    Ok(_) => debug!(%activation_id, "heartbeat acknowledged"),
                    Err(e) => warn!(%activation_id, error = %e, "heartbeat failed"),
                }
            }
        })
    }

    /// Signs and re-encodes `license` to `path` under `private_key`.
    ///
    /// # Errors
    /// Returns [`ManagerError::Codec`] if encoding fails, or [`ManagerError::Io`] if
    /// the write fails.
    #[cfg(feature = "issuance")]
    pub fn save(path: &Path, license: &License, private_key: &rsa::RsaPrivateKey) -> Result<(), ManagerError> {
        let serializer = mhub_licensing::JsonLicenseSerializer;
        let payload = serializer
            .serialize(license)
            .map_err(|e| ManagerError::Codec { source: e, context: Some("serializing license".into()) })?;
        let envelope = mhub_licensing::codec::encode(&payload, private_key)
            .map_err(|e| ManagerError::Codec { source: e, context: Some("encoding license envelope".into()) })?;
        std::fs::write(path, envelope).map_err(|e| ManagerError::Io {
            source: e,
            context: Some(format!("writing license file {}", path.display()).into()),
        })
    }

    /// Returns a clone of the currently loaded license, if any.
    pub async fn current(&self) -> Option<License> {
        self.state.read().await.as_ref().map(|s| s.license.clone())
    }

    /// Stops any heartbeat task and, if the license was activated online, tells the
    /// server to release the seat. Leaves the manager ready to `load` again.
    pub async fn close(&self) -> Result<(), ManagerError> {
        let mut state = self.state.write().await;
        let Some(loaded) = state.take() else { return Ok(()) };

        if let Some(task) = loaded.heartbeat_task {
            task.abort();
        }
        if let (Some(activation_id), Some(transport)) = (loaded.activation_id, &self.transport) {
            transport
                .disconnect(activation_id)
                .await
                .map_err(|e| ManagerError::Transport { message: e.to_string().into(), context: Some("disconnecting activation on close".into()) })?;
        }
        Ok(())
    }

    /// The validation rule registry this manager checks loaded licenses with.
    #[must_use]
    pub const fn rules(&self) -> &RuleRegistry {
        &self.rules
    }
}

/// Helper: the canonical per-platform location for a license file, mirroring where a
/// vendor would typically install one. Left as a convenience; callers are free to
/// pass any [`PathBuf`] to [`LicenseManager::load`].
#[must_use]
pub fn default_license_path(app_name: &str) -> PathBuf {
    dirs_next_fallback().join(format!("{app_name}.lic"))
}

fn dirs_next_fallback() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))
        .unwrap_or_else(|| PathBuf::from("."))
}

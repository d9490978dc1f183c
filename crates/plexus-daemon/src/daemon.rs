//! Daemon context object.
//!
//! A [`Daemon`] owns every registry: state store, capability
//! registry, event router, and transform engine. There are no
//! module-level globals; subsystems reach each other through the
//! daemon they were built into.
//!
//! ```text
//!   emit_as(agent, wire value)
//!       │  normalize + permission gate
//!       ▼
//!   route(event) ──▶ TransformEngine.apply
//!       │                 │
//!       │           derived events (recurse)
//!       ▼                 ▼
//!   EventRouter.dispatch  PendingResponses (async rules)
//!       │
//!       ▼
//!   RoutingAudit ──▶ StateStore
//! ```

use crate::config::DaemonConfig;
use crate::discovery::Discovery;
use crate::router::{DispatchOutcome, DispatchResult, EventRouter, RoutingAudit};
use crate::transform::{PendingResponses, TransformEngine};
use crate::DaemonError;
use plexus_capability::{CapabilityRegistry, ProfileStore};
use plexus_event::{Envelope, Event};
use plexus_state::StateStore;
use plexus_types::{AgentId, CorrelationId, ErrorCode};
use serde_json::{json, Value};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Event name emitted when an agent-originated chain fails.
pub const SYSTEM_ERROR_EVENT: &str = "system:error";

/// The routing pipeline shared between inline emits and spawned
/// async-rule tasks.
pub(crate) struct Pipeline {
    pub(crate) router: EventRouter,
    pub(crate) transforms: TransformEngine,
    pub(crate) pending: PendingResponses,
    pub(crate) audit: RoutingAudit,
    max_route_depth: u32,
}

impl Pipeline {
    /// Routes one event through transform then dispatch, recursing
    /// into derived events.
    ///
    /// Boxed because async-rule tasks re-enter the pipeline from
    /// spawned futures.
    fn route(
        self: Arc<Self>,
        event: Event,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<DispatchResult>, DaemonError>> + Send>> {
        let this = self;
        Box::pin(async move {
            this.pending.evict_expired();

            // Cycles are rejected at registration; this guard only
            // bounds chains that outgrew the configured depth.
            if event.context.depth > this.max_route_depth {
                warn!(
                    event = %event.name,
                    depth = event.context.depth,
                    max = this.max_route_depth,
                    "Route depth exceeded; dispatching without transform"
                );
                let results = this.router.dispatch(&event).await;
                this.audit.record(&event, &results);
                return Ok(results);
            }

            let transform = this.transforms.apply(&event)?;
            let mut results = Vec::new();
            match transform {
                Some(tr) if tr.is_async => {
                    let correlation_id = event.context.correlation_id;
                    let targets: Vec<&str> =
                        tr.events.iter().map(|e| e.name.as_str()).collect();
                    results.push(DispatchResult {
                        origin: format!("transform:{}", tr.label),
                        event: event.name.clone(),
                        outcome: DispatchOutcome::Ok {
                            value: json!({
                                "queued": targets,
                                "correlation_id": correlation_id,
                            }),
                        },
                    });

                    let pipeline = Arc::clone(&this);
                    let children = tr.events;
                    tokio::spawn(async move {
                        let mut downstream = Vec::new();
                        for child in children {
                            match Arc::clone(&pipeline).route(child).await {
                                Ok(chunk) => downstream.extend(chunk),
                                Err(e) => downstream.push(DispatchResult {
                                    origin: "pipeline".to_string(),
                                    event: String::new(),
                                    outcome: DispatchOutcome::Failed {
                                        code: e.code().to_string(),
                                        message: e.to_string(),
                                    },
                                }),
                            }
                        }
                        pipeline.pending.complete(correlation_id, downstream);
                    });

                    if !tr.exclusive {
                        results.extend(this.router.dispatch(&event).await);
                    }
                }
                Some(tr) => {
                    for child in tr.events {
                        results.extend(Arc::clone(&this).route(child).await?);
                    }
                    if !tr.exclusive {
                        results.extend(this.router.dispatch(&event).await);
                    }
                }
                None => {
                    results = this.router.dispatch(&event).await;
                }
            }

            this.audit.record(&event, &results);
            Ok(results)
        })
    }
}

/// The daemon: every registry under one context object.
pub struct Daemon {
    config: DaemonConfig,
    store: Arc<StateStore>,
    capabilities: Arc<CapabilityRegistry>,
    pipeline: Arc<Pipeline>,
}

impl Daemon {
    /// Starts a builder.
    #[must_use]
    pub fn builder() -> DaemonBuilder {
        DaemonBuilder::new()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// The shared state store.
    #[must_use]
    pub fn store(&self) -> &Arc<StateStore> {
        &self.store
    }

    /// The capability registry.
    #[must_use]
    pub fn capabilities(&self) -> &Arc<CapabilityRegistry> {
        &self.capabilities
    }

    /// The event router.
    #[must_use]
    pub fn router(&self) -> &EventRouter {
        &self.pipeline.router
    }

    /// The transform engine.
    #[must_use]
    pub fn transforms(&self) -> &TransformEngine {
        &self.pipeline.transforms
    }

    /// Read-only introspection over the daemon's registries.
    #[must_use]
    pub fn discovery(&self) -> Discovery {
        Discovery::new(
            Arc::clone(&self.pipeline),
            Arc::clone(&self.capabilities),
            Arc::clone(&self.store),
        )
    }

    /// Emits an internal event through the full pipeline.
    ///
    /// Internal emissions bypass the permission gate; it applies to
    /// agent-originated events only.
    ///
    /// # Errors
    ///
    /// Returns transform and template failures from the chain.
    /// Per-handler failures live inside the result list instead.
    pub async fn emit(&self, event: Event) -> Result<Vec<DispatchResult>, DaemonError> {
        Arc::clone(&self.pipeline).route(event).await
    }

    /// Agent-facing entry: normalizes a wire value, gates it against
    /// the agent's bound capabilities, then routes it.
    ///
    /// A chain failure additionally emits a [`SYSTEM_ERROR_EVENT`]
    /// carrying the originating client id, so transports watching
    /// the chain see the failure too.
    ///
    /// # Errors
    ///
    /// Returns intake, permission, and chain errors.
    pub async fn emit_as(
        &self,
        agent: &AgentId,
        wire: Value,
    ) -> Result<Vec<DispatchResult>, DaemonError> {
        let mut event = Envelope::normalize(wire)?;
        if event.context.client_id.is_none() {
            event.context.client_id = Some(agent.name.clone());
        }

        self.capabilities.check_permission(agent, &event.name)?;
        debug!(agent = %agent, event = %event.name, "Accepted agent event");

        match Arc::clone(&self.pipeline).route(event.clone()).await {
            Ok(results) => Ok(results),
            Err(e) => {
                let error_event = event.derive(
                    SYSTEM_ERROR_EVENT,
                    json!({
                        "code": e.code(),
                        "message": e.to_string(),
                        "source_event": event.name.clone(),
                        "client_id": event.context.client_id.clone(),
                    }),
                );
                if let Err(nested) = Arc::clone(&self.pipeline).route(error_event).await {
                    warn!(error = %nested, "Failed to route system:error event");
                }
                Err(e)
            }
        }
    }

    /// Waits for the downstream results of an async chain.
    ///
    /// # Errors
    ///
    /// Returns a pending-timeout error when nothing resolves the
    /// correlation id within `ttl` (default: the configured
    /// pending-response TTL).
    pub async fn wait_response(
        &self,
        correlation_id: CorrelationId,
        ttl: Option<Duration>,
    ) -> Result<Vec<DispatchResult>, DaemonError> {
        let ttl = ttl.unwrap_or_else(|| self.config.pending_ttl());
        let waiter = self.pipeline.pending.register(correlation_id, ttl);
        Ok(waiter.wait().await?)
    }
}

/// Builds a [`Daemon`] from configuration layers.
pub struct DaemonBuilder {
    config: DaemonConfig,
}

impl DaemonBuilder {
    /// Starts from defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: DaemonConfig::default(),
        }
    }

    /// Replaces the accumulated config wholesale.
    #[must_use]
    pub fn config(mut self, config: DaemonConfig) -> Self {
        self.config = config;
        self
    }

    /// Merges a config file as an overlay.
    ///
    /// # Errors
    ///
    /// Returns config read and parse failures.
    pub fn config_file(mut self, path: &Path) -> Result<Self, DaemonError> {
        let overlay = DaemonConfig::load(path)?;
        self.config.merge(&overlay);
        Ok(self)
    }

    /// Builds the daemon: validates config, loads profiles and rule
    /// files, and wires the pipeline.
    ///
    /// Unloadable individual profiles and rules are logged and
    /// skipped; an unreadable rule file named by the config is an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns config validation and rule-file failures.
    pub fn build(self) -> Result<Daemon, DaemonError> {
        let config = self.config;
        config.validate()?;

        let store = Arc::new(StateStore::new());

        let capabilities = Arc::new(CapabilityRegistry::new());
        if !config.profiles.dirs.is_empty() {
            let profile_store = ProfileStore::with_dirs(config.profiles.dirs.clone());
            for error in capabilities.load_all(&profile_store) {
                warn!(error = %error, "Skipping unloadable profile");
            }
        }

        let transforms = TransformEngine::with_max_route_depth(config.daemon.max_route_depth);
        for file in &config.transformers.files {
            let report = transforms.load_file(file)?;
            for (label, error) in &report.errors {
                warn!(rule = %label, origin = %report.origin, error = %error, "Skipping invalid rule");
            }
        }

        let pipeline = Arc::new(Pipeline {
            router: EventRouter::new(config.handler_timeout()),
            transforms,
            pending: PendingResponses::new(config.pending_ttl()),
            audit: RoutingAudit::new(Arc::clone(&store)),
            max_route_depth: config.daemon.max_route_depth,
        });

        Ok(Daemon {
            config,
            store,
            capabilities,
            pipeline,
        })
    }
}

impl Default for DaemonBuilder {
    fn default() -> Self {
        Self::new()
    }
}

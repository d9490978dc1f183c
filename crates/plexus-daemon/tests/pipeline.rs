//! End-to-end pipeline scenarios exercised through the public API:
//! agent intake, permission gating, transformation, dispatch, and
//! the audit trail, wired exactly as a transport would wire them.

use async_trait::async_trait;
use plexus_capability::ProfileDef;
use plexus_daemon::config::DaemonConfig;
use plexus_daemon::router::{DispatchOutcome, EventHandler};
use plexus_daemon::transform::TransformerRule;
use plexus_daemon::{Daemon, DaemonError, RouterError};
use plexus_event::Event;
use plexus_types::AgentId;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Echoes its name and the payload it received.
struct EchoHandler {
    name: String,
    calls: AtomicUsize,
}

impl EchoHandler {
    fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventHandler for EchoHandler {
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: Event) -> Result<Value, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(json!({"handled_by": self.name, "payload": event.payload}))
    }
}

fn reader_profile() -> ProfileDef {
    ProfileDef::from_toml(
        r#"
        [profile]
        name = "order-clerk"

        [permissions]
        events = ["order:*", "state:get"]
        deny = ["order:delete"]
        "#,
    )
    .expect("profile should parse")
}

// ── Agent intake ─────────────────────────────────────────────

#[tokio::test]
async fn gated_event_flows_from_agent_to_handler() {
    let daemon = Daemon::builder().build().expect("daemon should build");
    daemon
        .capabilities()
        .register_profile(reader_profile())
        .expect("profile should register");
    let agent = AgentId::new("clerk-1");
    daemon
        .capabilities()
        .bind(&agent, "order-clerk")
        .expect("agent should bind");

    let handler = EchoHandler::new("orders");
    daemon
        .router()
        .register("order:placed", handler.clone(), 0, "orders-svc")
        .expect("handler should register");

    let results = daemon
        .emit_as(&agent, json!({"event": "order:placed", "data": {"sku": "X1"}}))
        .await
        .expect("permitted event should route");

    assert_eq!(results.len(), 1);
    assert!(matches!(results[0].outcome, DispatchOutcome::Ok { .. }));
    assert_eq!(handler.calls(), 1);
}

#[tokio::test]
async fn denied_event_is_refused_before_dispatch() {
    let daemon = Daemon::builder().build().expect("daemon should build");
    daemon
        .capabilities()
        .register_profile(reader_profile())
        .expect("profile should register");
    let agent = AgentId::new("clerk-2");
    daemon
        .capabilities()
        .bind(&agent, "order-clerk")
        .expect("agent should bind");

    let handler = EchoHandler::new("orders");
    daemon
        .router()
        .register("order:delete", handler.clone(), 0, "orders-svc")
        .expect("handler should register");

    let err = daemon
        .emit_as(&agent, json!({"event": "order:delete", "data": {}}))
        .await
        .expect_err("denied event should be refused");
    assert!(matches!(err, DaemonError::Capability(_)));
    assert_eq!(handler.calls(), 0);

    let err = daemon
        .emit_as(&agent, json!({"event": "state:set", "data": {}}))
        .await
        .expect_err("ungranted event should be refused");
    assert!(matches!(err, DaemonError::Capability(_)));
}

#[tokio::test]
async fn read_only_grant_permits_get_and_refuses_set() {
    let daemon = Daemon::builder().build().expect("daemon should build");
    daemon
        .capabilities()
        .register_profile(
            ProfileDef::from_toml(
                r#"
                [profile]
                name = "state-reader"

                [permissions]
                events = ["state:get"]
                "#,
            )
            .expect("profile should parse"),
        )
        .expect("profile should register");
    let agent = AgentId::new("reader-1");
    daemon
        .capabilities()
        .bind(&agent, "state-reader")
        .expect("agent should bind");

    daemon
        .emit_as(&agent, json!({"event": "state:get", "data": {"key": "k"}}))
        .await
        .expect("granted event should route");

    let err = daemon
        .emit_as(&agent, json!({"event": "state:set", "data": {"key": "k"}}))
        .await
        .expect_err("ungranted event should be refused");
    assert!(matches!(err, DaemonError::Capability(_)));
}

#[tokio::test]
async fn unbound_agent_is_refused() {
    let daemon = Daemon::builder().build().expect("daemon should build");
    let stranger = AgentId::new("stranger");
    let err = daemon
        .emit_as(&stranger, json!({"event": "order:placed", "data": {}}))
        .await
        .expect_err("unbound agent should be refused");
    assert!(matches!(err, DaemonError::Capability(_)));
}

// ── Transformation ───────────────────────────────────────────

#[tokio::test]
async fn transform_rewrites_payload_on_the_way_to_the_target() {
    let daemon = Daemon::builder().build().expect("daemon should build");
    let inventory = EchoHandler::new("inventory");
    daemon
        .router()
        .register("inventory:reserve", inventory.clone(), 0, "inv-svc")
        .expect("handler should register");
    daemon
        .transforms()
        .register(TransformerRule {
            source: "order:placed".to_string(),
            target: Some("inventory:reserve".to_string()),
            mapping: [
                ("sku".to_string(), "{{data.item}}".to_string()),
                ("qty".to_string(), "{{data.count}}".to_string()),
            ]
            .into_iter()
            .collect(),
            ..Default::default()
        })
        .expect("rule should register");

    let results = daemon
        .emit(Event::new(
            "order:placed",
            json!({"item": "X1", "count": 3}),
        ))
        .await
        .expect("emit should succeed");

    assert_eq!(results.len(), 1);
    let DispatchOutcome::Ok { value } = &results[0].outcome else {
        panic!("target handler should succeed");
    };
    assert_eq!(value["payload"], json!({"sku": "X1", "qty": 3}));
    assert_eq!(inventory.calls(), 1);
}

#[tokio::test]
async fn cyclic_rule_is_rejected_at_registration() {
    let daemon = Daemon::builder().build().expect("daemon should build");
    daemon
        .transforms()
        .register(TransformerRule {
            source: "a:one".to_string(),
            target: Some("b:two".to_string()),
            ..Default::default()
        })
        .expect("first rule should register");

    let err = daemon
        .transforms()
        .register(TransformerRule {
            source: "b:two".to_string(),
            target: Some("a:one".to_string()),
            ..Default::default()
        })
        .expect_err("closing the loop should be refused");
    assert!(matches!(
        err,
        plexus_daemon::TransformError::CircularRouting { .. }
    ));
}

// ── Async chains ─────────────────────────────────────────────

#[tokio::test]
async fn async_chain_resolves_through_wait_response() {
    let daemon = Daemon::builder().build().expect("daemon should build");
    let auditor = EchoHandler::new("auditor");
    daemon
        .router()
        .register("audit:record", auditor.clone(), 0, "audit-svc")
        .expect("handler should register");
    daemon
        .transforms()
        .register(TransformerRule {
            source: "order:placed".to_string(),
            target: Some("audit:record".to_string()),
            is_async: true,
            ..Default::default()
        })
        .expect("async rule should register");

    let event = Event::new("order:placed", json!({"sku": "X1"}));
    let correlation_id = event.context.correlation_id;

    let results = daemon.emit(event).await.expect("emit should succeed");
    assert_eq!(results.len(), 1, "caller gets the queued acknowledgement");

    let downstream = daemon
        .wait_response(correlation_id, Some(Duration::from_secs(5)))
        .await
        .expect("chain should resolve");
    assert_eq!(downstream.len(), 1);
    assert_eq!(downstream[0].origin, "auditor");
}

// ── Audit trail ──────────────────────────────────────────────

#[tokio::test]
async fn routed_events_leave_audit_entities_behind() {
    let daemon = Daemon::builder().build().expect("daemon should build");
    daemon
        .emit(Event::new("order:placed", json!({})))
        .await
        .expect("emit should succeed");

    let stats = daemon.store().stats();
    assert_eq!(stats.total(), 1);
}

// ── Configuration ────────────────────────────────────────────

#[test]
fn config_file_overlay_builds_a_daemon() {
    let temp = tempfile::TempDir::new().expect("should create temp dir");
    let config_path = temp.path().join("plexus.toml");
    std::fs::write(
        &config_path,
        "[daemon]\nhandler_timeout_ms = 250\n",
    )
    .expect("should write config");

    let daemon = Daemon::builder()
        .config(DaemonConfig::default())
        .config_file(&config_path)
        .expect("config file should load")
        .build()
        .expect("daemon should build");
    assert_eq!(daemon.config().daemon.handler_timeout_ms, 250);
}

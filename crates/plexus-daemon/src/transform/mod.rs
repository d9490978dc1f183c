//! Declarative transformer engine.
//!
//! ```text
//!   rule files (TOML) ──▶ TransformEngine ──▶ TransformResult
//!        │                     │
//!   hot reload            condition + mapping
//!   (load/unload)         over data.* / context.*
//! ```
//!
//! Rules rewrite matching events into derived target events without
//! handler code. Async rules resolve through correlation-keyed
//! [`PendingResponses`].

mod condition;
mod engine;
mod pending;
mod rule;
mod template;

pub use condition::Condition;
pub use engine::{
    LoadReport, RuleInfo, TransformEngine, TransformResult, API_ORIGIN, MAX_ROUTE_DEPTH,
};
pub use pending::{PendingResponses, PendingWaiter};
pub use rule::{
    RuleSet, RuleValidationError, TransformerRule, DEFAULT_RULE_PRIORITY, PRIORITY_RANGE,
};

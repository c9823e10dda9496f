//! Structured observability hooks for deployment run lifecycle events.
//!
//! This module provides:
//! - A run-scoped tracing span via `run_span`
//! - Emission functions for stage transitions, component resolution,
//!   initialization and run completion
//!
//! Events are emitted at `info!` level (failures at `error!`). Filtering and
//! JSON output are configured by [`crate::telemetry::init_tracing`].

use ethers::types::Address;
use tracing::{error, field, info, Span};

use crate::domain::run::RunState;

/// Run-scoped span. Attach it with `Instrument::instrument`; `chain_id` is
/// recorded once the network is known.
///
/// ```ignore
/// orchestrate().instrument(run_span("4a5c…")).await
/// ```
pub fn run_span(run_id: &str) -> Span {
    tracing::info_span!("perp_deploy.run", run_id = %run_id, chain_id = field::Empty)
}

/// Emit event: run started from a parameters file.
pub fn emit_run_started(run_id: &str, parameters: &std::path::Path) {
    info!(event = "run.started", run_id = %run_id, parameters = %parameters.display());
}

pub fn emit_stage_entered(run_id: &str, stage: RunState) {
    info!(event = "run.stage_entered", run_id = %run_id, stage = %stage);
}

/// Emit event: a component address is known, either reused or freshly created.
pub fn emit_component_resolved(component: &str, address: Address, freshly_deployed: bool) {
    info!(
        event = "component.resolved",
        component = %component,
        address = ?address,
        fresh = freshly_deployed,
    );
}

/// Emit event: the main component is initialized. `already` is true when a
/// previous run had done it.
pub fn emit_main_initialized(address: Address, already: bool) {
    info!(event = "main.initialized", address = ?address, already = already);
}

pub fn emit_run_finished(run_id: &str, duration_ms: u64, fresh_components: usize, main: Address) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        fresh_components = fresh_components,
        main = ?main,
    );
}

/// Emit event: the run aborted at `stage`.
pub fn emit_run_failed(run_id: &str, stage: RunState, error: &dyn std::fmt::Display) {
    error!(event = "run.failed", run_id = %run_id, stage = %stage, error = %error);
}

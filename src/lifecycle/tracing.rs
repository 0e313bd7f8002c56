//! # Observability & Tracing
//!
//! [`setup_tracing`] installs a compact `tracing-subscriber` formatter filtered
//! by `RUST_LOG`.
//!
//! ```bash
//! RUST_LOG=info stage-deploy --stage staging      # one line per step
//! RUST_LOG=debug stage-deploy --stage staging     # per-route registration detail
//! RUST_LOG=stage_deploy::provider=debug stage-deploy --stage staging
//! ```
//!
//! Each run is wrapped in a `provision` span carrying the `stage` field, so
//! every line a run emits names the stage it belongs to:
//!
//! ```text
//! INFO provision{stage="staging"}: Provisioning stage domain=staging.api.example profile=calc-staging protected=false routes=2
//! INFO provision{stage="staging"}: Bucket ready bucket=calc-backend-staging-calc cors=true
//! INFO provision{stage="staging"}: Gateway created gateway_id=gw-1 domain=staging.api.example
//! INFO provision{stage="staging"}: Routes registered gateway_id=gw-1 routes=2
//! INFO provision{stage="staging"}: Gateway deployed deployment_id=dep-2 url=https://staging.api.example routes=2
//! INFO provision{stage="staging"}: Usage plan attached plan=calc-plan rate=100 burst=100
//! ```
//!
//! A usage plan that fails to attach is logged at `WARN` with `alert=true`.
//! Secret values never appear in logs; resolved environments print variable
//! names only.

use tracing_subscriber::EnvFilter;

/// Falls back to `info` when `RUST_LOG` is unset.
pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

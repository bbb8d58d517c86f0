//! Top-level facade crate for tally.
//!
//! Re-exports the metric core and the server library so users can depend on a single crate.
//!
//! ```no_run
//! use tally::server::{app_state::AppState, config, router::build_router};
//!
//! # async fn run() -> tally::core::Result<()> {
//! let cfg = config::load_from_env()?;
//! let app = build_router(AppState::new(&cfg)?);
//! let listener = tokio::net::TcpListener::bind(cfg.listen()).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod core {
    pub use tally_core::*;
}

pub mod server {
    pub use tally_server::*;
}

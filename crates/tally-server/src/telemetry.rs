//! Global tracing subscriber: env filter, stdout formatter, and the Loki
//! layer when enabled.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tally_core::error::{Result, TallyError};

use crate::config::LokiConfig;
use crate::obs::loki::{self, LokiHandle};

/// Install the subscriber. Must run inside a tokio runtime when Loki is
/// enabled, since the shipper is spawned here.
pub fn init(loki_cfg: &LokiConfig) -> Result<Option<LokiHandle>> {
    let (loki_layer, handle) = if loki_cfg.enabled {
        let (layer, handle) = loki::spawn(loki_cfg)?;
        (Some(layer), Some(handle))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .with(loki_layer)
        .try_init()
        .map_err(|e| TallyError::Internal(format!("tracing init failed: {e}")))?;

    Ok(handle)
}

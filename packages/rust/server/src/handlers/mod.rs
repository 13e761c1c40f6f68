//! Route handlers.

pub mod concepts;
pub mod health;
pub mod identify;

use serde::Deserialize;

/// `?dev_mode=true` switches a pipeline route to the fixed development record.
#[derive(Debug, Default, Deserialize)]
pub struct DevModeQuery {
    #[serde(default)]
    pub dev_mode: bool,
}

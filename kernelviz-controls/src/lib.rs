use kernelviz_models::GridSnapshot;
use tokio::sync::watch;

pub mod controls;
pub mod error;
pub mod notification;
pub mod player;
pub mod poller;
pub mod service;

#[cfg(test)]
mod testing;

pub use error::Error;
pub use poller::{DEFAULT_INTERVAL, PauseMode, Poller, PollerConfig, PollerStatus};

pub type Result<T, E = Error> = std::result::Result<T, E>;

pub type StatusReceiver = watch::Receiver<PollerStatus>;
pub type GridReceiver = watch::Receiver<Option<GridSnapshot>>;

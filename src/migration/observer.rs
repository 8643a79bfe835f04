//! Progress notifications
//!
//! Observers see what a run is doing but cannot change it: `notify` returns nothing
//! and the migrator ignores whatever an observer does with the event.

use crate::migration::version::{Action, Direction, Version};
use crossbeam_channel::Sender;
use serde::Serialize;

/// Something that happened during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    GroupStarted {
        action: Action,
        direction: Direction,
        versions: Vec<Version>,
    },
    StageStarted {
        version: Version,
        direction: Direction,
        position: usize,
        total: usize,
    },
    StageFinished {
        version: Version,
        direction: Direction,
        position: usize,
        total: usize,
    },
    /// Emitted only after the group committed
    GroupFinished { action: Action, applied: usize },
    /// The committed marker value; `None` after an uninstall
    VersionChanged {
        from: Option<Version>,
        to: Option<Version>,
    },
    /// Outcome of dropping the marker table during an uninstall
    CleanupFinished { success: bool },
}

/// Listener for `MigrationEvent`s
pub trait MigrationObserver {
    fn notify(&self, event: &MigrationEvent);
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl MigrationObserver for NoopObserver {
    fn notify(&self, _event: &MigrationEvent) {}
}

/// Observer that writes progress through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl MigrationObserver for LogObserver {
    fn notify(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::GroupStarted {
                action, versions, ..
            } => {
                log::info!("Starting {} ({} stage(s))...", action, versions.len());
            }
            MigrationEvent::StageStarted {
                version,
                direction,
                position,
                total,
            } => {
                log::info!("[{}/{}] {} {}", position + 1, total, direction, version);
            }
            MigrationEvent::StageFinished { version, .. } => {
                log::debug!("[{}] OK", version);
            }
            MigrationEvent::GroupFinished { action, applied } => {
                log::info!("Completed {} ({} stage(s) applied).", action, applied);
            }
            MigrationEvent::VersionChanged { from, to } => match to {
                Some(to) => log::info!(
                    "Version changed from {} to {}.",
                    from.as_ref().map_or("(none)", Version::as_str),
                    to
                ),
                None => log::info!("Version information removed."),
            },
            MigrationEvent::CleanupFinished { success: true } => {
                log::info!("Removed version information from database.");
            }
            MigrationEvent::CleanupFinished { success: false } => {
                log::warn!("Failed to remove version information from database.");
            }
        }
    }
}

/// Observer that forwards events into a channel
///
/// Sending never blocks the run: a full or disconnected channel drops the event.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: Sender<MigrationEvent>,
}

impl ChannelObserver {
    pub fn new(sender: Sender<MigrationEvent>) -> Self {
        Self { sender }
    }
}

impl MigrationObserver for ChannelObserver {
    fn notify(&self, event: &MigrationEvent) {
        let _ = self.sender.try_send(event.clone());
    }
}

//! Offline progress: production earned while the game was closed.
//!
//! Gains are computed in one step from the rates the production graph reports
//! right after load, rather than by replaying ticks. A resource only gains if
//! its rate is positive; deficits are never applied retroactively.

use crate::config::GameConfig;
use crate::display::{format_duration, format_number};
use crate::id::ResourceId;
use crate::ledger::Ledger;
use crate::session::Session;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OfflineError {
    #[error("offline progress was already applied for this load")]
    AlreadyApplied,
    #[error("session was not loaded from a save")]
    NoSaveTimestamp,
}

/// What an offline reconciliation granted.
#[derive(Debug, Clone, PartialEq)]
pub struct OfflineSummary {
    /// Wall-clock milliseconds since the save.
    pub elapsed_ms: u64,
    /// Milliseconds actually credited, after the cap.
    pub effective_ms: u64,
    /// Amount added per resource with a positive rate, in ledger order.
    pub gains: Vec<(ResourceId, f64)>,
    /// True when `elapsed_ms` exceeded the cap.
    pub was_capped: bool,
}

impl OfflineSummary {
    pub fn gain(&self, resource: &str) -> f64 {
        self.gains
            .iter()
            .find(|(id, _)| id.as_str() == resource)
            .map(|(_, amount)| *amount)
            .unwrap_or(0.0)
    }

    pub fn total_gained(&self) -> f64 {
        self.gains.iter().map(|(_, amount)| amount).sum()
    }

    /// Lines suitable for a welcome-back message.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec![format!("Away for {}", format_duration(self.elapsed_ms))];
        if self.was_capped {
            lines.push(format!(
                "Production calculated for {} max",
                format_duration(self.effective_ms)
            ));
        }
        for (resource, amount) in &self.gains {
            if *amount > 0.0 {
                lines.push(format!("+{} {resource}", format_number(*amount)));
            }
        }
        lines
    }
}

/// Credit `ledger` with production for the time between `last_save_ms` and
/// `now_ms`, using the ledger's current rates.
///
/// Returns `None` when less than `config.min_offline_ms` passed, or when the
/// clock went backwards. Calling this twice for the same interval credits it
/// twice.
pub fn reconcile(
    ledger: &mut Ledger,
    config: &GameConfig,
    last_save_ms: u64,
    now_ms: u64,
) -> Option<OfflineSummary> {
    let elapsed_ms = now_ms.checked_sub(last_save_ms)?;
    if elapsed_ms < config.min_offline_ms {
        return None;
    }
    let effective_ms = elapsed_ms.min(config.max_offline_ms);
    let seconds = effective_ms as f64 / 1000.0;

    let credits: Vec<(ResourceId, f64)> = ledger
        .iter()
        .filter(|res| res.rate() > 0.0)
        .map(|res| {
            let raw = res.rate() * seconds;
            (res.id.clone(), raw.min(res.capacity().headroom(res.current())))
        })
        .collect();

    let gains = credits
        .into_iter()
        .map(|(id, amount)| {
            let added = ledger.add(id.as_str(), amount);
            (id, added)
        })
        .collect();

    Some(OfflineSummary {
        elapsed_ms,
        effective_ms,
        gains,
        was_capped: elapsed_ms > config.max_offline_ms,
    })
}

impl Session {
    /// Apply offline progress for the time since the save this session was
    /// loaded from. Works once per load.
    pub fn calculate_offline_progress(
        &mut self,
        now_ms: u64,
    ) -> Result<Option<OfflineSummary>, OfflineError> {
        let last_save_ms = self.loaded_at_ms.ok_or(OfflineError::NoSaveTimestamp)?;
        if self.offline_applied {
            return Err(OfflineError::AlreadyApplied);
        }
        self.offline_applied = true;

        let summary = reconcile(&mut self.ledger, &self.config, last_save_ms, now_ms);
        match &summary {
            Some(s) => tracing::info!(
                away = %format_duration(s.elapsed_ms),
                credited = %format_duration(s.effective_ms),
                capped = s.was_capped,
                "applied offline progress"
            ),
            None => tracing::debug!(last_save_ms, now_ms, "no offline progress"),
        }
        Ok(summary)
    }

    /// Timestamp of the save this session was loaded from.
    pub fn loaded_at_ms(&self) -> Option<u64> {
        self.loaded_at_ms
    }
}

//! Stay deadline scheduler
//!
//! Sweeps non-terminal bookings on a fixed interval and pushes the ones past
//! a wall-clock deadline through the booking service, the same entry points
//! staff use. It never writes to storage itself. A booking that fails is
//! logged and picked up again on the next tick.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::booking::BookingService;
use crate::application::locks::LockRegistry;
use crate::domain::{Actor, Booking, DomainResult, RepositoryProvider, StayPolicy};
use crate::shared::{Clock, ShutdownSignal};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SweepRule {
    UnpaidTimeout,
    NoShow,
    ForcedCheckout,
}

impl SweepRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnpaidTimeout => "unpaid_timeout",
            Self::NoShow => "no_show",
            Self::ForcedCheckout => "forced_checkout",
        }
    }
}

/// The rule a booking falls under at `now`, if any. An unpaid booking past
/// its payment window is expired before it can be treated as a no-show.
pub fn match_rule(policy: &StayPolicy, booking: &Booking, now: DateTime<Utc>) -> Option<SweepRule> {
    if policy.unpaid_expired(booking, now) {
        Some(SweepRule::UnpaidTimeout)
    } else if policy.no_show_due(booking, now) {
        Some(SweepRule::NoShow)
    } else if policy.checkout_overdue(booking, now) {
        Some(SweepRule::ForcedCheckout)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct RuleStats {
    pub matched: u32,
    pub succeeded: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepFailure {
    pub booking_id: i32,
    pub rule: SweepRule,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Non-terminal bookings inspected
    pub scanned: usize,
    pub unpaid_timeout: RuleStats,
    pub no_show: RuleStats,
    pub forced_checkout: RuleStats,
    pub failures: Vec<SweepFailure>,
}

impl SweepReport {
    fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            started_at,
            finished_at: started_at,
            scanned: 0,
            unpaid_timeout: RuleStats::default(),
            no_show: RuleStats::default(),
            forced_checkout: RuleStats::default(),
            failures: Vec::new(),
        }
    }

    pub fn stats(&self, rule: SweepRule) -> RuleStats {
        match rule {
            SweepRule::UnpaidTimeout => self.unpaid_timeout,
            SweepRule::NoShow => self.no_show,
            SweepRule::ForcedCheckout => self.forced_checkout,
        }
    }

    fn stats_mut(&mut self, rule: SweepRule) -> &mut RuleStats {
        match rule {
            SweepRule::UnpaidTimeout => &mut self.unpaid_timeout,
            SweepRule::NoShow => &mut self.no_show,
            SweepRule::ForcedCheckout => &mut self.forced_checkout,
        }
    }

    pub fn total_matched(&self) -> u32 {
        self.unpaid_timeout.matched + self.no_show.matched + self.forced_checkout.matched
    }
}

pub struct StayScheduler {
    bookings: Arc<BookingService>,
    repos: Arc<dyn RepositoryProvider>,
    locks: Arc<LockRegistry>,
    clock: Arc<dyn Clock>,
    config: SchedulerConfig,
    last_report: RwLock<Option<SweepReport>>,
}

impl StayScheduler {
    pub fn new(
        bookings: Arc<BookingService>,
        repos: Arc<dyn RepositoryProvider>,
        locks: Arc<LockRegistry>,
        clock: Arc<dyn Clock>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            bookings,
            repos,
            locks,
            clock,
            config,
            last_report: RwLock::new(None),
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Report of the most recent completed sweep.
    pub async fn last_report(&self) -> Option<SweepReport> {
        self.last_report.read().await.clone()
    }

    /// One pass over all non-terminal bookings.
    pub async fn sweep(&self) -> DomainResult<SweepReport> {
        let timer = Instant::now();
        let now = self.clock.now();
        let mut report = SweepReport::new(now);

        // Read everything up front and release the transaction; each booking
        // is then handled under its own locks and transaction.
        let candidates = {
            let uow = self.repos.begin().await?;
            uow.non_terminal_bookings().await?
        };
        report.scanned = candidates.len();

        let policy = self.bookings.policy();
        for booking in &candidates {
            let Some(rule) = match_rule(policy, booking, now) else {
                continue;
            };
            report.stats_mut(rule).matched += 1;
            metrics::counter!("stayline_sweep_matches_total", "rule" => rule.as_str()).increment(1);

            let result = match rule {
                SweepRule::UnpaidTimeout => self.bookings.expire_unpaid(booking.id).await,
                SweepRule::NoShow => self.bookings.mark_no_show(booking.id, &Actor::System).await,
                SweepRule::ForcedCheckout => self.bookings.force_check_out(booking.id).await,
            };

            match result {
                Ok(updated) => {
                    report.stats_mut(rule).succeeded += 1;
                    debug!(booking_id = booking.id, rule = rule.as_str(), status = %updated.stay_status, "Sweep transition applied");
                }
                Err(e) => {
                    warn!(booking_id = booking.id, rule = rule.as_str(), error = %e, "Sweep transition failed, will retry next tick");
                    metrics::counter!("stayline_sweep_failures_total", "rule" => rule.as_str()).increment(1);
                    report.failures.push(SweepFailure {
                        booking_id: booking.id,
                        rule,
                        error: e.to_string(),
                    });
                }
            }
        }

        let pruned = self.locks.prune_idle();
        report.finished_at = self.clock.now();
        metrics::histogram!("stayline_sweep_duration_seconds").record(timer.elapsed().as_secs_f64());

        if report.total_matched() > 0 || !report.failures.is_empty() {
            info!(
                scanned = report.scanned,
                unpaid_timeout = report.unpaid_timeout.succeeded,
                no_show = report.no_show.succeeded,
                forced_checkout = report.forced_checkout.succeeded,
                failures = report.failures.len(),
                "🧹 Stay sweep finished"
            );
        } else {
            debug!(scanned = report.scanned, pruned_locks = pruned, "Stay sweep found nothing to do");
        }

        *self.last_report.write().await = Some(report.clone());
        Ok(report)
    }

    /// Start the sweep loop. The first sweep runs immediately.
    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                interval_secs = self.config.interval.as_secs(),
                "🧹 Stay scheduler started"
            );

            let mut interval = tokio::time::interval(self.config.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.sweep().await {
                            warn!(error = %e, "Stay sweep aborted");
                        }
                    }
                    _ = shutdown.notified().wait() => {
                        info!("🧹 Stay scheduler shutting down");
                        break;
                    }
                }
            }

            info!("🧹 Stay scheduler stopped");
        })
    }
}

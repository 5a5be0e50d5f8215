//! The daemon loop: periodically evaluates the switch and sends notifications.

use crate::config::ServerConfig;
use crate::state::VaultState;
use anyhow::{Context, Result};
use ghostvault_core::{Clock, LocalAttestor, SystemClock, Timestamp};
use ghostvault_notify::NotificationService;
use ghostvault_switch::{
    evaluate_heartbeat, HeartbeatAction, HeartbeatConfig, InactivityTimer, Remaining,
};
use std::time::Duration;

/// Outcome of one check cycle
#[derive(Debug, Clone)]
pub struct CycleReport {
    pub action: HeartbeatAction,
    pub remaining: Remaining,
    /// This cycle was the first to see the switch fired
    pub fired_now: bool,
    pub heir_notified: bool,
}

/// Run the daemon loop. Blocks forever (until shutdown signal).
pub async fn run(config: ServerConfig) -> Result<()> {
    log::info!("GhostVault server starting…");
    log::info!("  Vault:      {} (owner {})", config.vault.label, config.vault.owner);
    log::info!("  Heir:       {}", config.vault.heir_address);
    log::info!("  Threshold:  {}", config.threshold()?);
    log::info!(
        "  Interval:   {} seconds ({:.1} hours)",
        config.server.check_interval_secs,
        config.server.check_interval_secs as f64 / 3600.0
    );
    log::info!("  Data dir:   {}", config.server.data_dir.display());

    std::fs::create_dir_all(&config.server.data_dir).with_context(|| {
        format!(
            "Failed to create data dir: {}",
            config.server.data_dir.display()
        )
    })?;

    let interval = Duration::from_secs(config.server.check_interval_secs);

    // Run first check immediately, then loop
    let mut first = true;
    loop {
        if !first {
            log::info!(
                "Sleeping {} seconds until next check…",
                config.server.check_interval_secs
            );
            tokio::time::sleep(interval).await;
        }
        first = false;

        match run_check_cycle(&config).await {
            Ok(report) => log::info!("Check cycle completed: {:?}", report.action),
            Err(e) => log::error!("Check cycle failed: {:#}", e),
        }
    }
}

/// Execute a single check cycle against the wall clock.
pub async fn run_check_cycle(config: &ServerConfig) -> Result<CycleReport> {
    check_cycle_at(config, SystemClock.now()).await
}

/// Execute a single check cycle as of `now`: evaluate the heartbeat, latch
/// firing, notify the owner, and tell the heir once the switch has fired.
pub async fn check_cycle_at(config: &ServerConfig, now: Timestamp) -> Result<CycleReport> {
    log::info!("Starting check cycle…");

    let path = config.state_path();
    let mut state = VaultState::load_or_init(&path, now, config.threshold()?)
        .with_context(|| format!("Failed to load state from {}", path.display()))?;
    state.apply_threshold(config.threshold()?);

    let status = evaluate_heartbeat(
        &config.vault.label,
        &state.record,
        now,
        &HeartbeatConfig::default(),
    );
    let unlock = format_timestamp(state.record.unlock_time());

    match status.action {
        HeartbeatAction::Healthy => {
            log::info!("[{}] Healthy: {} remaining", status.label, status.remaining)
        }
        HeartbeatAction::CheckinRecommended => log::info!(
            "[{}] Proof of life recommended: {} remaining (fires {})",
            status.label,
            status.remaining,
            unlock
        ),
        HeartbeatAction::CheckinRequired => log::warn!(
            "[{}] Proof of life required: {} remaining (fires {})",
            status.label,
            status.remaining,
            unlock
        ),
        HeartbeatAction::Expired => {
            log::warn!("[{}] Switch fired at {}", status.label, unlock)
        }
    }

    let fired_now = state.observe_fired(now);
    if fired_now {
        log::warn!(
            "[{}] First observation of firing; beneficiary {} may now claim",
            status.label,
            config.vault.heir_address
        );
    }

    let service = NotificationService::new(config.notify_config());
    if service.config().has_enabled_channel() {
        match service
            .check_and_notify(&config.vault.label, status.remaining.as_days_f64())
            .await
        {
            Ok(Some(level)) => log::info!("Owner notification sent: {:?}", level),
            Ok(None) => log::info!("No owner notification needed."),
            Err(e) => log::error!("Owner notification error: {}", e),
        }
    } else {
        log::debug!("No notification channels configured.");
    }

    if state.fired_at.is_some() && !state.heir_notified {
        notify_heir(config, &service, &mut state).await;
    }

    state.last_check = Some(now);
    state
        .save_merged(&path)
        .with_context(|| format!("Failed to save state to {}", path.display()))?;

    Ok(CycleReport {
        action: status.action,
        remaining: status.remaining,
        fired_now,
        heir_notified: state.heir_notified,
    })
}

/// Tell the heir the vault is claimable. Failures are retried next cycle.
async fn notify_heir(
    config: &ServerConfig,
    service: &NotificationService,
    state: &mut VaultState,
) {
    let Some(ref heir_email) = config.vault.heir_email else {
        log::warn!("Cannot notify heir: no heir_email configured.");
        return;
    };
    if !service.config().has_enabled_channel() {
        log::warn!("Cannot notify heir: no notification channel configured.");
        return;
    }

    match service
        .notify_heir(&config.vault.label, heir_email, &config.vault.heir_address)
        .await
    {
        Ok(()) => {
            log::info!("Heir notified at {}", heir_email);
            state.heir_notified = true;
        }
        Err(e) => log::error!("Heir notification to {} failed: {}", heir_email, e),
    }
}

/// Record a local proof of life against the wall clock.
pub async fn record_ping(config: &ServerConfig) -> Result<Timestamp> {
    ping_with_clock(config, SystemClock).await
}

/// Record a proof of life attested by this host, as of `clock`.
pub async fn ping_with_clock<C>(config: &ServerConfig, clock: C) -> Result<Timestamp>
where
    C: Clock + Clone,
{
    let path = config.state_path();
    let mut state = VaultState::load_or_init(&path, clock.now(), config.threshold()?)
        .with_context(|| format!("Failed to load state from {}", path.display()))?;
    state.apply_threshold(config.threshold()?);

    let timer =
        InactivityTimer::from_record(config.vault.owner.clone(), clock.clone(), state.record);
    let last_ping = timer
        .ping(&LocalAttestor::with_clock(clock))
        .await
        .context("Proof of life failed")?;

    if let Some(fired_at) = state.record_ping(timer.snapshot()) {
        log::warn!(
            "Proof of life accepted after the switch fired ({}); the heir may already have been notified",
            format_timestamp(fired_at)
        );
    }

    state
        .save_merged(&path)
        .with_context(|| format!("Failed to save state to {}", path.display()))?;
    log::info!(
        "Proof of life recorded; switch now fires {}",
        format_timestamp(state.record.unlock_time())
    );
    Ok(last_ping)
}

/// RFC 3339 rendering of a timestamp, for logs and console output.
pub fn format_timestamp(ts: Timestamp) -> String {
    i64::try_from(ts.as_millis())
        .ok()
        .and_then(chrono::DateTime::<chrono::Utc>::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| ts.to_string())
}

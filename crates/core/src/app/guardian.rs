use std::sync::Arc;

use chrono::{
  DateTime,
  Months,
  Utc
};
use serde_json::json;
use tokio::sync::RwLock;
use tracing::{
  error,
  info,
  warn
};

use crate::domain::guardian::{
  BloatFinding,
  CleanupReport,
  DatabaseStats,
  ExhaustionPrediction,
  GuardianError,
  GuardianPolicy,
  GuardianSnapshot,
  HealthReport,
  HealthStatus,
  SurvivalAction,
  SurvivalReport,
  detect_bloat,
  predict_exhaustion
};
use crate::infra::system_clock::epoch_ms_to_utc;
use crate::ports::clock::Clock;
use crate::ports::storage::StorageProbe;

const MAX_ALERTS: usize = 20;

/// Watches storage usage against a fixed
/// ceiling and prunes old rows when the
/// deployment is about to run out.
pub struct Guardian<P, C>
where
  P: StorageProbe + ?Sized,
  C: Clock
{
  policy: GuardianPolicy,
  probe: Arc<P>,
  clock: Arc<C>,
  snapshot: Arc<RwLock<GuardianSnapshot>>
}

impl<P, C> Clone for Guardian<P, C>
where
  P: StorageProbe + ?Sized,
  C: Clock
{
  fn clone(&self) -> Self {
    Self {
      policy: self.policy.clone(),
      probe: Arc::clone(&self.probe),
      clock: Arc::clone(&self.clock),
      snapshot: Arc::clone(
        &self.snapshot
      )
    }
  }
}

impl<P, C> Guardian<P, C>
where
  P: StorageProbe + ?Sized,
  C: Clock
{
  pub fn new(
    policy: GuardianPolicy,
    probe: Arc<P>,
    clock: Arc<C>
  ) -> Self {
    Self {
      policy,
      probe,
      clock,
      snapshot: Arc::new(RwLock::new(
        GuardianSnapshot::default()
      ))
    }
  }

  pub fn policy(
    &self
  ) -> &GuardianPolicy {
    &self.policy
  }

  pub async fn snapshot(
    &self
  ) -> GuardianSnapshot {
    self.snapshot.read().await.clone()
  }

  async fn now(&self) -> DateTime<Utc> {
    epoch_ms_to_utc(
      self.clock.now_epoch_ms().await
    )
  }

  pub async fn database_stats(
    &self
  ) -> Result<DatabaseStats, GuardianError>
  {
    let raw =
      self.probe.storage_stats().await?;

    let stats = DatabaseStats::from_raw(
      raw,
      &self.policy
    );

    self.snapshot.write().await.db_size =
      stats.total_size;

    Ok(stats)
  }

  pub async fn detect_bloat(
    &self
  ) -> Result<Vec<BloatFinding>, GuardianError>
  {
    let stats =
      self.database_stats().await?;
    Ok(detect_bloat(&stats, &self.policy))
  }

  pub async fn predict_exhaustion(
    &self
  ) -> Result<
    ExhaustionPrediction,
    GuardianError
  > {
    let stats =
      self.database_stats().await?;
    Ok(predict_exhaustion(
      &stats,
      &self.policy
    ))
  }

  /// Prunes inactive announcements past
  /// their retention and attendance rows
  /// past theirs. A failed step is
  /// recorded in `errors`; the other step
  /// still runs.
  pub async fn cleanup_old_data(
    &self
  ) -> CleanupReport {
    let now = self.now().await;
    let mut report =
      CleanupReport::default();

    let announcement_cutoff = months_before(
      now,
      self.policy.announcement_retention_months
    );

    match self
      .probe
      .purge_inactive_announcements(
        announcement_cutoff
      )
      .await
    {
      | Ok(n) => {
        report.announcements_archived = n
      }
      | Err(e) => {
        error!(error = %e, "announcement cleanup failed");
        report.errors.push(e.to_string());
      }
    }

    let attendance_cutoff = months_before(
      now,
      self.policy.attendance_retention_months
    );

    match self
      .probe
      .purge_attendance_before(
        attendance_cutoff
      )
      .await
    {
      | Ok(n) => {
        report.attendance_archived = n
      }
      | Err(e) => {
        error!(error = %e, "attendance cleanup failed");
        report.errors.push(e.to_string());
      }
    }

    info!(
      announcements = report.announcements_archived,
      attendance = report.attendance_archived,
      "cleanup finished"
    );

    report
  }

  /// One cleanup pass plus two recorded
  /// actions. Write restriction is noted
  /// for operators, not enforced.
  pub async fn activate_survival_mode(
    &self
  ) -> SurvivalReport {
    warn!("activating survival mode");

    let cleanup =
      self.cleanup_old_data().await;

    let mut actions = vec![
      SurvivalAction {
        action: "Data Cleanup"
          .to_string(),
        result: serde_json::to_value(
          &cleanup
        )
        .unwrap_or_default()
      },
    ];

    actions.push(SurvivalAction {
      action: "Restrict Writes"
        .to_string(),
      result: json!({
        "status": "recorded",
        "enforced": false,
        "message": "Non-essential writes should be paused until storage is freed"
      })
    });

    let alert = "Storage critical: survival mode activated";
    error!("{alert}");
    self.push_alert(alert.to_string()).await;

    actions.push(SurvivalAction {
      action: "Admin Alert".to_string(),
      result: json!({
        "status": "logged",
        "message": alert
      })
    });

    SurvivalReport {
      mode: "SURVIVAL".to_string(),
      timestamp: self.now().await,
      actions
    }
  }

  /// Single stats read; bloat and the
  /// prediction derive from it. Never
  /// fails.
  pub async fn run_health_check(
    &self
  ) -> HealthReport {
    let timestamp = self.now().await;

    let stats =
      match self.database_stats().await {
        | Ok(stats) => stats,
        | Err(e) => {
          error!(error = %e, "health check could not read storage stats");
          self
            .record_check(timestamp, None)
            .await;
          return HealthReport {
            timestamp,
            database: None,
            bloat: Vec::new(),
            prediction: None,
            cleanup: None,
            survival_mode: false
          };
        }
      };

    let bloat =
      detect_bloat(&stats, &self.policy);
    let prediction = predict_exhaustion(
      &stats,
      &self.policy
    );

    info!(
      status = %prediction.status,
      usage = %prediction.current_usage,
      bloat = bloat.len(),
      "health check"
    );

    if prediction.status
      == HealthStatus::Warning
    {
      self
        .push_alert(format!(
          "Storage warning: {} used",
          prediction.current_usage
        ))
        .await;
    }

    let cleanup = if prediction.status
      == HealthStatus::Critical
    {
      Some(
        self.activate_survival_mode().await
      )
    } else {
      None
    };

    self
      .record_check(
        timestamp,
        Some(prediction.status)
      )
      .await;

    HealthReport {
      timestamp,
      survival_mode: cleanup.is_some(),
      database: Some(stats),
      bloat,
      prediction: Some(prediction),
      cleanup
    }
  }

  async fn record_check(
    &self,
    at: DateTime<Utc>,
    status: Option<HealthStatus>
  ) {
    let mut snap =
      self.snapshot.write().await;
    snap.last_check = Some(at);
    snap.last_status = status;
  }

  async fn push_alert(
    &self,
    alert: String
  ) {
    let mut snap =
      self.snapshot.write().await;
    snap.alerts.push(alert);
    if snap.alerts.len() > MAX_ALERTS {
      let excess =
        snap.alerts.len() - MAX_ALERTS;
      snap.alerts.drain(..excess);
    }
  }
}

fn months_before(
  now: DateTime<Utc>,
  months: u32
) -> DateTime<Utc> {
  now
    .checked_sub_months(Months::new(
      months
    ))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

use std::time::Duration;

use tracing::info;

use crate::app::guardian::Guardian;
use crate::domain::guardian::HealthReport;
use crate::ports::clock::Clock;
use crate::ports::storage::StorageProbe;

pub struct GuardianScheduler;

impl GuardianScheduler {
  /// Checks once right away, then on every
  /// tick of the policy interval, handing
  /// each report to `after_check`. Never
  /// returns.
  pub async fn run_forever<P, C, F>(
    guardian: Guardian<P, C>,
    after_check: F
  ) where
    P: StorageProbe + ?Sized + 'static,
    C: Clock + 'static,
    F: Fn(&HealthReport) + Send + 'static
  {
    let period = Duration::from_secs(
      guardian
        .policy()
        .interval_seconds
        .max(1)
    );

    info!(
      interval_secs = period.as_secs(),
      "storage guardian started"
    );

    let mut interval =
      tokio::time::interval(period);

    loop {
      interval.tick().await;

      let report =
        guardian.run_health_check().await;

      let status = report
        .prediction
        .as_ref()
        .map(|p| p.status.to_string())
        .unwrap_or_else(|| {
          "UNKNOWN".to_string()
        });

      info!(
        status = %status,
        survival = report.survival_mode,
        "scheduled health check complete"
      );

      after_check(&report);
    }
  }
}

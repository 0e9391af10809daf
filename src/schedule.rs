//! Midnight scheduling for the auto-clear job.

use std::future::Future;
use std::time::Duration;
use time::OffsetDateTime;

const ONE_DAY: Duration = Duration::from_secs(24 * 60 * 60);

/// Current local time, or UTC when the local offset cannot be determined.
pub fn local_now() -> OffsetDateTime {
    OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
}

/// Start of the day after `now`, in `now`'s offset.
pub fn next_midnight(now: OffsetDateTime) -> Option<OffsetDateTime> {
    let tomorrow = now.date().next_day()?;
    Some(tomorrow.midnight().assume_offset(now.offset()))
}

pub fn duration_until_midnight(now: OffsetDateTime) -> Duration {
    next_midnight(now)
        .and_then(|midnight| Duration::try_from(midnight - now).ok())
        .unwrap_or(ONE_DAY)
}

/// Sleeps until each local midnight and runs `job`, forever.
pub async fn run_at_midnight<F, Fut>(mut job: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    loop {
        let wait = duration_until_midnight(local_now());
        tracing::debug!(wait_secs = wait.as_secs(), "next auto-clear scheduled");
        tokio::time::sleep(wait).await;
        job().await;
    }
}

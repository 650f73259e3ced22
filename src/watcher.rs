//! Foreground reminder loop behind `rmd watch`.

use std::thread;
use std::time::{Duration, Instant};

use crate::alarm::Alarm;
use crate::notification::Notifier;
use crate::repository::Clock;
use crate::service::{ServiceError, TaskService};

pub struct Watcher<'a, C: Clock> {
    service: TaskService<C>,
    notifier: &'a mut dyn Notifier,
    poll_interval: Duration,
    resync_interval: Duration,
    last_sync: Option<Instant>,
}

impl<'a, C: Clock> Watcher<'a, C> {
    pub fn new(
        service: TaskService<C>,
        notifier: &'a mut dyn Notifier,
        poll_interval: Duration,
        resync_interval: Duration,
    ) -> Self {
        Self {
            service,
            notifier,
            poll_interval: poll_interval.max(Duration::from_millis(100)),
            resync_interval,
            last_sync: None,
        }
    }

    pub fn service(&self) -> &TaskService<C> {
        &self.service
    }

    /// One pass: resync with the store when due, then fire expired alarms
    pub fn tick(&mut self, now: Instant) -> Result<Vec<Alarm>, ServiceError> {
        let needs_sync = match self.last_sync {
            None => true,
            Some(last) => now.duration_since(last) >= self.resync_interval,
        };
        if needs_sync {
            let queued = self.service.resync_alarms()?;
            log::debug!("event=watch_resync queued={}", queued);
            self.last_sync = Some(now);
        }
        Ok(self.service.fire_due(&mut *self.notifier))
    }

    /// Poll until `stop` returns true
    pub fn run_until(&mut self, mut stop: impl FnMut() -> bool) -> Result<(), ServiceError> {
        log::info!(
            "event=watch_start poll_ms={} resync_ms={}",
            self.poll_interval.as_millis(),
            self.resync_interval.as_millis()
        );
        while !stop() {
            if let Err(e) = self.tick(Instant::now()) {
                // Store may be locked by another process; try again next poll
                log::error!("event=watch_tick status=error error={}", e);
            }
            thread::sleep(self.poll_interval);
        }
        log::info!("event=watch_stop");
        Ok(())
    }
}

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use crate::{
    timer::{self, Instant},
    CooldownOptions,
};

#[derive(Debug)]
struct CooldownRecord {
    last_start: Option<Instant>,
    interval: Duration,
    escalated: bool,
}

/// Per-client spacing of operation start times.
///
/// Each logical client owns one record: the start time of its latest
/// operation and the current minimum interval. Records are created lazily
/// on first use and live as long as the registry.
#[derive(Clone, Debug)]
pub struct CooldownRegistry {
    options: CooldownOptions,
    records: Arc<Mutex<HashMap<String, CooldownRecord>>>,
}

impl CooldownRegistry {
    /// Empty registry; every client starts at `options.min_interval_ms`.
    pub fn new(options: CooldownOptions) -> Self {
        Self {
            options,
            records: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CooldownRecord>> {
        // Records hold plain values, so a panic elsewhere cannot leave them torn.
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn record<'a>(
        &self,
        records: &'a mut HashMap<String, CooldownRecord>,
        client: &str,
    ) -> &'a mut CooldownRecord {
        records
            .entry(client.to_owned())
            .or_insert_with(|| CooldownRecord {
                last_start: None,
                interval: Duration::from_millis(self.options.min_interval_ms),
                escalated: false,
            })
    }

    /// Waits until `client` may start its next operation and claims that slot.
    ///
    /// The slot is reserved under the lock before sleeping, so concurrent
    /// callers for the same client receive distinct starts spaced by at
    /// least the interval. Returns the reserved start time.
    pub async fn acquire(&self, client: &str) -> Instant {
        let now = Instant::now();
        let start = {
            let mut records = self.lock();
            let record = self.record(&mut records, client);
            let start = match record.last_start {
                Some(last) => (last + record.interval).max(now),
                None => now,
            };
            record.last_start = Some(start);
            start
        };

        if start > now {
            #[cfg(feature = "tracing")]
            tracing::debug!(
                client,
                wait_ms = start.saturating_duration_since(now).as_millis() as u64,
                "cooling down before next request"
            );
            timer::sleep_until(start).await;
        }
        start
    }

    /// Raises `client`'s interval to the escalated value for the rest of the
    /// registry's lifetime. Returns `true` on the first escalation.
    pub fn escalate(&self, client: &str) -> bool {
        let escalated = Duration::from_millis(self.options.escalated_interval_ms);
        let mut records = self.lock();
        let record = self.record(&mut records, client);
        if record.escalated {
            return false;
        }
        record.escalated = true;
        record.interval = record.interval.max(escalated);

        #[cfg(feature = "tracing")]
        tracing::warn!(
            client,
            interval_ms = record.interval.as_millis() as u64,
            "rate limit observed, widening cooldown"
        );
        true
    }

    /// Current minimum interval between operations of `client`.
    pub fn interval(&self, client: &str) -> Duration {
        self.lock()
            .get(client)
            .map(|record| record.interval)
            .unwrap_or_else(|| Duration::from_millis(self.options.min_interval_ms))
    }
}

impl Default for CooldownRegistry {
    fn default() -> Self {
        Self::new(CooldownOptions::default())
    }
}

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, trace};

use crate::Shared;

/// Handle to the background sweeper thread.
///
/// The channel doubles as the sleep timer and the stop signal: the sweeper
/// waits on `recv_timeout(period)`, so a message (or the sender going away)
/// wakes it immediately. Dropping the handle joins the thread, which is the
/// cache's deterministic replacement for finalizer-driven shutdown.
pub(crate) struct Janitor {
    stop: flume::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl Janitor {
    pub(crate) fn spawn(shared: Arc<Shared>, period: Duration) -> Self {
        let (stop, wake) = flume::bounded(1);
        let handle = std::thread::Builder::new()
            .name("growcache-janitor".to_string())
            .spawn(move || run(shared, period, wake))
            .unwrap();
        Self {
            stop,
            handle: Some(handle),
        }
    }
}

impl Drop for Janitor {
    fn drop(&mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        debug!("janitor stopped");
    }
}

fn run(shared: Arc<Shared>, period: Duration, wake: flume::Receiver<()>) {
    debug!(?period, "janitor started");
    loop {
        match wake.recv_timeout(period) {
            Err(flume::RecvTimeoutError::Timeout) => {
                shared.sweep();
            }
            // Stop requested, or the cache went away entirely.
            Ok(()) | Err(flume::RecvTimeoutError::Disconnected) => return,
        }
    }
}

impl Shared {
    /// One second-chance pass over the current generation.
    ///
    /// Items whose touch counter reached zero are reported to the eviction
    /// callback and removed; everything else is counted down. An item
    /// inserted or read between two sweeps therefore survives the first and
    /// is evicted no later than the second.
    pub(crate) fn sweep(&self) -> u64 {
        let table = self.table.load();
        let mut evicted: u64 = 0;

        for bucket in table.buckets() {
            let mut items = bucket.write();
            let mut i = 0;
            while i < items.len() {
                if items[i].touch_value() == 0 {
                    if let Some(callback) = self.callback.as_ref() {
                        callback.on_evict(&items[i].key, &items[i].value);
                    }
                    // Swap-with-last keeps removal O(1); the swapped-in
                    // item is re-examined at the same index.
                    items.swap_remove(i);
                    evicted += 1;
                } else {
                    items[i]
                        .touch
                        .fetch_sub(1, std::sync::atomic::Ordering::Relaxed);
                    i += 1;
                }
            }
        }

        if evicted > 0 {
            self.count.add(evicted, true);
            self.metrics.expire.add(evicted);
        }
        self.metrics.sweep.increment();
        trace!(evicted, "sweep finished");
        evicted
    }
}

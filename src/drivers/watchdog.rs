//! Main loop stall guard.
//!
//! On device the loop task is subscribed to the ESP-IDF Task Watchdog
//! (TWDT), which panics and reboots if the loop stops feeding it.  The
//! guard also tracks the longest gap between feeds so that slow
//! collaborators (a full WiFi reconnect, an MQTT connect) show up in the
//! log before they grow into a reset.

use log::warn;

/// Default stall budget for the main loop.
pub const DEFAULT_TIMEOUT_MS: u32 = 30_000;

pub struct Watchdog {
    timeout_ms: u32,
    last_feed_ms: Option<u32>,
    longest_gap_ms: u32,
    feeds: u64,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Default for Watchdog {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT_MS)
    }
}

impl Watchdog {
    /// Arm the guard for the calling task.
    pub fn new(timeout_ms: u32) -> Self {
        #[cfg(target_os = "espidf")]
        let subscribed = twdt::subscribe(timeout_ms);
        #[cfg(not(target_os = "espidf"))]
        log::info!("Watchdog(sim): {}ms budget", timeout_ms);

        Self {
            timeout_ms,
            last_feed_ms: None,
            longest_gap_ms: 0,
            feeds: 0,
            #[cfg(target_os = "espidf")]
            subscribed,
        }
    }

    /// Feed the guard.  Call once per main loop iteration.
    pub fn feed(&mut self, now_ms: u32) {
        if let Some(last) = self.last_feed_ms {
            let gap = now_ms.wrapping_sub(last);
            if gap > self.longest_gap_ms {
                self.longest_gap_ms = gap;
                if gap > self.timeout_ms / 2 {
                    warn!(
                        "Watchdog: loop stalled {}ms (budget {}ms)",
                        gap, self.timeout_ms
                    );
                }
            }
        }
        self.last_feed_ms = Some(now_ms);
        self.feeds = self.feeds.wrapping_add(1);

        #[cfg(target_os = "espidf")]
        if self.subscribed {
            twdt::reset();
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    /// Longest interval between two consecutive feeds.
    pub fn longest_gap_ms(&self) -> u32 {
        self.longest_gap_ms
    }

    pub fn feeds(&self) -> u64 {
        self.feeds
    }
}

#[cfg(target_os = "espidf")]
mod twdt {
    use esp_idf_svc::sys::{
        ESP_OK, esp_task_wdt_add, esp_task_wdt_config_t, esp_task_wdt_reconfigure,
        esp_task_wdt_reset,
    };
    use log::{info, warn};

    /// Reconfigure the TWDT and add the current task.  Returns whether
    /// the task is now watched.
    pub fn subscribe(timeout_ms: u32) -> bool {
        let cfg = esp_task_wdt_config_t {
            timeout_ms,
            idle_core_mask: 0,
            trigger_panic: true,
        };
        // SAFETY: plain FFI calls; `cfg` outlives the call and a null
        // handle means the current task.
        let (reconf, add) = unsafe {
            (
                esp_task_wdt_reconfigure(&cfg),
                esp_task_wdt_add(core::ptr::null_mut()),
            )
        };
        if reconf != ESP_OK {
            warn!("Watchdog: reconfigure returned {}", reconf);
        }
        if add == ESP_OK {
            info!("Watchdog: armed ({}ms, panic on trigger)", timeout_ms);
            true
        } else {
            warn!("Watchdog: subscribe failed ({}), loop unguarded", add);
            false
        }
    }

    pub fn reset() {
        // SAFETY: only called after a successful `esp_task_wdt_add`.
        unsafe {
            esp_task_wdt_reset();
        }
    }
}

//! Application supervisor and monitoring
//!
//! Prints the startup banner and a periodic status line with the playback
//! state.

use embassy_time::{Duration, Timer};

use crate::channels::PLAYBACK;
use crate::config::*;

/// Application supervisor responsible for monitoring
pub struct AppSupervisor {
    uptime_seconds: u32,
    last_heartbeat: u32,
}

impl AppSupervisor {
    pub fn new() -> Self {
        Self {
            uptime_seconds: 0,
            last_heartbeat: 0,
        }
    }

    /// Print application startup banner
    pub fn print_startup_banner(&self) {
        info!("========================================");
        info!("Pico Duck v{}", FIRMWARE_VERSION);
        info!("Scriptable USB keyboard/mouse injector");
        info!("========================================");
        info!("Hardware: RP2040 (Raspberry Pi Pico)");
        info!("USB: VID=0x{:x} PID=0x{:x}", USB_VID, USB_PID);
        info!(
            "Script: {} records at flash offset 0x{:x}",
            SCRIPT_CAPACITY, SCRIPT_FLASH_OFFSET
        );
        info!("Tick: {} ms", TICK_PERIOD_MS);
        info!("========================================");
    }

    pub fn print_init_success(&self) {
        info!("Pico Duck initialized successfully");
    }

    /// Run the main supervisor loop
    pub async fn run(&mut self) {
        info!("Application supervisor started");

        loop {
            Timer::after(Duration::from_secs(STATUS_INTERVAL_SECS)).await;
            self.uptime_seconds += STATUS_INTERVAL_SECS as u32;

            if self.uptime_seconds - self.last_heartbeat >= STATUS_REPORT_SECS {
                self.print_status();
                self.last_heartbeat = self.uptime_seconds;
            }
        }
    }

    fn print_status(&self) {
        let minutes = self.uptime_seconds / 60;
        let hours = minutes / 60;
        let state = if PLAYBACK.is_paused() { "paused" } else { "running" };

        if hours > 0 {
            info!(
                "Status: Uptime {}h{}m, playback {} at record {}",
                hours,
                minutes % 60,
                state,
                PLAYBACK.cursor()
            );
        } else {
            info!(
                "Status: Uptime {}m, playback {} at record {}",
                minutes,
                state,
                PLAYBACK.cursor()
            );
        }
    }

    pub fn uptime(&self) -> u32 {
        self.uptime_seconds
    }
}

impl Default for AppSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

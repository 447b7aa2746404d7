//! Pico Duck firmware
//!
//! Replays the HID script stored in flash and serves the command console
//! over USB serial.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use {defmt_rtt as _, panic_halt as _};

use picoduck::hardware;
use picoduck::supervisor::AppSupervisor;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let mut supervisor = AppSupervisor::new();
    supervisor.print_startup_banner();

    let p = embassy_rp::init(Default::default());

    if let Err(e) = hardware::init_hardware_tasks(&spawner, p) {
        error!("Failed to spawn tasks: {:?}", e);
        core::panic!("Hardware initialization failed");
    }

    supervisor.print_init_success();
    supervisor.run().await;
}

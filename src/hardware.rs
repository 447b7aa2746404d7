//! Hardware abstraction and initialization
//!
//! Owns the RP2040 peripherals used by the firmware: the QSPI flash holding
//! the script, the USB controller and the activity LED. Builds the shared
//! script store and spawns every task.

use core::cell::RefCell;

use embassy_executor::{SpawnError, Spawner};
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Level, Output};
use embassy_rp::peripherals::FLASH;
use embassy_rp::usb::Driver;
use embassy_rp::Peripherals;
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use static_cell::StaticCell;

use crate::channels::ACTIVITY;
use crate::config::{FLASH_SIZE, LED_ACTIVITY_PIN, SCRIPT_FLASH_OFFSET, SCRIPT_REGION_SIZE};
use crate::engine::playback_task;
use crate::store::FlashStore;
use crate::usb::usb_task;

/// On-board QSPI flash in blocking mode
pub type ScriptFlash = Flash<'static, FLASH, Blocking, FLASH_SIZE>;

pub type ScriptFlashStore = FlashStore<ScriptFlash>;

/// Script store shared by the console and the playback task.
/// Both run on the thread-mode executor, so a lock never contends.
pub type SharedScriptStore = Mutex<ThreadModeRawMutex, RefCell<ScriptFlashStore>>;

static SCRIPT_STORE: StaticCell<SharedScriptStore> = StaticCell::new();

/// Initialize peripherals and spawn the USB, playback and LED tasks
pub fn init_hardware_tasks(spawner: &Spawner, p: Peripherals) -> Result<(), SpawnError> {
    let flash = ScriptFlash::new_blocking(p.FLASH);
    let store = FlashStore::new(flash, SCRIPT_FLASH_OFFSET, SCRIPT_REGION_SIZE);
    let store: &'static SharedScriptStore = SCRIPT_STORE.init(Mutex::new(RefCell::new(store)));
    info!(
        "Script region at 0x{:x}, {} bytes",
        SCRIPT_FLASH_OFFSET, SCRIPT_REGION_SIZE
    );

    let driver = Driver::new(p.USB, crate::Irqs);
    let activity_led = Output::new(p.PIN_25, Level::Low);
    info!("Activity LED on GPIO{}", LED_ACTIVITY_PIN);

    spawner.spawn(usb_task(driver, store))?;
    spawner.spawn(playback_task(store))?;
    spawner.spawn(activity_task(activity_led))?;

    Ok(())
}

/// Toggles the activity LED whenever a report goes out or a console byte arrives
#[embassy_executor::task]
pub async fn activity_task(mut led: Output<'static>) {
    info!("Activity LED task started");

    loop {
        ACTIVITY.wait().await;
        led.toggle();
    }
}

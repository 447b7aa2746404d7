//! USB composite device
//!
//! One HID interface carries the keyboard (report ID 1) and mouse (report
//! ID 2) input reports produced by the playback engine. A CDC-ACM interface
//! carries the command console.

use embassy_futures::join::join3;
use embassy_rp::peripherals::USB;
use embassy_rp::usb::Driver;
use embassy_usb::class::cdc_acm::{CdcAcmClass, State as CdcState};
use embassy_usb::class::hid::{Config as HidConfig, HidWriter, ReportId, RequestHandler, State as HidState};
use embassy_usb::control::OutResponse;
use embassy_usb::driver::EndpointError;
use embassy_usb::{Builder, Config};
use static_cell::StaticCell;

use crate::channels::{ACTIVITY, HID_REPORT_CHANNEL, PLAYBACK};
use crate::command::{Dispatcher, Workspace};
use crate::config::*;
use crate::hardware::SharedScriptStore;
use crate::serial::{Console, Reply};

type UsbDriver = Driver<'static, USB>;

// ===================================================================
// HID Report Descriptor (boot keyboard + relative mouse)
// ===================================================================

const HID_REPORT_DESCRIPTOR: &[u8] = &[
    // Keyboard
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x06, // Usage (Keyboard)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x01, //   Report ID (1)
    0x05, 0x07, //   Usage Page (Key Codes)
    0x19, 0xE0, //   Usage Minimum (224)
    0x29, 0xE7, //   Usage Maximum (231)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x08, //   Report Count (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute) modifiers
    0x81, 0x01, //   Input (Constant) reserved byte
    0x19, 0x00, //   Usage Minimum (0)
    0x29, 0x65, //   Usage Maximum (101)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x65, //   Logical Maximum (101)
    0x75, 0x08, //   Report Size (8)
    0x95, 0x06, //   Report Count (6)
    0x81, 0x00, //   Input (Data, Array) key codes
    0x05, 0x08, //   Usage Page (LEDs)
    0x19, 0x01, //   Usage Minimum (1)
    0x29, 0x05, //   Usage Maximum (5)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x05, //   Report Count (5)
    0x91, 0x02, //   Output (Data, Variable, Absolute) LED states
    0x95, 0x03, //   Report Count (3)
    0x91, 0x01, //   Output (Constant) padding
    0xC0, // End Collection
    // Mouse
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x02, // Usage (Mouse)
    0xA1, 0x01, // Collection (Application)
    0x85, 0x02, //   Report ID (2)
    0x09, 0x01, //   Usage (Pointer)
    0xA1, 0x00, //   Collection (Physical)
    0x05, 0x09, //     Usage Page (Buttons)
    0x19, 0x01, //     Usage Minimum (1)
    0x29, 0x03, //     Usage Maximum (3)
    0x15, 0x00, //     Logical Minimum (0)
    0x25, 0x01, //     Logical Maximum (1)
    0x95, 0x03, //     Report Count (3)
    0x75, 0x01, //     Report Size (1)
    0x81, 0x02, //     Input (Data, Variable, Absolute) buttons
    0x95, 0x01, //     Report Count (1)
    0x75, 0x05, //     Report Size (5)
    0x81, 0x01, //     Input (Constant) padding
    0x05, 0x01, //     Usage Page (Generic Desktop)
    0x09, 0x30, //     Usage (X)
    0x09, 0x31, //     Usage (Y)
    0x09, 0x38, //     Usage (Wheel)
    0x15, 0x81, //     Logical Minimum (-127)
    0x25, 0x7F, //     Logical Maximum (127)
    0x75, 0x08, //     Report Size (8)
    0x95, 0x03, //     Report Count (3)
    0x81, 0x06, //     Input (Data, Variable, Relative) x, y, wheel
    0xC0, //   End Collection
    0x09, 0x3C, //   Usage (Motion Wakeup)
    0x05, 0xFF, //   Usage Page (Vendor 0xFF)
    0x09, 0x01, //   Usage (1)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x75, 0x01, //   Report Size (1)
    0x95, 0x02, //   Report Count (2)
    0xB1, 0x22, //   Feature (Data, Variable, Absolute, No Preferred)
    0x75, 0x06, //   Report Size (6)
    0x95, 0x01, //   Report Count (1)
    0xB1, 0x01, //   Feature (Constant) padding
    0xC0, // End Collection
];

// ===================================================================
// USB Configuration
// ===================================================================

fn create_usb_config() -> Config<'static> {
    let mut config = Config::new(USB_VID, USB_PID);
    config.manufacturer = Some(USB_MANUFACTURER);
    config.product = Some(USB_PRODUCT);
    config.serial_number = Some(USB_SERIAL);
    config.max_power = USB_MAX_POWER_MA;
    config.max_packet_size_0 = 64;
    config.device_release = USB_BCD_DEVICE;

    // HID + CDC needs interface association descriptors
    config.device_class = 0xEF;
    config.device_sub_class = 0x02;
    config.device_protocol = 0x01;
    config.composite_with_iads = true;

    config
}

// ===================================================================
// HID Request Handler
// ===================================================================

/// Accepts keyboard LED output reports. Playback never reads them.
struct KeyboardLedHandler;

impl RequestHandler for KeyboardLedHandler {
    fn get_report(&mut self, id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        debug!("HID Get Report: ID={:?}", id);
        None
    }

    fn set_report(&mut self, id: ReportId, data: &[u8]) -> OutResponse {
        match (id, data) {
            (ReportId::Out(1), [.., leds]) => debug!("HID: keyboard LEDs 0x{:x}", leds),
            _ => debug!("HID Set Report: ID={:?}, len={}", id, data.len()),
        }
        OutResponse::Accepted
    }
}

// ===================================================================
// Static Buffers
// ===================================================================

struct UsbBuffers {
    config_descriptor: [u8; 256],
    bos_descriptor: [u8; 256],
    msos_descriptor: [u8; 256],
    control: [u8; 64],
}

static USB_BUFFERS: StaticCell<UsbBuffers> = StaticCell::new();
static HID_STATE: StaticCell<HidState> = StaticCell::new();
static CDC_STATE: StaticCell<CdcState> = StaticCell::new();
static REQUEST_HANDLER: StaticCell<KeyboardLedHandler> = StaticCell::new();

// Console buffers are too large for the task arena
static WORKSPACE: StaticCell<Workspace> = StaticCell::new();
static CONSOLE: StaticCell<Console<LINE_BUFFER_SIZE>> = StaticCell::new();
static REPLY: StaticCell<Reply> = StaticCell::new();

// ===================================================================
// USB Task Implementation
// ===================================================================

#[embassy_executor::task]
pub async fn usb_task(driver: UsbDriver, store: &'static SharedScriptStore) {
    info!("USB task started");

    let buffers = USB_BUFFERS.init(UsbBuffers {
        config_descriptor: [0; 256],
        bos_descriptor: [0; 256],
        msos_descriptor: [0; 256],
        control: [0; 64],
    });
    let mut builder = Builder::new(
        driver,
        create_usb_config(),
        &mut buffers.config_descriptor,
        &mut buffers.bos_descriptor,
        &mut buffers.msos_descriptor,
        &mut buffers.control,
    );

    let hid_config = HidConfig {
        report_descriptor: HID_REPORT_DESCRIPTOR,
        request_handler: Some(REQUEST_HANDLER.init(KeyboardLedHandler)),
        poll_ms: HID_POLL_RATE_MS,
        max_packet_size: HID_MAX_PACKET_SIZE,
    };
    let mut hid = HidWriter::<_, { HID_MAX_PACKET_SIZE as usize }>::new(
        &mut builder,
        HID_STATE.init(HidState::new()),
        hid_config,
    );
    info!("HID report descriptor: {} bytes", HID_REPORT_DESCRIPTOR.len());

    let mut serial = CdcAcmClass::new(&mut builder, CDC_STATE.init(CdcState::new()), CDC_PACKET_SIZE);

    let mut usb = builder.build();
    let usb_fut = usb.run();

    // Playback engine -> HID endpoint
    let hid_fut = async {
        let receiver = HID_REPORT_CHANNEL.receiver();
        loop {
            let packet = receiver.receive().await;
            if let Err(e) = hid.write(&packet).await {
                warn!("HID: report dropped: {:?}", e);
                hid.ready().await;
            }
        }
    };

    let console_fut = async {
        let mut dispatcher = Dispatcher::new(&PLAYBACK, WORKSPACE.init(Workspace::new()));
        let console = CONSOLE.init(Console::new());
        let reply = REPLY.init(Reply::new());

        loop {
            serial.wait_connection().await;
            info!("Console: terminal connected");
            match run_console(&mut serial, console, &mut dispatcher, store, reply).await {
                Ok(()) => {}
                Err(EndpointError::Disabled) => info!("Console: terminal disconnected"),
                Err(e) => warn!("Console: endpoint error: {:?}", e),
            }
        }
    };

    join3(usb_fut, hid_fut, console_fut).await;
}

async fn run_console<'d>(
    serial: &mut CdcAcmClass<'d, UsbDriver>,
    console: &mut Console<LINE_BUFFER_SIZE>,
    dispatcher: &mut Dispatcher<'_>,
    store: &SharedScriptStore,
    reply: &mut Reply,
) -> Result<(), EndpointError> {
    let mut packet = [0u8; CDC_PACKET_SIZE as usize];

    reply.clear();
    console.greet(reply);
    flush_reply(serial, reply).await?;

    loop {
        let len = serial.read_packet(&mut packet).await?;
        for &byte in &packet[..len] {
            ACTIVITY.signal(());
            let line_done = store.lock(|s| console.feed(byte, dispatcher, &mut *s.borrow_mut(), reply));
            // A packet can hold several lines, flush each reply before the next
            if line_done {
                flush_reply(serial, reply).await?;
            }
        }
        flush_reply(serial, reply).await?;
    }
}

/// Send the staged reply in max-packet chunks
async fn flush_reply<'d>(serial: &mut CdcAcmClass<'d, UsbDriver>, reply: &mut Reply) -> Result<(), EndpointError> {
    let max = CDC_PACKET_SIZE as usize;
    for chunk in reply.chunks(max) {
        serial.write_packet(chunk).await?;
    }
    // A full last packet needs a zero-length packet to end the transfer
    if !reply.is_empty() && reply.len() % max == 0 {
        serial.write_packet(&[]).await?;
    }
    reply.clear();
    Ok(())
}

mod common;

use common::Device;
use picoduck::config::{JIGGLER_WIDTH, SEND_RETRY_LIMIT};
use picoduck::engine::{Player, TickOutcome};
use picoduck::report::ReportKind;

const KEYBOARD: TickOutcome = TickOutcome::Sent {
    kind: ReportKind::Keyboard,
};
const MOUSE: TickOutcome = TickOutcome::Sent { kind: ReportKind::Mouse };

#[test]
fn test_ducky_script_playback() {
    let mut device = Device::new();
    // 'a' followed by a two tick delay
    assert_eq!(device.command("d04000002"), "wrote flash");
    assert_eq!(device.command("p"), "resumed");

    let outcomes = device.run_ticks(7);
    assert_eq!(
        outcomes,
        vec![
            KEYBOARD,
            KEYBOARD,
            TickOutcome::DelayArmed { ticks: 2 },
            TickOutcome::Delaying { remaining: 1 },
            TickOutcome::DelayElapsed,
            TickOutcome::Rewound,
            KEYBOARD,
        ]
    );
    assert_eq!(device.sink.packets[0], vec![1, 0, 1, 4, 0, 0, 0, 0, 0]);
    assert_eq!(device.sink.packets[1], vec![1, 0, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_jiggler_returns_to_origin() {
    let mut device = Device::new();
    assert_eq!(device.command("j"), "wrote flash");
    device.command("p");

    let outcomes = device.run_ticks(2 * JIGGLER_WIDTH + 1);
    assert!(outcomes[..2 * JIGGLER_WIDTH].iter().all(|o| *o == MOUSE));
    assert_eq!(outcomes[2 * JIGGLER_WIDTH], TickOutcome::Rewound);

    let dx: i32 = device.sink.packets.iter().map(|p| i32::from(p[2] as i8)).sum();
    assert_eq!(dx, 0);
    assert!(device.sink.packets.iter().all(|p| p.len() == 5));
}

#[test]
fn test_single_step_from_console() {
    let mut device = Device::new();
    device.command("d0400");
    assert_eq!(device.command("s"), "step");

    assert_eq!(device.tick(), KEYBOARD);
    assert_eq!(device.run_ticks(3), vec![TickOutcome::Paused; 3]);
    assert_eq!(device.sink.packets.len(), 1);
    assert_eq!(device.command("@"), "01000000");

    device.command("s");
    assert_eq!(device.tick(), KEYBOARD);
    assert_eq!(device.command("@"), "02000000");
}

#[test]
fn test_single_step_runs_through_delay() {
    let mut device = Device::new();
    // delay 1, then 'a'
    device.command("d00010400");
    device.command("s");
    assert_eq!(
        device.run_ticks(4),
        vec![
            TickOutcome::DelayArmed { ticks: 1 },
            TickOutcome::DelayElapsed,
            KEYBOARD,
            TickOutcome::Paused,
        ]
    );
}

#[test]
fn test_pause_mid_delay_freezes_countdown() {
    let mut device = Device::new();
    device.command("d0003");
    device.command("p");
    assert_eq!(device.tick(), TickOutcome::DelayArmed { ticks: 3 });
    assert_eq!(device.tick(), TickOutcome::Delaying { remaining: 2 });

    device.command("p");
    assert_eq!(device.run_ticks(20), vec![TickOutcome::Paused; 20]);

    device.command("p");
    assert_eq!(device.tick(), TickOutcome::Delaying { remaining: 1 });
    assert_eq!(device.tick(), TickOutcome::DelayElapsed);
}

#[test]
fn test_reset_mid_delay() {
    let mut device = Device::new();
    // 'a' then a long delay
    device.command("d040000ff");
    device.command("p");
    device.run_ticks(4);
    assert!(device.player.is_delaying());

    assert_eq!(device.command("z"), "");
    assert_eq!(device.command("@"), "00000000");
    assert_eq!(device.tick(), KEYBOARD);
    assert!(!device.player.is_delaying());
}

#[test]
fn test_busy_transport_defers_report() {
    let mut device = Device::new();
    device.command("d0400");
    device.command("p");
    device.sink.busy = SEND_RETRY_LIMIT;

    assert_eq!(device.tick(), TickOutcome::Busy);
    assert_eq!(device.command("@"), "00000000");
    assert_eq!(device.tick(), KEYBOARD);
    assert_eq!(device.sink.packets.len(), 1);
}

#[test]
fn test_write_does_not_move_cursor() {
    let mut device = Device::new();
    device.command("d04000500");
    device.command("p");
    device.run_ticks(3);
    assert_eq!(device.command("@"), "03000000");

    device.command("j");
    assert_eq!(device.command("@"), "03000000");
    assert_eq!(device.tick(), MOUSE);
}

#[test]
fn test_boot_autostart() {
    let mut device = Device::new();
    assert!(!device.boot());
    assert!(device.control.is_paused());

    device.command("j");
    // Simulate a power cycle: fresh engine and flags, same flash
    device.player = Player::new();
    device.control.set_paused(true);
    assert!(device.boot());
    assert!(!device.control.is_paused());
    assert_eq!(device.tick(), MOUSE);
}

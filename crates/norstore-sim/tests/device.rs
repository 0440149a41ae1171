//! Driver bring-up against the simulated parts

use norstore_core::bus::{BusWidth, QspiBus};
use norstore_core::device::{BoardFlash, N25q, NorFlash, Sst26};
use norstore_core::diag;
use norstore_core::time::Budget;
use norstore_core::Error;
use norstore_sim::{Faults, SimBus};

fn init_logs() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[test]
fn sst26_probe_enters_quad_and_unlocks() {
    init_logs();
    let bus = SimBus::sst26();
    let mut dev = Sst26::new(bus.clone());

    dev.probe().unwrap();
    assert!(dev.quad_command_active());
    assert!(bus.device_quad_active());

    diag::report_device(&mut dev).unwrap();
    diag::report_bus(dev.bus(), 120_000_000);
}

#[test]
fn board_flash_selects_the_default_vendor() {
    init_logs();
    // With both vendor features on, the alias resolves to the SST26 driver.
    let mut dev: BoardFlash<SimBus> = BoardFlash::new(SimBus::sst26());
    dev.probe().unwrap();
    assert_eq!(dev.read_jedec_id().unwrap(), [0xBF, 0x26, 0x43]);
}

#[test]
fn n25q_probe_enters_quad_and_4byte_mode() {
    init_logs();
    let bus = SimBus::n25q();
    let mut dev = N25q::new(bus.clone());

    dev.probe().unwrap();
    assert!(dev.quad_command_active());
    assert!(bus.device_quad_active());
    assert!(bus.device_addr4_active());
    assert_eq!(dev.read_jedec_id().unwrap(), [0x20, 0xBA, 0x19]);
}

#[test]
fn mismatched_part_fails_probe() {
    init_logs();
    // SST26 driver pointed at an N25Q: quad entry is not decoded, the quad
    // ID read comes back all-ones.
    let mut sst = Sst26::new(SimBus::n25q());
    assert_eq!(sst.probe(), Err(Error::Unsupported));

    // N25Q driver pointed at an SST26: the plain ID read answers, but with
    // the wrong vendor bytes.
    let mut n25 = N25q::new(SimBus::sst26());
    assert_eq!(n25.probe(), Err(Error::Unsupported));
}

#[test]
fn quad_device_ignores_single_width_traffic() {
    init_logs();
    let bus = SimBus::sst26();
    let mut dev = Sst26::new(bus.clone());
    dev.probe().unwrap();

    // Behind the driver's back, talk to the part on one wire. It must not
    // decode any of it.
    let mut probe_bus = bus.clone();
    let mut id = [0u8; 3];
    probe_bus
        .read_reg(0x9F, BusWidth::Single, 0, &mut id)
        .unwrap();
    assert_eq!(id, [0xFF; 3]);

    // And the driver still works afterwards.
    assert!(dev.read_status().is_ok());
}

#[test]
fn reset_leaves_quad_mode() {
    init_logs();
    let bus = SimBus::sst26();
    let mut dev = Sst26::new(bus.clone());
    dev.probe().unwrap();

    dev.reset().unwrap();
    assert!(!dev.quad_command_active());
    assert!(!bus.device_quad_active());
    assert_eq!(dev.read_jedec_id().unwrap(), [0xBF, 0x26, 0x43]);
}

#[test]
fn stuck_wel_reports_device_not_ready() {
    init_logs();
    let bus = SimBus::sst26();
    let mut dev = Sst26::new(bus.clone());
    dev.probe().unwrap();

    bus.set_faults(Faults {
        wel_stuck_clear: true,
        ..Faults::default()
    });
    assert_eq!(dev.write_enable(), Err(Error::DeviceNotReady));
    assert_eq!(dev.sector_erase(0), Err(Error::DeviceNotReady));
}

#[test]
fn stuck_busy_exhausts_the_wait_budget() {
    init_logs();
    let bus = SimBus::sst26();
    let mut dev = Sst26::new(bus.clone());
    dev.probe().unwrap();

    bus.set_faults(Faults {
        stuck_busy: true,
        ..Faults::default()
    });
    assert_eq!(dev.wait_ready(Budget::Polls(500)), Err(Error::DeviceNotReady));
    assert_eq!(
        dev.wait_ready(Budget::Millis(50)),
        Err(Error::DeviceNotReady)
    );
}

#[test]
fn n25q_configuration_registers() {
    init_logs();
    let bus = SimBus::n25q();
    let mut dev = N25q::new(bus);
    dev.probe().unwrap();

    // Probe programmed the VCR dummy field; the rest of the register keeps
    // its reset value.
    let vcr = dev.read_vcr().unwrap();
    assert_eq!(vcr >> 4, 8);

    // Quad entry left its value in the EVCR.
    assert_eq!(dev.read_evcr().unwrap(), 0x1F);

    assert_eq!(dev.set_dummy_cycles(16), Err(Error::Unsupported));
    dev.set_dummy_cycles(10).unwrap();
    assert_eq!(dev.read_vcr().unwrap() >> 4, 10);

    dev.write_nvcr(0xAB_CF).unwrap();
    assert_eq!(dev.read_nvcr().unwrap(), 0xAB_CF);
}

#[test]
fn n25q_leaves_and_reenters_4byte_mode() {
    init_logs();
    let bus = SimBus::n25q();
    let mut dev = N25q::new(bus.clone());
    dev.probe().unwrap();

    dev.exit_4byte_mode().unwrap();
    assert!(!bus.device_addr4_active());
    dev.enter_4byte_mode().unwrap();
    assert!(bus.device_addr4_active());
}

#[test]
fn snapshot_reflects_the_last_frame() {
    init_logs();
    let bus = SimBus::sst26();
    let mut dev = Sst26::new(bus.clone());
    dev.probe().unwrap();

    let mut buf = [0u8; 8];
    dev.read(0, &mut buf).unwrap();

    let snap = bus.snapshot();
    assert_eq!(snap.opcode, 0x0B);
    assert_eq!(snap.width_name(), "4-4-4");
    assert_eq!(snap.transfer_name(), "memory read");
    assert_eq!(snap.dummy_cycles, 6);
}

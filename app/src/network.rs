use std::time::{Duration, Instant};

use tracing::{info, trace};
use vigil_ota::OtaStateMachine;
use vigil_security::FirmwareVerifier;
use vigil_timebase::{Scheduler, Watchdog};

use crate::status::SharedStatus;

/// The unpinned thread's loop body. Owns the OTA state machine and the
/// cooperative scheduler/watchdog pair; this is the thread a future LAN
/// protocol server, REST zone editor, or event-bus uploader would hang off
/// of — none of which exist here (§6 non-goal). What remains is the piece
/// those surfaces would all depend on: a live OTA machine and a watchdog
/// feed, publishing into the same snapshot the radar-core thread writes.
pub fn run(status: SharedStatus, mut verifier: FirmwareVerifier) -> ! {
    let epoch = Instant::now();
    let mut scheduler = Scheduler::new();
    let mut watchdog = Watchdog::new();
    let network_bit = watchdog.register("network").expect("watchdog source table full");
    let mut ota = OtaStateMachine::new();

    scheduler
        .register("ota_poll", 50, 0)
        .expect("scheduler task table full");
    scheduler
        .register("watchdog_feed", 200, 0)
        .expect("scheduler task table full");
    scheduler
        .register("publish_status", 500, 0)
        .expect("scheduler task table full");

    loop {
        let now_ms = epoch.elapsed().as_millis() as u64;
        scheduler.tick(now_ms, |name| match name {
            "ota_poll" => ota.poll_download(),
            "watchdog_feed" => {
                let _ = watchdog.feed(network_bit);
                if watchdog.check() {
                    trace!("watchdog satisfied");
                }
            }
            "publish_status" => {
                if ota.progress().status == vigil_types::OtaStatus::Verifying {
                    ota.verify_and_install(&mut verifier);
                }
                let mut guard = status.lock().expect("status mutex poisoned");
                guard.uptime_ms = now_ms;
                guard.ota = ota.progress().clone();
            }
            other => info!(task = other, "unrecognized scheduler task"),
        });
        std::thread::sleep(Duration::from_millis(20));
    }
}

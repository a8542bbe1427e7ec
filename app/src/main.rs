mod network;
mod pipeline;
mod status;

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;
use vigil_config_store::{ConfigStore, MemoryBackend};
use vigil_presence_smoother::SensitivityConfig;
use vigil_radar_ingest::{spawn_pinned, RadarCallbacks, RadarIngest, RadarIngestConfig};
use vigil_security::Security;
use vigil_tracker::TrackerConfig;
use vigil_types::ZoneMap;

use pipeline::{PipelineChannels, RadarPipeline};
use status::StatusSnapshot;

/// Station MAC placeholder; a real build reads this from the Wi-Fi driver's
/// factory-provisioned efuse block (out of scope — see SPEC_FULL.md §6).
const PLACEHOLDER_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x00, 0x01];

#[cfg(not(feature = "hardware"))]
fn open_radar_ports(
) -> anyhow::Result<(Box<dyn vigil_radar_ingest::UartPort>, Box<dyn vigil_radar_ingest::UartPort>)> {
    use vigil_radar_ingest::FixtureUartPort;
    Ok((
        Box::new(FixtureUartPort::new(Vec::new())),
        Box::new(FixtureUartPort::new(Vec::new())),
    ))
}

#[cfg(feature = "hardware")]
fn open_radar_ports(
) -> anyhow::Result<(Box<dyn vigil_radar_ingest::UartPort>, Box<dyn vigil_radar_ingest::UartPort>)> {
    use vigil_radar_ingest::SerialUartPort;
    let tracking = SerialUartPort::open("/dev/ttyS1")?;
    let presence = SerialUartPort::open("/dev/ttyS2")?;
    Ok((Box::new(tracking), Box::new(presence)))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("vigil firmware starting");

    let mut config_store = ConfigStore::init(MemoryBackend::new());
    let zone_map = config_store.get_zones().unwrap_or_default();

    let security = Security::new(&PLACEHOLDER_MAC, 15 * 60 * 1000);
    tracing::info!(device_id = security.identity.device_id_hex(), "device identity derived");

    let status: status::SharedStatus = Arc::new(Mutex::new(StatusSnapshot::new()));

    let (det_tx, det_rx) = mpsc::channel();
    let (pres_tx, pres_rx) = mpsc::channel();
    let (tconn_tx, tconn_rx) = mpsc::channel();
    let (pconn_tx, pconn_rx) = mpsc::channel();

    let (tracking_port, presence_port) = open_radar_ports()?;
    let ingest_callbacks = RadarCallbacks {
        on_detection: Box::new(move |frame| {
            let _ = det_tx.send(frame);
        }),
        on_presence: Box::new(move |frame| {
            let _ = pres_tx.send(frame);
        }),
        on_tracking_connection: Box::new(move |state| {
            let _ = tconn_tx.send(state);
        }),
        on_presence_connection: Box::new(move |state| {
            let _ = pconn_tx.send(state);
        }),
    };
    let mut ingest = RadarIngest::new(
        tracking_port,
        presence_port,
        RadarIngestConfig::default(),
        ingest_callbacks,
    );

    let mut pipeline = RadarPipeline::new(
        zone_map,
        TrackerConfig::default(),
        SensitivityConfig::default(),
        PipelineChannels {
            detections: det_rx,
            presence: pres_rx,
            tracking_conn: tconn_rx,
            presence_conn: pconn_rx,
        },
    );

    let radar_status = status.clone();
    spawn_pinned("radar-core", move || {
        let epoch = Instant::now();
        loop {
            let now_ms = epoch.elapsed().as_millis() as u64;
            ingest.poll_once(now_ms);
            pipeline.drain(&radar_status);
            std::thread::sleep(Duration::from_millis(5));
        }
    })?;

    let network_status = status.clone();
    let verifier = security.verifier;
    std::thread::Builder::new()
        .name("network-core".to_string())
        .spawn(move || network::run(network_status, verifier))?;

    loop {
        std::thread::sleep(Duration::from_secs(3600));
    }
}

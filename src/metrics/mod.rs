use lazy_static::lazy_static;
use prometheus::register_int_counter_vec;
use prometheus::register_int_gauge_vec;
use prometheus::Encoder;
use prometheus::IntCounterVec;
use prometheus::IntGaugeVec;
use tracing::error;

lazy_static! {
    pub static ref HEARTBEATS_RECEIVED: IntCounterVec = register_int_counter_vec!(
        "minicluster_heartbeats_received",
        "Heartbeats accepted by a master, per reporting tablet server",
        &["ts_uuid"]
    )
    .expect("metric can not be created");

    pub static ref REGISTERED_TABLET_SERVERS: IntGaugeVec = register_int_gauge_vec!(
        "minicluster_registered_tablet_servers",
        "Tablet servers currently registered with a master",
        &["master_id"]
    )
    .expect("metric can not be created");

    pub static ref WAIT_POLLS: IntCounterVec = register_int_counter_vec!(
        "minicluster_wait_polls",
        "Master queries issued by convergence waits",
        &["primitive"]
    )
    .expect("metric can not be created");

    pub static ref WAIT_TIMEOUTS: IntCounterVec = register_int_counter_vec!(
        "minicluster_wait_timeouts",
        "Convergence waits that reached their deadline",
        &["primitive"]
    )
    .expect("metric can not be created");
}

/// Renders every registered collector in the prometheus text format.
pub fn gather_text() -> String {
    let encoder = prometheus::TextEncoder::new();

    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        error!("could not encode prometheus metrics: {}", e);
    };
    match String::from_utf8(buffer) {
        Ok(v) => v,
        Err(e) => {
            error!("prometheus metrics could not be from_utf8'd: {}", e);
            String::default()
        }
    }
}

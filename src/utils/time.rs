use std::time::SystemTime;
use std::time::UNIX_EPOCH;

/// return milliseconds since the unix epoch
pub(crate) fn now_millis() -> u64 {
    let now = SystemTime::now();
    let since_epoch = now.duration_since(UNIX_EPOCH).unwrap_or_default();
    since_epoch.as_millis() as u64
}

use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::info;

use super::ReplicaLocation;
use super::TsDescriptor;
use crate::network::TsHeartbeat;
use crate::utils::time::now_millis;

/// Membership and placement state of one master, updated by heartbeats.
#[derive(Debug, Default)]
pub(crate) struct TsRegistry {
    servers: DashMap<String, TsDescriptor>,
    next_seq: AtomicU64,
}

impl TsRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Applies a heartbeat. Returns true if it registered a new server.
    pub(crate) fn record_heartbeat(
        &self,
        heartbeat: TsHeartbeat,
    ) -> bool {
        let now = now_millis();
        let mut tablets = heartbeat.tablets;
        tablets.sort();
        tablets.dedup();

        match self.servers.entry(heartbeat.uuid) {
            Entry::Occupied(mut e) => {
                let desc = e.get_mut();
                desc.rpc_addr = heartbeat.rpc_addr;
                desc.last_heartbeat_ms = now;
                desc.last_heartbeat_seq = heartbeat.seq;
                desc.tablets = tablets;
                false
            }
            Entry::Vacant(e) => {
                let registration_seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                info!(
                    "registered tablet server {} at {} (#{registration_seq})",
                    e.key(),
                    heartbeat.rpc_addr
                );
                let desc = TsDescriptor {
                    uuid: e.key().clone(),
                    rpc_addr: heartbeat.rpc_addr,
                    registration_seq,
                    registered_at_ms: now,
                    last_heartbeat_ms: now,
                    last_heartbeat_seq: heartbeat.seq,
                    tablets,
                };
                e.insert(desc);
                true
            }
        }
    }

    pub(crate) fn descriptors(&self) -> Vec<TsDescriptor> {
        let mut descs: Vec<TsDescriptor> =
            self.servers.iter().map(|entry| entry.value().clone()).collect();
        descs.sort_by_key(|d| d.registration_seq);
        descs
    }

    pub(crate) fn replica_locations(
        &self,
        tablet_id: &str,
    ) -> Vec<ReplicaLocation> {
        self.descriptors()
            .into_iter()
            .filter(|d| d.tablets.binary_search_by(|t| t.as_str().cmp(tablet_id)).is_ok())
            .map(|d| ReplicaLocation {
                tablet_id: tablet_id.to_string(),
                ts_uuid: d.uuid,
                rpc_addr: d.rpc_addr,
            })
            .collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.servers.len()
    }

    pub(crate) fn clear(&self) {
        self.servers.clear();
        self.next_seq.store(0, Ordering::SeqCst);
    }
}

use std::collections::BTreeSet;
use std::path::Path;

use nanoid::nanoid;
use sled::Db;
use sled::Tree;
use tracing::debug;

use crate::Error;
use crate::Result;

const UUID_KEY: &[u8] = b"uuid";
const TABLETS_TREE: &str = "tablets";

/// Durable identity and hosted-tablet set of one tablet server.
pub(crate) struct TabletMetaStore {
    db: Db,
    tablets: Tree,
}

impl TabletMetaStore {
    pub(crate) fn open(dir: &Path) -> Result<Self> {
        let db = sled::open(dir)?;
        let tablets = db.open_tree(TABLETS_TREE)?;
        debug!("opened tablet metadata store at {}", dir.display());
        Ok(Self { db, tablets })
    }

    /// Returns the stored uuid, generating and persisting one on first use.
    pub(crate) fn uuid_or_create(&self) -> Result<String> {
        if let Some(v) = self.db.get(UUID_KEY)? {
            return String::from_utf8(v.to_vec())
                .map_err(|e| Error::Storage(format!("corrupted uuid: {e}")));
        }

        let uuid = nanoid!();
        self.db.insert(UUID_KEY, uuid.as_bytes())?;
        self.db.flush()?;
        Ok(uuid)
    }

    pub(crate) fn tablets(&self) -> Result<BTreeSet<String>> {
        self.tablets
            .iter()
            .keys()
            .map(|k| {
                let k = k?;
                String::from_utf8(k.to_vec())
                    .map_err(|e| Error::Storage(format!("corrupted tablet id: {e}")))
            })
            .collect()
    }

    /// Returns false if the tablet was already present.
    pub(crate) fn add_tablet(
        &self,
        tablet_id: &str,
    ) -> Result<bool> {
        let previous = self.tablets.insert(tablet_id.as_bytes(), &[] as &[u8])?;
        self.tablets.flush()?;
        Ok(previous.is_none())
    }

    /// Returns false if the tablet was not present.
    pub(crate) fn remove_tablet(
        &self,
        tablet_id: &str,
    ) -> Result<bool> {
        let previous = self.tablets.remove(tablet_id.as_bytes())?;
        self.tablets.flush()?;
        Ok(previous.is_some())
    }

    pub(crate) fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

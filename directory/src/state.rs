use rand::seq::IteratorRandom;
use std::collections::HashMap;
use std::net::IpAddr;

use crate::{DirectoryError, FileLocation, NodeId, Result, StorageNodeRegistration, Timestamp};

#[derive(Debug, Clone, Copy)]
struct FileEntry {
    node_id: NodeId,
    timestamp: Timestamp,
}

/// Registry of storage nodes plus the file-name to node assignment table.
///
/// Files keep only the id of their node; address and port are resolved
/// against the registry at lookup so a node that re-joins on a new port
/// keeps serving its files.
#[derive(Debug, Default)]
pub struct DirectoryState {
    nodes: HashMap<NodeId, StorageNodeRegistration>,
    files: HashMap<String, FileEntry>,
}

impl DirectoryState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a storage node, overwriting the address of a known id.
    pub fn register(&mut self, node_id: Option<NodeId>, address: IpAddr, port: u16) -> NodeId {
        let node_id = node_id.unwrap_or_else(NodeId::new);
        let previous = self.nodes.insert(
            node_id,
            StorageNodeRegistration {
                node_id,
                address,
                port,
            },
        );

        match previous {
            Some(old) => tracing::info!(
                "Storage node {} re-registered: {}:{} -> {}:{}",
                node_id,
                old.address,
                old.port,
                address,
                port
            ),
            None => tracing::info!("Storage node {} joined at {}:{}", node_id, address, port),
        }

        node_id
    }

    pub fn locate(&self, docname: &str) -> Result<Option<FileLocation>> {
        self.files
            .get(docname)
            .map(|entry| self.resolve(entry))
            .transpose()
    }

    /// Uniform pick among registered nodes.
    pub fn random_node(&self) -> Result<&StorageNodeRegistration> {
        self.nodes
            .values()
            .choose(&mut rand::thread_rng())
            .ok_or(DirectoryError::NoNodesAvailable)
    }

    /// Returns the existing location of `docname`, or assigns it to a
    /// random node with `timestamp`. The boolean is true when this call
    /// created the assignment.
    ///
    /// An existing file keeps its stored timestamp; only [`commit`] moves it.
    ///
    /// [`commit`]: DirectoryState::commit
    pub fn reserve(&mut self, docname: &str, timestamp: Timestamp) -> Result<(FileLocation, bool)> {
        if let Some(entry) = self.files.get(docname) {
            return Ok((self.resolve(entry)?, false));
        }

        let node = self.random_node()?.clone();
        self.files.insert(
            docname.to_string(),
            FileEntry {
                node_id: node.node_id,
                timestamp,
            },
        );

        tracing::info!("Placed {} on storage node {}", docname, node.node_id);

        Ok((
            FileLocation {
                node_id: node.node_id,
                address: node.address,
                port: node.port,
                timestamp,
            },
            true,
        ))
    }

    /// Advances the stored timestamp of `docname` if `timestamp` is newer
    /// and returns the timestamp now on record.
    pub fn commit(&mut self, docname: &str, timestamp: Timestamp) -> Result<Timestamp> {
        let entry = self
            .files
            .get_mut(docname)
            .ok_or_else(|| DirectoryError::NotFound(docname.to_string()))?;

        if timestamp > entry.timestamp {
            entry.timestamp = timestamp;
        }

        Ok(entry.timestamp)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    pub fn nodes(&self) -> Vec<StorageNodeRegistration> {
        self.nodes.values().cloned().collect()
    }

    fn resolve(&self, entry: &FileEntry) -> Result<FileLocation> {
        let node = self
            .nodes
            .get(&entry.node_id)
            .ok_or(DirectoryError::UnknownNode(entry.node_id))?;

        Ok(FileLocation {
            node_id: node.node_id,
            address: node.address,
            port: node.port,
            timestamp: entry.timestamp,
        })
    }
}

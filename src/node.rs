use crate::config::Config;
use crate::error::{MinidfsError, Result};
use directory::Directory;
use locking::LockService;
use storage::StorageNode;
use tracing::{error, info};

/// Runs one or more services of the file store inside this process.
pub struct Node {
    config: Config,
}

impl Node {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub async fn run_directory(&self) -> Result<()> {
        info!("Starting directory service");
        Directory::serve(&(&self.config).into()).await?;
        Ok(())
    }

    pub async fn run_lock(&self) -> Result<()> {
        info!("Starting lock service");
        LockService::serve(&(&self.config).into()).await?;
        Ok(())
    }

    pub async fn run_storage(&self) -> Result<()> {
        info!("Starting storage node");
        StorageNode::serve(&(&self.config).into()).await?;
        Ok(())
    }

    /// Directory, lock service and `storage_nodes` storage nodes in one
    /// process. Each node stores under its own subdirectory of
    /// `storage_path` and listens on an ephemeral port.
    pub async fn run_cluster(&self, storage_nodes: usize) -> Result<()> {
        if storage_nodes == 0 {
            return Err(MinidfsError::InvalidConfig(
                "a cluster needs at least one storage node".to_string(),
            ));
        }

        info!("Starting local cluster with {} storage nodes", storage_nodes);

        let directory = Directory::bind(&(&self.config).into()).await?;
        let directory_addr = directory.local_addr()?;
        let lock = LockService::bind(&(&self.config).into()).await?;
        let lock_addr = lock.local_addr()?;

        let directory_task = tokio::spawn(directory.run());
        let lock_task = tokio::spawn(lock.run());

        let mut storage_tasks = Vec::with_capacity(storage_nodes);
        for index in 0..storage_nodes {
            let mut config = storage::Config::from(&self.config);
            config.directory = directory_addr;
            config.port = 0;
            config.node_id = None;
            config.storage_path = self.config.storage_path.join(format!("node-{}", index));

            let server = StorageNode::start(&config).await?;
            storage_tasks.push(tokio::spawn(server.run()));
        }

        info!(
            "Cluster ready: directory on {}, lock service on {}",
            directory_addr, lock_addr
        );

        tokio::select! {
            result = directory_task => {
                error!("Directory service stopped: {:?}", result);
                Err(stopped("directory service", result))
            }
            result = lock_task => {
                error!("Lock service stopped: {:?}", result);
                Err(stopped("lock service", result))
            }
            (result, index, _) = futures::future::select_all(storage_tasks) => {
                error!("Storage node {} stopped: {:?}", index, result);
                Err(stopped("storage node", result))
            }
        }
    }
}

fn stopped<E: std::fmt::Display>(
    service: &str,
    result: std::result::Result<std::result::Result<(), E>, tokio::task::JoinError>,
) -> MinidfsError {
    match result {
        Ok(Ok(())) => MinidfsError::Stopped(format!("{} exited", service)),
        Ok(Err(e)) => MinidfsError::Stopped(format!("{} failed: {}", service, e)),
        Err(e) => MinidfsError::Stopped(format!("{} panicked: {}", service, e)),
    }
}

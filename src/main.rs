use clap::{Parser, Subcommand};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use minidfs::{shell, Config, MinidfsError, Node};

#[derive(Parser, Debug)]
#[command(name = "minidfs", version, about = "Minimal distributed file store")]
struct Cli {
    /// JSON configuration file; command line flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the directory service
    Directory {
        #[arg(long)]
        address: Option<IpAddr>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Run the lock service
    Lock {
        #[arg(long)]
        address: Option<IpAddr>,
        #[arg(long)]
        port: Option<u16>,
        /// Lease lifetime in milliseconds
        #[arg(long)]
        lease_timeout_ms: Option<u64>,
    },
    /// Run a storage node and register it with the directory
    Storage {
        #[arg(long)]
        address: Option<IpAddr>,
        /// 0 picks an ephemeral port
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        directory: Option<SocketAddr>,
        #[arg(long)]
        storage_path: Option<PathBuf>,
    },
    /// Run the directory, lock service and several storage nodes in one process
    Cluster {
        #[arg(long, default_value_t = 3)]
        storage_nodes: usize,
        #[arg(long)]
        storage_path: Option<PathBuf>,
    },
    /// Interactive client reading commands from stdin
    Shell {
        #[arg(long)]
        directory: Option<SocketAddr>,
        #[arg(long)]
        lock: Option<SocketAddr>,
    },
}

#[tokio::main]
async fn main() -> Result<(), MinidfsError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Directory { address, port } => {
            if let Some(address) = address {
                config.directory_address = address;
            }
            if let Some(port) = port {
                config.directory_port = port;
            }
            info!("Starting MiniDFS directory on {}", config.directory_endpoint());
            Node::new(config).run_directory().await
        }
        Command::Lock {
            address,
            port,
            lease_timeout_ms,
        } => {
            if let Some(address) = address {
                config.lock_address = address;
            }
            if let Some(port) = port {
                config.lock_port = port;
            }
            if let Some(timeout) = lease_timeout_ms {
                config.lease_timeout_ms = timeout;
                config.validate()?;
            }
            info!("Starting MiniDFS lock service on {}", config.lock_endpoint());
            Node::new(config).run_lock().await
        }
        Command::Storage {
            address,
            port,
            directory,
            storage_path,
        } => {
            if let Some(address) = address {
                config.storage_address = address;
            }
            if let Some(port) = port {
                config.storage_port = port;
            }
            if let Some(directory) = directory {
                config.directory_address = directory.ip();
                config.directory_port = directory.port();
            }
            if let Some(path) = storage_path {
                config.storage_path = path;
            }
            info!("Starting MiniDFS storage node in {}", config.storage_path.display());
            Node::new(config).run_storage().await
        }
        Command::Cluster {
            storage_nodes,
            storage_path,
        } => {
            if let Some(path) = storage_path {
                config.storage_path = path;
            }
            Node::new(config).run_cluster(storage_nodes).await
        }
        Command::Shell { directory, lock } => {
            if let Some(directory) = directory {
                config.directory_address = directory.ip();
                config.directory_port = directory.port();
            }
            if let Some(lock) = lock {
                config.lock_address = lock.ip();
                config.lock_port = lock.port();
            }
            let client = client::Client::new((&config).into());
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            shell::run(&client, stdin, tokio::io::stdout()).await
        }
    }
}

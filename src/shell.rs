use client::{Client, LockGrant, LockState, OpenOutcome};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::Result;

const HELP: &str = "\
commands:
  open <docname>
  close <docname>
  checklock <docname>
  obtainlock <docname>
  read <docname>
  write <docname> <text>
  locate <docname>
  stats
  help
  exit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Open(String),
    Close(String),
    CheckLock(String),
    ObtainLock(String),
    Read(String),
    Write(String, String),
    Locate(String),
    Stats,
    Help,
    Exit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> std::result::Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }

        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let docname = || {
            if rest.is_empty() {
                Err(format!("{} needs a file name", verb))
            } else {
                Ok(rest.to_string())
            }
        };

        let command = match verb.to_ascii_lowercase().as_str() {
            "open" => Command::Open(docname()?),
            "close" => Command::Close(docname()?),
            "checklock" => Command::CheckLock(docname()?),
            "obtainlock" => Command::ObtainLock(docname()?),
            "read" => Command::Read(docname()?),
            "locate" => Command::Locate(docname()?),
            "write" => match rest.split_once(char::is_whitespace) {
                Some((name, text)) => Command::Write(name.to_string(), text.trim_start().to_string()),
                None if !rest.is_empty() => Command::Write(rest.to_string(), String::new()),
                None => return Err("write needs a file name and content".to_string()),
            },
            "stats" => Command::Stats,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            other => return Err(format!("unknown command '{}'", other)),
        };

        Ok(Some(command))
    }
}

/// Reads commands from `input` until `exit` or end of input, printing each
/// result to `output`. Request failures are printed, not returned.
pub async fn run<R, W>(client: &Client, input: R, mut output: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = input.lines();
    output
        .write_all(format!("client {} ready, type 'help' for commands\n", client.id()).as_bytes())
        .await?;

    loop {
        output.write_all(b"> ").await?;
        output.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let reply = match Command::parse(&line) {
            Ok(None) => continue,
            Ok(Some(Command::Exit)) => break,
            Ok(Some(command)) => execute(client, command).await,
            Err(message) => message,
        };

        output.write_all(reply.as_bytes()).await?;
        output.write_all(b"\n").await?;
    }

    output.flush().await?;
    Ok(())
}

async fn execute(client: &Client, command: Command) -> String {
    let outcome = match command {
        Command::Open(name) => client.open(&name).await.map(|outcome| match outcome {
            OpenOutcome::Exists(reply) => format!(
                "{} exists on node {} ({}:{}) at {}",
                reply.docname, reply.node_id, reply.address, reply.port, reply.timestamp
            ),
            OpenOutcome::Absent(reply) => format!(
                "{} does not exist; would be placed on node {} ({}:{})",
                reply.docname, reply.node_id, reply.address, reply.port
            ),
        }),
        Command::Close(name) => client.close(&name).await.map(|reply| format!("closed {}", reply.docname)),
        Command::CheckLock(name) => client.check_lock(&name).await.map(|state| match state {
            LockState::Unlocked => format!("{} is unlocked", name),
            LockState::Owned(lease) => format!("{} is locked by you until {}", name, lease.expires_at()),
            LockState::Locked(lease) => {
                format!("{} is locked by {} until {}", name, lease.client_id, lease.expires_at())
            }
        }),
        Command::ObtainLock(name) => client.obtain_lock(&name).await.map(|grant| match grant {
            LockGrant::Granted(lease) => format!("lock on {} granted until {}", name, lease.expires_at()),
            LockGrant::Regranted(lease) => format!("lock on {} extended until {}", name, lease.expires_at()),
            LockGrant::Locked(lease) => format!("{} is locked by {}", name, lease.client_id),
        }),
        Command::Read(name) => client
            .read(&name)
            .await
            .map(|data| String::from_utf8_lossy(&data).into_owned()),
        Command::Write(name, text) => client.write(&name, text.into_bytes()).await.map(|receipt| {
            format!(
                "wrote {} to node {} at {}",
                receipt.docname, receipt.node_id, receipt.timestamp
            )
        }),
        Command::Locate(name) => client.locate(&name).await.map(|location| match location {
            Some(location) => format!(
                "{} is on node {} ({}) at {}",
                name,
                location.node_id,
                location.socket_addr(),
                location.timestamp
            ),
            None => format!("{} does not exist", name),
        }),
        Command::Stats => {
            let stats = client.cache_stats().await;
            Ok(format!(
                "cache hits {} misses {} evictions {}",
                stats.hits, stats.misses, stats.evictions
            ))
        }
        Command::Help => Ok(HELP.to_string()),
        Command::Exit => Ok(String::new()),
    };

    outcome.unwrap_or_else(|e| format!("error: {}", e))
}

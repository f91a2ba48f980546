//! A thin one-shot client CLI: parse arguments, issue one request (following the
//! resolve-at-NN / operate-at-SN redirection protocol where needed), print the
//! result, exit. Not an interactive shell (§1 non-goal).

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::io;
use tokio::net::TcpStream;

use scriptorium::config::{self, ClientConfig};
use scriptorium::error::Error;
use scriptorium::wire::{self, Command, Frame, Kind};

#[derive(Parser, Debug)]
#[command(name = "client", about = "One-shot client for the document service")]
struct Args {
    #[arg(long)]
    config: Option<PathBuf>,

    /// Overrides the configured Name Node address (`host:port`).
    #[arg(long)]
    nn_addr: Option<String>,

    /// Overrides the configured identity asserted for this request.
    #[arg(long)]
    identity: Option<String>,

    #[command(subcommand)]
    command: Action,
}

#[derive(Subcommand, Debug)]
enum Action {
    RegisterUser { address: String },
    View,
    List,
    Create { file: String },
    Read { file: String },
    /// Acquires the sentence lock, commits the edit, releases the lock.
    Write { file: String, sentence: u32, edit: String },
    Delete { file: String },
    Info { file: String },
    Stream { file: String },
    Copy { src: String, dst: String },
    AddAccess { file: String, target: String, perm: String },
    RemAccess { file: String, target: String },
    Undo { file: String },
    Checkpoint { file: String, tag: String },
    ViewCheckpoint { file: String, tag: String },
    Revert { file: String, tag: String },
    ListCheckpoints { file: String },
    LockAcquire { file: String, sentence: u32 },
    LockRelease { file: String, sentence: u32 },
    RequestAccess { file: String },
    ViewRequests,
    ApproveRequest { file: String, requester: String },
    DenyRequest { file: String, requester: String },
    CreateFolder { name: String },
    Move { src: String, dst: String },
    ViewFolder { prefix: String },
}

#[tokio::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let args = Args::parse();
    let mut cfg: ClientConfig = config::load(args.config.as_deref()).map_err(std::io::Error::other)?;
    if let Some(nn_addr) = args.nn_addr {
        cfg.nn_addr = nn_addr;
    }
    if let Some(identity) = args.identity {
        cfg.identity = identity;
    }

    match run(&cfg, args.command).await {
        Ok(output) => {
            println!("{output}");
            Ok(())
        }
        Err(e) => {
            eprintln!("error: {e}");
            std::process::exit(1);
        }
    }
}

/// Connects to `addr`, retrying up to `cfg.connect_retries` times with
/// `cfg.connect_retry_delay_secs` between attempts (§7 "transient connect failures
/// ... retry up to three times with a 2-s delay").
async fn connect(addr: &str, cfg: &ClientConfig) -> io::Result<TcpStream> {
    let mut attempt = 0;
    loop {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) if attempt < cfg.connect_retries => {
                attempt += 1;
                tokio::time::sleep(Duration::from_secs(cfg.connect_retry_delay_secs)).await;
                let _ = e;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Sends one request frame and reads the matching response, each bounded by the
/// configured I/O timeout (§5 "5-s send/receive timeouts").
async fn roundtrip(stream: &mut TcpStream, request: &Frame, cfg: &ClientConfig) -> io::Result<Frame> {
    let timeout = Duration::from_secs(cfg.io_timeout_secs);
    io::AsyncWriteExt::flush(stream).await.ok();
    tokio::time::timeout(timeout, wire::write_frame(stream, request))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "write timed out"))??;
    tokio::time::timeout(timeout, wire::read_frame(stream))
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "read timed out"))?
}

fn to_result(frame: Frame) -> Result<Frame, Error> {
    if frame.error == 0 {
        Ok(frame)
    } else {
        Err(Error::from_code(frame.error).unwrap_or(Error::Internal))
    }
}

async fn call_nn(cfg: &ClientConfig, command: Command, filename: &str, data: Vec<u8>) -> Result<Frame, Error> {
    let mut stream = connect(&cfg.nn_addr, cfg).await.map_err(|_| Error::StorageServerDown)?;
    let request = Frame::request(Kind::Command as i32, command as i32, &cfg.identity, filename, data);
    let reply = roundtrip(&mut stream, &request, cfg).await.map_err(|_| Error::StorageServerDown)?;
    to_result(reply)
}

async fn call_sn(cfg: &ClientConfig, sn_addr: &str, command: Command, filename: &str, data: Vec<u8>) -> Result<Frame, Error> {
    let mut stream = connect(sn_addr, cfg).await.map_err(|_| Error::StorageServerDown)?;
    let request = Frame::request(Kind::Command as i32, command as i32, &cfg.identity, filename, data);
    let reply = roundtrip(&mut stream, &request, cfg).await.map_err(|_| Error::StorageServerDown)?;
    to_result(reply)
}

/// Resolves `file` at the NN via `resolve_command`, then issues `content_command`
/// against the returned Storage Node with `data` (the two-hop pattern of §2).
///
/// `data` is forwarded to both hops: most redirected commands (Read, Info,
/// AddAccess, Checkpoint, ...) resolve by filename alone and the NN ignores it,
/// but Move and Copy also mutate the NN's own namespace entry for a second
/// filename carried in `data` (the destination), so it must reach the NN call
/// too, not just the Storage Node one.
async fn redirected(
    cfg: &ClientConfig,
    resolve_command: Command,
    content_command: Command,
    file: &str,
    data: Vec<u8>,
) -> Result<Frame, Error> {
    let redirect = call_nn(cfg, resolve_command, file, data.clone()).await?;
    let sn_addr = redirect.data_str().replace('|', ":");
    call_sn(cfg, &sn_addr, content_command, file, data).await
}

async fn run(cfg: &ClientConfig, action: Action) -> Result<String, Error> {
    match action {
        Action::RegisterUser { address } => {
            let mut stream = connect(&cfg.nn_addr, cfg).await.map_err(|_| Error::StorageServerDown)?;
            let request =
                Frame::request(Kind::RegisterUser as i32, 0, &cfg.identity, "", address.into_bytes());
            let reply = roundtrip(&mut stream, &request, cfg).await.map_err(|_| Error::StorageServerDown)?;
            to_result(reply)?;
            Ok("registered".to_owned())
        }

        Action::View => {
            let frame = call_nn(cfg, Command::View, "", Vec::new()).await?;
            Ok(frame.data_str().to_owned())
        }

        Action::List => {
            let frame = call_nn(cfg, Command::List, "", Vec::new()).await?;
            Ok(frame.data_str().to_owned())
        }

        Action::Create { file } => {
            let frame = call_nn(cfg, Command::Create, &file, Vec::new()).await?;
            let sn_addr = frame.data_str().replace('|', ":");
            call_sn(cfg, &sn_addr, Command::Create, &file, Vec::new()).await?;
            Ok(format!("created {file} on {}", frame.data_str()))
        }

        Action::Read { file } => {
            let frame = redirected(cfg, Command::Read, Command::Read, &file, Vec::new()).await?;
            Ok(frame.data_str().to_owned())
        }

        Action::Write { file, sentence, edit } => {
            let lock = call_nn(cfg, Command::LockAcquire, &file, sentence.to_string().into_bytes()).await?;
            let sn_addr = lock.data_str().replace('|', ":");
            let script = format!("{sentence}|{edit}");
            let commit = call_sn(cfg, &sn_addr, Command::WriteCommit, &file, script.into_bytes()).await;

            // On success the commit reply carries `<word-count>|<char-count>`;
            // forward it to LockRelease so the NN's cached FileRecord is
            // refreshed before the lock is let go.
            let release_payload = match &commit {
                Ok(frame) => format!("{sentence}|{}", frame.data_str()),
                Err(_) => sentence.to_string(),
            };
            call_nn(cfg, Command::LockRelease, &file, release_payload.into_bytes()).await?;
            commit?;
            Ok("committed".to_owned())
        }

        Action::Delete { file } => {
            let sn = call_nn(cfg, Command::Read, &file, Vec::new()).await?;
            let sn_addr = sn.data_str().replace('|', ":");
            call_nn(cfg, Command::Delete, &file, Vec::new()).await?;
            call_sn(cfg, &sn_addr, Command::Delete, &file, Vec::new()).await?;
            Ok("deleted".to_owned())
        }

        Action::Info { file } => {
            let frame = redirected(cfg, Command::Info, Command::Info, &file, Vec::new()).await?;
            Ok(frame.data_str().to_owned())
        }

        Action::Stream { file } => {
            let frame = redirected(cfg, Command::Stream, Command::Stream, &file, Vec::new()).await?;
            Ok(frame.data_str().to_owned())
        }

        Action::Copy { src, dst } => {
            redirected(cfg, Command::Copy, Command::Copy, &src, dst.into_bytes()).await?;
            Ok("copied".to_owned())
        }

        Action::AddAccess { file, target, perm } => {
            let data = format!("{target}|{perm}").into_bytes();
            redirected(cfg, Command::AddAccess, Command::AddAccess, &file, data).await?;
            Ok("access granted".to_owned())
        }

        Action::RemAccess { file, target } => {
            redirected(cfg, Command::RemAccess, Command::RemAccess, &file, target.into_bytes()).await?;
            Ok("access revoked".to_owned())
        }

        Action::Undo { file } => {
            redirected(cfg, Command::Undo, Command::Undo, &file, Vec::new()).await?;
            Ok("undone".to_owned())
        }

        Action::Checkpoint { file, tag } => {
            redirected(cfg, Command::Checkpoint, Command::Checkpoint, &file, tag.into_bytes()).await?;
            Ok("checkpointed".to_owned())
        }

        Action::ViewCheckpoint { file, tag } => {
            let frame = redirected(cfg, Command::ViewCheckpoint, Command::ViewCheckpoint, &file, tag.into_bytes()).await?;
            Ok(frame.data_str().to_owned())
        }

        Action::Revert { file, tag } => {
            redirected(cfg, Command::Revert, Command::Revert, &file, tag.into_bytes()).await?;
            Ok("reverted".to_owned())
        }

        Action::ListCheckpoints { file } => {
            let frame = redirected(cfg, Command::ListCheckpoints, Command::ListCheckpoints, &file, Vec::new()).await?;
            Ok(frame.data_str().to_owned())
        }

        Action::LockAcquire { file, sentence } => {
            call_nn(cfg, Command::LockAcquire, &file, sentence.to_string().into_bytes()).await?;
            Ok("lock acquired".to_owned())
        }

        Action::LockRelease { file, sentence } => {
            call_nn(cfg, Command::LockRelease, &file, sentence.to_string().into_bytes()).await?;
            Ok("lock released".to_owned())
        }

        Action::RequestAccess { file } => {
            call_nn(cfg, Command::RequestAccess, &file, Vec::new()).await?;
            Ok("requested".to_owned())
        }

        Action::ViewRequests => {
            let frame = call_nn(cfg, Command::ViewRequests, "", Vec::new()).await?;
            Ok(frame.data_str().to_owned())
        }

        Action::ApproveRequest { file, requester } => {
            call_nn(cfg, Command::ApproveRequest, &file, requester.into_bytes()).await?;
            Ok("approved".to_owned())
        }

        Action::DenyRequest { file, requester } => {
            call_nn(cfg, Command::DenyRequest, &file, requester.into_bytes()).await?;
            Ok("denied".to_owned())
        }

        Action::CreateFolder { name } => {
            let frame = call_nn(cfg, Command::CreateFolder, &name, Vec::new()).await?;
            let sn_addr = frame.data_str().replace('|', ":");
            call_sn(cfg, &sn_addr, Command::CreateFolder, &name, Vec::new()).await?;
            Ok(format!("created folder {name}"))
        }

        Action::Move { src, dst } => {
            redirected(cfg, Command::Move, Command::Move, &src, dst.into_bytes()).await?;
            Ok("moved".to_owned())
        }

        Action::ViewFolder { prefix } => {
            let frame = call_nn(cfg, Command::ViewFolder, &prefix, Vec::new()).await?;
            Ok(frame.data_str().to_owned())
        }
    }
}

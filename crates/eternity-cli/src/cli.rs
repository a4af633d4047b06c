use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "eternity",
    about = "Eternity -- content-addressed storage over an anonymizing network",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Server configuration file
    #[arg(short, long, global = true, default_value = "eternity.toml")]
    pub config: PathBuf,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create a store and a default configuration file
    Init(InitArgs),
    /// Serve the store through the anonymizing-network client
    Serve(ServeArgs),
    /// Verify every object and repair the index
    Fsck(StoreArgs),
    /// Print the content hash of files
    Hash(HashArgs),
    /// Generate an Ed25519 publisher key
    Keygen(KeygenArgs),
    /// Upload a file to a remote server
    Put(PutArgs),
    /// Download an object from a remote server
    Get(GetArgs),
}

#[derive(Args)]
pub struct InitArgs {
    /// Store root directory
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// Overwrite an existing configuration file
    #[arg(long)]
    pub force: bool,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub root: Option<PathBuf>,
    /// WebSocket URI of the anonymizing-network client
    #[arg(long)]
    pub client_uri: Option<String>,
    #[arg(long)]
    pub max_in_flight: Option<usize>,
    /// Per-request deadline in seconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

#[derive(Args)]
pub struct StoreArgs {
    #[arg(long)]
    pub root: Option<PathBuf>,
}

#[derive(Args)]
pub struct HashArgs {
    #[arg(required = true)]
    pub paths: Vec<PathBuf>,
}

#[derive(Args)]
pub struct KeygenArgs {
    /// Where to write the hex-encoded secret key
    pub output: PathBuf,
}

#[derive(Args)]
pub struct RemoteArgs {
    /// Server address on the anonymizing network, hex encoded
    #[arg(long)]
    pub server: String,
    /// WebSocket URI of the local anonymizing-network client
    #[arg(long)]
    pub client_uri: Option<String>,
}

#[derive(Args)]
pub struct PutArgs {
    pub path: PathBuf,
    /// Publisher key file; without one the upload is anonymous and permanent
    #[arg(long)]
    pub key: Option<PathBuf>,
    #[command(flatten)]
    pub remote: RemoteArgs,
}

#[derive(Args)]
pub struct GetArgs {
    /// Content hash, lowercase hex
    pub hash: String,
    /// Write here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    #[command(flatten)]
    pub remote: RemoteArgs,
}

use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use colored::Colorize;
use eternity_crypto::{ContentHasher, SigningKey};
use eternity_server::{EternityServer, ServerConfig, StorageClient, WsTransport};
use eternity_store::{FsContentStore, Repair};
use eternity_types::{ContentHash, Recipient};
use tracing::info;

use crate::cli::*;

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Init(args) => cmd_init(&cli.config, args),
        Command::Serve(args) => cmd_serve(&cli.config, args),
        Command::Fsck(args) => cmd_fsck(&cli.config, args),
        Command::Hash(args) => cmd_hash(args),
        Command::Keygen(args) => cmd_keygen(args),
        Command::Put(args) => cmd_put(&cli.config, args),
        Command::Get(args) => cmd_get(&cli.config, args),
    }
}

/// The configuration file if it exists, defaults otherwise.
fn load_config(path: &Path) -> anyhow::Result<ServerConfig> {
    if path.exists() {
        Ok(ServerConfig::load(path)?)
    } else {
        Ok(ServerConfig::default())
    }
}

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().context("failed to start async runtime")
}

fn cmd_init(config_path: &Path, args: InitArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(root) = args.root {
        config.store_root = root;
    }
    let store = FsContentStore::open(&config.store_root)?;

    if config_path.exists() && !args.force {
        println!("Keeping existing config {}", config_path.display());
    } else {
        fs::write(config_path, config.to_toml()?)
            .with_context(|| format!("writing {}", config_path.display()))?;
        println!("Wrote config {}", config_path.display());
    }
    println!(
        "{} Initialized store in {} ({} objects)",
        "✓".green().bold(),
        store.options().root_dir.display().to_string().bold(),
        store.len()
    );
    Ok(())
}

fn cmd_serve(config_path: &Path, args: ServeArgs) -> anyhow::Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(root) = args.root {
        config.store_root = root;
    }
    if let Some(uri) = args.client_uri {
        config.client_uri = uri;
    }
    if let Some(n) = args.max_in_flight {
        config.max_in_flight = n;
    }
    if let Some(secs) = args.timeout {
        config.request_timeout = Duration::from_secs(secs);
    }
    config.validate()?;

    runtime()?.block_on(serve_until_interrupted(config))
}

async fn serve_until_interrupted(config: ServerConfig) -> anyhow::Result<()> {
    tokio::select! {
        result = EternityServer::new(config).serve() => {
            let stats = result?;
            println!(
                "{} Connection closed: {} requests, {} replies, {} dropped, {} expired, {} failed",
                "✓".green().bold(),
                stats.accepted,
                stats.sent,
                stats.dropped,
                stats.expired,
                stats.failed
            );
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            info!("interrupted; shutting down");
        }
    }
    Ok(())
}

fn cmd_fsck(config_path: &Path, args: StoreArgs) -> anyhow::Result<()> {
    let root = match args.root {
        Some(root) => root,
        None => load_config(config_path)?.store_root,
    };
    let (store, report) = FsContentStore::open_with_report(&root)?;

    for repair in &report.repairs {
        let marker = match repair {
            Repair::Adopted(_) => "+".green(),
            _ => "-".red(),
        };
        println!("  {marker} {repair}");
    }
    for path in &report.unreadable {
        println!("  {} unreadable {}", "?".yellow(), path.display());
    }
    if report.is_clean() {
        println!(
            "{} {} objects verified, no issues.",
            "✓".green().bold(),
            report.verified
        );
    } else {
        println!(
            "{} {} verified, {} adopted, {} removed, {} unreadable; {} objects indexed.",
            "!".yellow().bold(),
            report.verified,
            report.adopted(),
            report.removed(),
            report.unreadable.len(),
            store.len()
        );
    }
    Ok(())
}

fn cmd_hash(args: HashArgs) -> anyhow::Result<()> {
    for path in &args.paths {
        let hash = ContentHasher::hash_file(path)
            .with_context(|| format!("reading {}", path.display()))?;
        println!("{}  {}", hash, path.display());
    }
    Ok(())
}

fn cmd_keygen(args: KeygenArgs) -> anyhow::Result<()> {
    if args.output.exists() {
        bail!("{} already exists", args.output.display());
    }
    let key = SigningKey::generate();
    fs::write(&args.output, hex::encode(key.to_bytes()))
        .with_context(|| format!("writing {}", args.output.display()))?;
    println!("Public key: {}", key.verifying_key().to_hex().cyan());
    Ok(())
}

fn cmd_put(config_path: &Path, args: PutArgs) -> anyhow::Result<()> {
    let key = args.key.as_deref().map(read_key).transpose()?;
    let contents =
        fs::read(&args.path).with_context(|| format!("reading {}", args.path.display()))?;

    let hash = runtime()?.block_on(upload(config_path, &args.remote, contents, key))?;

    match hash {
        Some(hash) => {
            println!("{} Stored {}", "✓".green().bold(), hash.to_string().yellow());
            Ok(())
        }
        None => bail!("server refused the upload"),
    }
}

fn cmd_get(config_path: &Path, args: GetArgs) -> anyhow::Result<()> {
    let hash = ContentHash::from_hex(&args.hash).context("invalid content hash")?;
    let contents = runtime()?.block_on(download(config_path, &args.remote, hash))?;

    let Some(contents) = contents else {
        bail!("object {hash} not found");
    };
    if !ContentHasher::verify(&contents, &hash) {
        bail!("server returned bytes that do not match {hash}");
    }
    match args.output {
        Some(path) => {
            fs::write(&path, &contents).with_context(|| format!("writing {}", path.display()))?
        }
        None => std::io::stdout().write_all(&contents)?,
    }
    Ok(())
}

async fn upload(
    config_path: &Path,
    remote: &RemoteArgs,
    contents: Vec<u8>,
    key: Option<SigningKey>,
) -> anyhow::Result<Option<ContentHash>> {
    let client = connect(config_path, remote).await?;
    Ok(client.store(contents, key.as_ref()).await?)
}

async fn download(
    config_path: &Path,
    remote: &RemoteArgs,
    hash: ContentHash,
) -> anyhow::Result<Option<Vec<u8>>> {
    let client = connect(config_path, remote).await?;
    Ok(client.serve(hash).await?)
}

async fn connect(config_path: &Path, remote: &RemoteArgs) -> anyhow::Result<StorageClient> {
    let uri = match &remote.client_uri {
        Some(uri) => uri.clone(),
        None => load_config(config_path)?.client_uri,
    };
    let server = parse_recipient(&remote.server)?;
    let transport = WsTransport::connect(&uri).await?;
    let client = StorageClient::new(Arc::new(transport), server);
    let own = client.self_address().await?;
    info!(address = ?own, "connected to anonymizing network");
    Ok(client)
}

fn parse_recipient(text: &str) -> anyhow::Result<Recipient> {
    let bytes = hex::decode(text.trim()).context("server address is not hex")?;
    Ok(Recipient::from_slice(&bytes)?)
}

fn read_key(path: &Path) -> anyhow::Result<SigningKey> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let bytes = hex::decode(text.trim()).context("key file is not hex")?;
    let secret: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("key must be 32 bytes, got {}", b.len()))?;
    Ok(SigningKey::from_bytes(secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use eternity_types::RECIPIENT_LEN;

    #[test]
    fn recipient_from_hex() {
        let text = "ab".repeat(RECIPIENT_LEN);
        let recipient = parse_recipient(&text).unwrap();
        assert_eq!(recipient.as_bytes(), &[0xab; RECIPIENT_LEN]);
        assert!(parse_recipient("abcd").is_err());
        assert!(parse_recipient("zz").is_err());
    }

    #[test]
    fn keygen_then_read_key() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("publisher.key");
        cmd_keygen(KeygenArgs {
            output: path.clone(),
        })
        .unwrap();
        let key = read_key(&path).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), hex::encode(key.to_bytes()));
        // Never overwrites an existing key.
        assert!(cmd_keygen(KeygenArgs { output: path }).is_err());
    }

    #[test]
    fn short_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.key");
        fs::write(&path, "abcd").unwrap();
        assert!(read_key(&path).is_err());
    }

    #[test]
    fn init_creates_store_and_config() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("eternity.toml");
        let root = dir.path().join("store");
        cmd_init(
            &config_path,
            InitArgs {
                root: Some(root.clone()),
                force: false,
            },
        )
        .unwrap();
        assert!(root.join("objects").is_dir());
        let config = ServerConfig::load(&config_path).unwrap();
        assert_eq!(config.store_root, root);
    }

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ServerConfig::default());
    }
}

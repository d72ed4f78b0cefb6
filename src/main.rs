use anyhow::Result;
use clap::Parser;
use log::{info, warn, LevelFilter};
use std::path::PathBuf;
use std::sync::Arc;
use tweetfs::modules::mount::mount;
use tweetfs::{
    Config, HttpClient, MemoryClient, Mirror, SocialClient, SyncSettings, Syncer, SystemClock,
    Translator, TweetFs,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Serve from an in-memory service instead of the network
    #[arg(long)]
    offline: bool,

    /// Backing directory holding the mirror
    root: PathBuf,

    /// Mount point
    mount_point: PathBuf,
}

fn load_config(path: Option<&PathBuf>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    }
    .with_env_overrides();
    config.validate()?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger based on verbose flag
    let log_level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    env_logger::Builder::new().filter_level(log_level).init();

    let config = load_config(cli.config.as_ref())?;
    info!("Starting tweetfs for {}...", config.handle);

    let client: Arc<dyn SocialClient> = if cli.offline {
        info!("offline mode, remote actions stay in memory");
        Arc::new(MemoryClient::new(config.handle.clone()))
    } else {
        if config.credentials.bearer_token.is_empty() {
            warn!("no bearer token configured, remote calls will be rejected");
        }
        Arc::new(HttpClient::new(&config)?)
    };

    let mirror = Mirror::new(&cli.root)?;
    let syncer = Syncer::new(mirror.clone(), client.clone(), SyncSettings::from(&config));
    let sync = syncer.spawn(Arc::new(SystemClock))?;

    let translator = Arc::new(Translator::new(mirror, client, &config));
    let served = mount(TweetFs::new(translator), &cli.mount_point);

    sync.cancel()?;
    served
}

//! Klaytn wallet session CLI
//!
//! The session file plays the part of per-tab session storage: a login
//! survives between commands until `logout`.

use clap::{Parser, Subcommand};
use klay_session::poller::{block_number_poller, Poller};
use klay_session::{
    keystore, AccessMode, CaverClient, ChainClient, Config, CountContract, Error, FileSessionStore,
    LoggingObserver, Result, TransactionHandle, TransactionTracker, WalletSessionManager,
};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "klay-session")]
#[command(about = "Log in to a Klaytn account and call the Count contract")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a keystore file's shape without decrypting it
    Validate {
        /// Keystore JSON file
        file: PathBuf,
    },

    /// Log in with a private key
    LoginKey {
        /// Private key or Klaytn wallet key
        #[arg(long, env = "PRIVATE_KEY", hide_env_values = true)]
        key: String,
    },

    /// Log in with a keystore file and its password
    LoginKeystore {
        /// Keystore JSON file
        #[arg(short, long)]
        file: PathBuf,

        /// Keystore password
        #[arg(short, long, env = "KEYSTORE_PASSWORD", hide_env_values = true)]
        password: String,
    },

    /// Log out and forget the stored session
    Logout,

    /// Show the logged-in address
    Whoami,

    /// Show the current block number
    BlockNumber {
        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Show the counter and its last participant
    Count {
        /// Keep refreshing until interrupted
        #[arg(short, long)]
        watch: bool,
    },

    /// Increment the counter
    Plus,

    /// Decrement the counter
    Minus,

    /// Show current configuration
    Config,
}

struct App {
    config: Config,
    chain: Arc<CaverClient>,
    sessions: Arc<WalletSessionManager>,
    tracker: TransactionTracker,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }

    let config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Validate { file } => run_validate(&file),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
            Ok(())
        }
        command => {
            let app = App::start(config).await?;
            app.run(command).await
        }
    }
}

fn run_validate(file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)?;
    if !keystore::validate(&text) {
        return Err(Error::InvalidKeystoreFormat);
    }
    println!("{}", keystore::VALID_KEYSTORE_MSG);
    if let Some(address) = keystore::declared_address(&text) {
        println!("  Address: {}", address);
    }
    Ok(())
}

impl App {
    async fn start(config: Config) -> Result<Self> {
        let chain = Arc::new(CaverClient::from_config(&config)?);
        let store = Arc::new(FileSessionStore::new(&config.session_file));
        let sessions = Arc::new(WalletSessionManager::new(chain.clone(), store));

        if let Some(session) = sessions.restore().await? {
            tracing::debug!(address = %session.address(), "Using stored session");
        }

        let tracker = TransactionTracker::new(chain.clone(), sessions.clone());

        tracing::debug!(
            network = config.network.name(),
            session_file = %config.session_file.display(),
            "Client ready"
        );

        Ok(Self {
            config,
            chain,
            sessions,
            tracker,
        })
    }

    async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::LoginKey { key } => {
                if self.sessions.access_mode().await != AccessMode::PrivateKey {
                    self.sessions.toggle_access_mode().await;
                }
                self.sessions.set_private_key(SecretString::from(key)).await;
                let session = self.sessions.login().await?;
                println!("Integrated: {}", session.address());
            }
            Commands::LoginKeystore { file, password } => {
                let text = std::fs::read_to_string(&file)?;
                let name = file
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned());
                if !self.sessions.select_keystore(name, text).await {
                    return Err(Error::InvalidKeystoreFormat);
                }
                self.sessions.set_password(SecretString::from(password)).await;
                let session = self.sessions.login().await?;
                println!("Integrated: {}", session.address());
            }
            Commands::Logout => {
                self.sessions.logout().await?;
                println!("Logged out");
            }
            Commands::Whoami => match self.sessions.current_session().await {
                Some(session) => println!("Integrated: {}", session.address()),
                None => println!("Not logged in"),
            },
            Commands::BlockNumber { watch } => {
                if watch {
                    let poller = block_number_poller(self.chain.clone(), self.poll_interval());
                    watch_values(poller, |block| println!("Block No. {}", block)).await;
                } else {
                    println!("Block No. {}", self.chain.block_number().await?);
                }
            }
            Commands::Count { watch } => {
                let contract = self.contract()?;
                if watch {
                    let chain = self.chain.clone();
                    let poller = Poller::spawn("count", self.poll_interval(), move || {
                        let chain = chain.clone();
                        let contract = contract.clone();
                        async move { contract.snapshot(chain.as_ref()).await }
                    });
                    watch_values(poller, |snapshot| {
                        print_count(&snapshot.count.to_string(), snapshot.last_participant.as_deref())
                    })
                    .await;
                } else {
                    let snapshot = contract.snapshot(self.chain.as_ref()).await?;
                    print_count(&snapshot.count.to_string(), snapshot.last_participant.as_deref());
                }
            }
            Commands::Plus => {
                let handle = self
                    .contract()?
                    .plus(&self.tracker, self.config.gas_limit, Arc::new(LoggingObserver))
                    .await?;
                self.report(handle).await?;
            }
            Commands::Minus => {
                let handle = self
                    .contract()?
                    .minus(
                        self.chain.as_ref(),
                        &self.tracker,
                        self.config.gas_limit,
                        Arc::new(LoggingObserver),
                    )
                    .await?;
                self.report(handle).await?;
            }
            Commands::Validate { .. } | Commands::Config => {}
        }

        Ok(())
    }

    fn contract(&self) -> Result<CountContract> {
        Ok(CountContract::new(self.config.resolve_contract_address()?))
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.config.poll_interval_ms)
    }

    async fn report(&self, handle: TransactionHandle) -> Result<()> {
        let receipt = handle.wait().await?;
        println!("Transaction included in block #{}", receipt.block_number);
        println!("  {}", receipt.explorer_url(self.config.network));
        Ok(())
    }
}

fn print_count(count: &str, last_participant: Option<&str>) {
    if let Some(participant) = last_participant {
        println!("last participant: {}", participant);
    }
    println!("COUNT: {}", count);
}

/// Print each new value until Ctrl-C
async fn watch_values<T, F>(poller: Poller<T>, mut print: F)
where
    T: Clone + Send + Sync + 'static,
    F: FnMut(T),
{
    let mut latest: watch::Receiver<Option<T>> = poller.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = latest.changed() => {
                if changed.is_err() {
                    break;
                }
                let value = latest.borrow_and_update().clone();
                if let Some(value) = value {
                    print(value);
                }
            }
        }
    }
    poller.stop();
}

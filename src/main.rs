use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
mod auth;
use lockbox::{
    Charset, Config, Container, CostParams, FORMAT_VERSION, Storage, generate_password,
};
use std::io::Write;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, clap::Args)]
struct ScryptArgs {
    /// scrypt cost as a power of two, N = 2^LOG_COST (default: 16)
    #[arg(long)]
    log_cost: Option<u8>,

    /// scrypt block size r (default: 8)
    #[arg(long)]
    block_size: Option<u32>,

    /// scrypt parallelism p (default: 1)
    #[arg(long)]
    parallelism: Option<u32>,
}

impl ScryptArgs {
    fn to_cost_params(&self, default: CostParams) -> Result<CostParams> {
        Ok(CostParams::new(
            self.log_cost.unwrap_or(default.log_cost()),
            self.block_size.unwrap_or(default.block_size()),
            self.parallelism.unwrap_or(default.parallelism()),
        )?)
    }
}

#[derive(Debug, Parser)]
#[command(name = "lockbox")]
#[command(
    version,
    about = "Offline password manager with a single encrypted container file."
)]
struct Cli {
    /// Path to the container file
    #[arg(long, global = true, value_name = "PATH", env = "LOCKBOX_PATH")]
    store: Option<PathBuf>,

    /// Path to the JSON config file
    #[arg(long, global = true, value_name = "PATH", env = "LOCKBOX_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Creates an empty container
    Init {
        #[command(flatten)]
        scrypt: ScryptArgs,
    },

    /// Stores a credential by name
    #[command(arg_required_else_help = true)]
    Add { name: String, secret: String },

    /// Prints a credential by name
    #[command(arg_required_else_help = true)]
    Get {
        name: String,

        /// Copy to the clipboard instead of printing
        #[arg(short, long, default_value_t = false)]
        copy: bool,
    },

    /// Generates a random password and stores it by name
    #[command(arg_required_else_help = true)]
    Gen {
        name: String,

        #[arg(short, long, default_value_t = 20)]
        length: usize,

        /// Letters and digits only
        #[arg(short, long, default_value_t = false)]
        alphanumeric: bool,
    },

    /// Lists credential names
    Ls,

    /// Removes a credential by name
    #[command(arg_required_else_help = true)]
    Rm { name: String },

    /// Changes the master password and re-encrypts every credential
    Chpw,

    /// Shows information about the container
    Info,
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("lockbox=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    let path = match path {
        Some(p) => p,
        None => Config::default_path()?,
    };
    Config::load(&path).with_context(|| format!("failed to load config {}", path.display()))
}

fn resolve_storage(path: Option<PathBuf>, config: &Config) -> Result<Storage> {
    match path {
        Some(p) => Ok(Storage::new(p)),
        None => Ok(Storage::new(config.container_path()?)),
    }
}

fn open(storage: &Storage, password: &str) -> Result<Container> {
    if !storage.exists() {
        bail!("no container at {}, run `lockbox init` first", storage.path().display());
    }
    Ok(Container::open(storage, password)?)
}

fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let args = Cli::parse();
    let config = load_config(args.config)?;
    let storage = resolve_storage(args.store, &config)?;
    let password = auth::read_password()?;

    match args.command {
        Commands::Init { scrypt } => {
            if storage.exists() {
                bail!("container already exists at {}", storage.path().display());
            }
            let cost = scrypt.to_cost_params(config.cost)?;
            let mut container = Container::create(&password, cost)?;
            container.save(&storage)?;
            println!("container initialized at {}", storage.path().display());
        }
        Commands::Add { name, secret } => {
            let secret = zeroize::Zeroizing::new(secret);
            let mut container = open(&storage, &password)?;
            container.add_credential(&name, secret.as_bytes())?;
            container.save_or_rotate(&storage, &password)?;
            println!("stored '{name}'");
        }
        Commands::Get { name, copy } => {
            let container = open(&storage, &password)?;
            let secret = container.get_credential(&name)?;
            if copy {
                let text = zeroize::Zeroizing::new(String::from_utf8_lossy(&secret).into_owned());
                arboard::Clipboard::new()
                    .and_then(|mut clipboard| clipboard.set_text(text.as_str()))
                    .context("failed to copy to clipboard")?;
                println!("copied '{name}' to clipboard");
            } else {
                let mut stdout = std::io::stdout().lock();
                stdout.write_all(&secret)?;
                stdout.write_all(b"\n")?;
            }
        }
        Commands::Gen {
            name,
            length,
            alphanumeric,
        } => {
            let charset = if alphanumeric {
                Charset::Alphanumeric
            } else {
                Charset::Printable
            };
            let generated = generate_password(length, charset)?;
            let mut container = open(&storage, &password)?;
            container.add_credential(&name, generated.as_bytes())?;
            container.save_or_rotate(&storage, &password)?;
            println!("{}", generated.as_str());
        }
        Commands::Ls => {
            let container = open(&storage, &password)?;
            if container.count() == 0 {
                println!("No credentials stored.");
            }
            for name in container.names() {
                println!("{name}");
            }
        }
        Commands::Rm { name } => {
            let mut container = open(&storage, &password)?;
            container.remove_credential(&name)?;
            container.save_or_rotate(&storage, &password)?;
            println!("removed '{name}'");
        }
        Commands::Chpw => {
            let mut container = open(&storage, &password)?;
            drop(password);
            let new_password = auth::read_new_password_with_confirmation()?;
            container.change_password(&new_password)?;
            container.save_or_rotate(&storage, &new_password)?;
            println!("password changed");
        }
        Commands::Info => {
            let container = open(&storage, &password)?;
            println!("Path:           {}", storage.path().display());
            println!("Format version: {FORMAT_VERSION}");
            println!("Entries:        {}", container.count());
            println!("KDF:            scrypt {}", container.cost());
            println!("Next nonce:     {}", container.nonce_counter());
        }
    }

    Ok(())
}

use std::env;
use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use config::{Config, Environment, File, FileFormat};
use tracing::{debug, info, warn};

use yammer_notify::config::{MIN_POLL_INTERVAL_SECS, PathsConfig};
use yammer_notify::notify::{DesktopNotifier, LogNotifier, NotificationSink};
use yammer_notify::{ApiClient, AppConfig, Poller, TokenStore, authenticate};

const APP_NAME: &str = "yammer-notify";
const ENV_PREFIX: &str = "YAMMER_NOTIFY";

fn main() {
    if let Err(err) = try_main() {
        let _ = writeln!(io::stderr(), "{err:?}");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn async_login(ctx: RuntimeContext, cmd: LoginCommand) -> Result<()> {
    handle_login(&ctx, cmd).await
}

#[tokio::main]
async fn async_poll(ctx: RuntimeContext, cmd: PollCommand) -> Result<()> {
    handle_poll(&ctx, cmd).await
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();

    let ctx = RuntimeContext::new(cli.common.clone())?;
    ctx.init_logging();
    debug!("config file: {}", ctx.config_file.display());

    match cli.command {
        Command::Login(cmd) => async_login(ctx, cmd),
        Command::Poll(cmd) => async_poll(ctx, cmd),
        Command::Config { command } => handle_config(&ctx, command),
        Command::Completions { shell } => handle_completions(shell),
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Desktop notifications for new Yammer messages.",
    propagate_version = true
)]
struct Cli {
    #[command(flatten)]
    common: CommonOpts,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct CommonOpts {
    /// Override the config file path
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Reduce output to only errors
    #[arg(short, long, action = clap::ArgAction::SetTrue, global = true)]
    quiet: bool,
    /// Increase logging verbosity (stackable)
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Enable debug logging (equivalent to -v)
    #[arg(long, global = true)]
    debug: bool,
    /// Enable trace logging (overrides other levels)
    #[arg(long, global = true)]
    trace: bool,
    /// Emit log lines as JSON
    #[arg(long, global = true)]
    json: bool,
    /// Control color output (auto, always, never)
    #[arg(long, value_enum, default_value_t = ColorOption::Auto, global = true)]
    color: ColorOption,
    /// Include targets, files and line numbers in log lines
    #[arg(long = "diagnostics", global = true)]
    diagnostics: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ColorOption {
    Auto,
    Always,
    Never,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Authorize in the browser and store the access token
    Login(LoginCommand),
    /// Watch all feeds and notify about new messages
    Poll(PollCommand),
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
struct LoginCommand {
    /// OAuth client id (defaults to `client_id` from the config file)
    #[arg(long, env = "YAMMER_NOTIFY_CLIENT_ID")]
    client_id: Option<String>,
}

#[derive(Debug, Clone, Args)]
struct PollCommand {
    /// Seconds to wait before each feed check
    #[arg(
        short,
        long,
        value_name = "SECONDS",
        value_parser = clap::value_parser!(u64).range(MIN_POLL_INTERVAL_SECS..)
    )]
    interval: Option<u64>,
    /// Only log new messages, do not raise desktop notifications
    #[arg(long = "no-notify")]
    no_notify: bool,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show,
    /// Print the config file path
    Path,
}

#[derive(Debug, Clone)]
struct RuntimeContext {
    common: CommonOpts,
    config_file: PathBuf,
    config: AppConfig,
}

impl RuntimeContext {
    fn new(common: CommonOpts) -> Result<Self> {
        let config_file = match common.config.clone() {
            Some(path) => {
                let expanded = expand_path(&path.to_string_lossy())?;
                if expanded.is_dir() {
                    expanded.join("config.toml")
                } else {
                    expanded
                }
            }
            None => default_config_dir()?.join("config.toml"),
        };
        let config = load_or_init_config(&config_file)?;

        Ok(Self {
            common,
            config_file,
            config,
        })
    }

    fn init_logging(&self) {
        use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

        let level = if self.common.quiet {
            "error"
        } else {
            self.effective_log_level()
        };

        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(format!("yammer_notify={level},warn")));

        if self.common.json {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .try_init()
                .ok();
        } else {
            let force_color = matches!(self.common.color, ColorOption::Always)
                || env::var_os("FORCE_COLOR").is_some();
            let disable_color = matches!(self.common.color, ColorOption::Never)
                || env::var_os("NO_COLOR").is_some()
                || (!force_color && !io::stderr().is_terminal());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_writer(io::stderr)
                        .with_ansi(!disable_color)
                        .with_target(self.common.diagnostics)
                        .with_file(self.common.diagnostics)
                        .with_line_number(self.common.diagnostics),
                )
                .try_init()
                .ok();
        }
    }

    fn effective_log_level(&self) -> &str {
        if self.common.trace {
            "trace"
        } else if self.common.debug {
            "debug"
        } else {
            match self.common.verbose {
                0 => self.config.logging.level.as_str(),
                1 => "debug",
                _ => "trace",
            }
        }
    }

    fn token_store(&self) -> Result<TokenStore> {
        let path = expand_path(&self.config.paths.token_file)?;
        Ok(TokenStore::new(path))
    }
}

async fn handle_login(ctx: &RuntimeContext, cmd: LoginCommand) -> Result<()> {
    let client_id = cmd
        .client_id
        .or_else(|| Some(ctx.config.client_id.clone()))
        .filter(|id| !id.trim().is_empty())
        .ok_or_else(|| {
            anyhow!(
                "no OAuth client id, pass --client-id or set client_id in {}",
                ctx.config_file.display()
            )
        })?;

    let token = authenticate(&ctx.config.oauth, &client_id)
        .await
        .context("capturing access token")?;

    ctx.token_store()?.save(&token)?;
    Ok(())
}

async fn handle_poll(ctx: &RuntimeContext, cmd: PollCommand) -> Result<()> {
    let token = ctx.token_store()?.load()?;
    let client = ApiClient::new(&ctx.config.api, token).context("creating API client")?;

    let mut poll_config = ctx.config.poll.clone();
    if let Some(interval) = cmd.interval {
        poll_config.interval_secs = interval;
    }
    if cmd.no_notify {
        poll_config.notifications = false;
    }

    let scratch = create_scratch_dir(&ctx.config.paths)?;
    debug!("scratch directory: {}", scratch.path().display());

    let desktop = poll_config.notifications && cfg!(feature = "desktop-notifications");
    let sink: Box<dyn NotificationSink> = if desktop {
        Box::new(DesktopNotifier::new(APP_NAME))
    } else {
        Box::new(LogNotifier)
    };

    info!(
        "polling {} every {:?}",
        ctx.config.api.base_url,
        poll_config.interval()
    );
    let mut poller = Poller::new(client, scratch.path(), sink, poll_config);

    tokio::select! {
        _ = poller.run() => {}
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
    }

    drop(poller);
    scratch
        .close()
        .context("removing scratch directory")?;
    info!("Shutdown complete");
    Ok(())
}

fn handle_config(ctx: &RuntimeContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let text =
                toml::to_string_pretty(&ctx.config).context("serializing config to TOML")?;
            print!("{text}");
        }
        ConfigCommand::Path => println!("{}", ctx.config_file.display()),
    }
    Ok(())
}

fn handle_completions(shell: Shell) -> Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, APP_NAME, &mut io::stdout());
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn create_scratch_dir(paths: &PathsConfig) -> Result<tempfile::TempDir> {
    let mut builder = tempfile::Builder::new();
    builder.prefix("yammer-notify-");

    if paths.scratch_dir.trim().is_empty() {
        builder.tempdir().context("creating scratch directory")
    } else {
        let parent = expand_path(&paths.scratch_dir)?;
        fs::create_dir_all(&parent)
            .with_context(|| format!("creating scratch parent {}", parent.display()))?;
        builder
            .tempdir_in(&parent)
            .with_context(|| format!("creating scratch directory in {}", parent.display()))
    }
}

fn load_or_init_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        write_default_config(path)?;
    }

    let built = Config::builder()
        .add_source(File::from(path).format(FileFormat::Toml).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .with_context(|| format!("loading config from {}", path.display()))?;

    built
        .try_deserialize()
        .with_context(|| format!("invalid config in {}", path.display()))
}

/// First-run config: every key at its default, with a short header.
fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }

    let defaults =
        toml::to_string_pretty(&AppConfig::default()).context("serializing default config")?;
    let body = format!(
        "# {APP_NAME} configuration\n\
         # Set client_id before running `{APP_NAME} login`.\n\
         # Any key can be overridden as {ENV_PREFIX}__<SECTION>__<KEY>.\n\n{defaults}"
    );
    fs::write(path, body).with_context(|| format!("writing config file {}", path.display()))
}

/// Expand `~` and environment variables in a configured path.
fn expand_path(text: &str) -> Result<PathBuf> {
    let expanded =
        shellexpand::full(text).with_context(|| format!("expanding path {text:?}"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// `$XDG_CONFIG_HOME/yammer-notify` on Linux, the platform config dir elsewhere.
fn default_config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_NAME))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))
}

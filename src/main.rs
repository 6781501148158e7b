//! Binary entrypoint for the Helpsathi CLI.
//!
//! Commands:
//! - `start [--daemon] [--pid-file <path>]` - run the alert service (reads key events and commands from stdin or the `[input] fifo`)
//! - `init` - create a starter `config.toml` and the data directory
//! - `status` - print the configured contacts, alert message and providers
//! - `send-once` - send a single alert now and exit
//! - `contacts list|add|remove` - manage trusted contacts
//! - `message show|set` - manage the alert message
//!
//! See the library crate docs for module-level details: `helpsathi::`.
use anyhow::Result;
use clap::{Parser, Subcommand};
use log::info;

use helpsathi::alert::{start_alert_loop, AlertLoopConfig, OneShotResult};
use helpsathi::config::Config;
use helpsathi::platform::Platform;
use helpsathi::service::AlertService;
use helpsathi::storage::ContactStore;

#[derive(Parser)]
#[command(name = "helpsathi")]
#[command(about = "Personal safety alerts: triple volume press sends your location to trusted contacts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "config.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the alert service
    Start {
        /// Run as a background daemon (Unix only)
        #[arg(short, long)]
        daemon: bool,

        /// PID file location (for daemon mode)
        #[arg(long, default_value = "/tmp/helpsathi.pid")]
        pid_file: String,
    },
    /// Initialize a new configuration and data directory
    Init,
    /// Show contacts, alert message and provider settings
    Status,
    /// Send a single alert to all contacts now
    SendOnce,
    /// Manage trusted contacts
    Contacts {
        #[command(subcommand)]
        action: ContactsAction,
    },
    /// Show or change the alert message
    Message {
        #[command(subcommand)]
        action: MessageAction,
    },
}

#[derive(Subcommand)]
enum ContactsAction {
    /// List contacts in display order
    List,
    /// Append a contact
    Add { name: String, number: String },
    /// Remove the contact at a position shown by `list` (starting at 1)
    Remove { position: usize },
}

#[derive(Subcommand)]
enum MessageAction {
    /// Print the current alert message
    Show,
    /// Replace the alert message
    Set { text: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // A missing config file means defaults; a broken one is an error.
    let pre_config = match cli.command {
        Commands::Init => None,
        _ => Some(Config::load_or_default(&cli.config).await?),
    };

    match &cli.command {
        Commands::Start { daemon, .. } if *daemon => {
            // Logging starts after the fork in the child process
        }
        _ => init_logging(&pre_config, cli.verbose),
    }

    match cli.command {
        Commands::Start { daemon, pid_file } => {
            let config = match pre_config {
                Some(config) => config,
                None => Config::load_or_default(&cli.config).await?,
            };

            #[cfg(all(unix, feature = "daemon"))]
            if daemon {
                if config.input.fifo.is_none() {
                    anyhow::bail!(
                        "Daemon mode has no stdin; set [input] fifo in {} to receive key events",
                        cli.config
                    );
                }
                daemonize_process(&config, &pid_file)?;
                init_logging(&Some(config.clone()), cli.verbose);
            }

            #[cfg(not(all(unix, feature = "daemon")))]
            if daemon {
                let _ = pid_file;
                eprintln!("Error: Daemon mode requires Unix platform and 'daemon' feature.");
                eprintln!("Compile with: cargo build --features daemon");
                std::process::exit(1);
            }

            info!("Starting Helpsathi v{}", env!("CARGO_PKG_VERSION"));
            let mut service = AlertService::new(config).await?;
            service.run().await?;
        }
        Commands::Init => {
            info!("Initializing new configuration");
            Config::create_default(&cli.config).await?;
            info!("Configuration file created at {}", cli.config);
            let cfg = Config::default();

            let store = ContactStore::new(&cfg.storage.data_dir).await?;
            info!("Data directory ready at {}", store.base_dir().display());
        }
        Commands::Status => {
            let config = pre_config.unwrap_or_default();
            let store = ContactStore::new(&config.storage.data_dir).await?;
            let contacts = store.load_contacts().await;
            println!("Contacts: {}", contacts.len());
            println!("Alert message: {}", store.load_message().await);
            println!("Interval: {}s", config.alert.interval().as_secs());
            println!(
                "Trigger: {} presses within {}ms",
                config.trigger.press_count, config.trigger.debounce_ms
            );
            println!("Location provider: {}", config.location.provider);
            println!("SMS provider: {}", config.sms.provider);
            println!(
                "Permissions: location={} sms={}",
                config.permissions.location, config.permissions.sms
            );
        }
        Commands::SendOnce => {
            let config = pre_config.unwrap_or_default();
            let store = ContactStore::new(&config.storage.data_dir).await?;
            let alerts = start_alert_loop(
                AlertLoopConfig::from(&config.alert),
                Platform::from_config(&config),
                store,
            );
            let result = alerts.send_once().await;
            alerts.shutdown().await;
            match result {
                Some(OneShotResult::Completed(report)) => {
                    println!("{}", report.summary());
                    if report.skipped() || report.failed() > 0 {
                        std::process::exit(1);
                    }
                }
                Some(OneShotResult::Suppressed) | None => {
                    println!("Alert could not be sent.");
                    std::process::exit(1);
                }
            }
        }
        Commands::Contacts { action } => {
            let config = pre_config.unwrap_or_default();
            let store = ContactStore::new(&config.storage.data_dir).await?;
            match action {
                ContactsAction::List => {
                    let contacts = store.load_contacts().await;
                    if contacts.is_empty() {
                        println!("No contacts configured.");
                    }
                    for (i, contact) in contacts.iter().enumerate() {
                        println!("{:>3}. {} <{}>", i + 1, contact.name, contact.number);
                    }
                }
                ContactsAction::Add { name, number } => {
                    let contact = store.add_contact(&name, &number).await?;
                    println!("Added {} <{}>", contact.name, contact.number);
                }
                ContactsAction::Remove { position } => {
                    if position == 0 {
                        anyhow::bail!("Positions start at 1");
                    }
                    let removed = store.remove_contact(position - 1).await?;
                    println!("Contact deleted: {} <{}>", removed.name, removed.number);
                }
            }
        }
        Commands::Message { action } => {
            let config = pre_config.unwrap_or_default();
            let store = ContactStore::new(&config.storage.data_dir).await?;
            match action {
                MessageAction::Show => println!("{}", store.load_message().await),
                MessageAction::Set { text } => {
                    store.save_message(&text).await?;
                    println!("Message saved!");
                }
            }
        }
    }

    Ok(())
}

fn init_logging(config: &Option<Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .as_ref()
            .and_then(|cfg| cfg.logging.level.parse().ok())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .as_ref()
        .and_then(|cfg| cfg.logging.file.as_ref())
        .and_then(|file| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(file)
                .ok()
        });

    if let Some(f) = log_file {
        let write_mutex = std::sync::Arc::new(std::sync::Mutex::new(f));
        // In daemon mode stdout is redirected, so only the file gets the line
        let is_tty = atty::is(atty::Stream::Stdout);
        builder.format(move |fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            let line = format!("{} [{}] {}", ts, record.level(), record.args());
            if let Ok(mut guard) = write_mutex.lock() {
                let _ = writeln!(guard, "{}", line);
            }
            if is_tty {
                writeln!(fmt, "{}", line)
            } else {
                Ok(())
            }
        });
    } else {
        builder.format(|fmt, record| {
            let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
            writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
        });
    }
    let _ = builder.try_init();
}

/// Daemonize the process (Unix only)
///
/// Re-spawns the binary without `--daemon` with stdin closed and stdout/stderr
/// appended to the log file, writes the PID file, and exits the parent.
#[cfg(all(unix, feature = "daemon"))]
fn daemonize_process(config: &Config, pid_file: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::process::Command;

    let log_path = config
        .logging
        .file
        .as_deref()
        .unwrap_or("helpsathi.log");

    let current_exe = std::env::current_exe()?;
    let mut args: Vec<String> = std::env::args().collect();

    // Remove the --daemon flag to prevent infinite loop
    if let Some(pos) = args.iter().position(|arg| arg == "--daemon" || arg == "-d") {
        args.remove(pos);
    }
    let child_args = &args[1..];

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;

    let child = Command::new(&current_exe)
        .args(child_args)
        .stdin(std::process::Stdio::null())
        .stdout(log_file.try_clone()?)
        .stderr(log_file)
        .spawn()?;

    std::fs::write(pid_file, format!("{}", child.id()))?;

    // Parent exits here; the child continues as the daemon
    std::process::exit(0);
}

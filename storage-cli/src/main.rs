#![allow(unused)]

use std::io::{stdin, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{env, panic};

use anyhow::Result;
use clap::{CommandFactory, Parser};
use log::info;
use state_storage_cli::config::ConfigLoad;
use state_storage_cli::session::Session;
use state_storage_cli::trace;

#[derive(Debug, Parser, PartialEq)]
#[command(version)]
#[command(author, about, disable_help_flag = true)]
pub struct Args {
    #[clap(short, long, help = "debug model")]
    debug: bool,

    #[clap(long, help = "Print help information")]
    help: bool,

    /// Configuration file path, default 'config/storage-cli.yaml'
    #[clap(
        short = 'c',
        long = "config",
        help = "Configuration file path",
        default_value = "config/storage-cli.yaml"
    )]
    config: String,

    /// quiet mode, no banner printed to stderr
    #[clap(long = "quiet", short = 'q', default_value = "false")]
    quiet: bool,

    #[clap(short = 'l', long, default_value = "info")]
    log_level: String,

    #[clap(
        short = 'n',
        long,
        help = "Force non-interactive mode",
        default_value = "false"
    )]
    non_interactive: bool,

    #[clap(long, require_equals = true, help = "Query to execute")]
    query: Option<String>,
}

#[tokio::main]
pub async fn main() -> Result<()> {
    setup_panic_hooks();

    let args = Args::parse();
    if args.debug {
        println!("{:?}", args);
    }

    if !args.quiet {
        eprintln!("storage-cli -- a REPL for the state-storage engine");
        eprintln!();
    }

    let log_dir = format!(
        "{}/.storage-cli",
        std::env::var("HOME").unwrap_or_else(|_| ".".to_string())
    );
    let _guards = trace::init_logging(&log_dir, &args.log_level).await?;
    info!("storage-cli start args: {:?}", &args);

    let mut cmd = Args::command();
    if args.help {
        cmd.print_help()?;
        return Ok(());
    }

    let mut cfg = match ConfigLoad::new(args.config.as_ref()) {
        Ok(c) => c,
        Err(_) => ConfigLoad::default(),
    };
    if args.debug {
        println!("{:?}", &cfg);
        eprintln!();
    }
    info!("storage-cli start config: {:?}", &cfg);

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        println!("received Ctrl+C!");
        r.store(false, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");

    let is_terminal = stdin().is_terminal();
    let is_repl = is_terminal && !args.non_interactive && args.query.is_none();
    if is_repl {
        cfg.terminal_update();
    }

    let mut session = Session::try_new(cfg, is_repl).await?;

    info!("storage-cli starting, is_repl={is_repl}");

    if is_repl {
        session.handle_repl().await;
        return Ok(());
    }

    match args.query {
        None => session.handle_reader(stdin().lock()).await?,
        Some(query) => session.handle_reader(std::io::Cursor::new(query)).await?,
    }

    Ok(())
}

fn setup_panic_hooks() {
    let meta = human_panic::Metadata {
        version: env!("CARGO_PKG_VERSION").into(),
        name: env!("CARGO_PKG_NAME").into(),
        authors: env!("CARGO_PKG_AUTHORS").replace(':', ", ").into(),
        homepage: env!("CARGO_PKG_HOMEPAGE").into(),
    };

    let default_hook = panic::take_hook();

    if env::var("RUST_BACKTRACE").is_err() {
        panic::set_hook(Box::new(move |info: &panic::PanicInfo| {
            default_hook(info);

            let file_path = human_panic::handle_dump(&meta, info);
            human_panic::print_msg(file_path, &meta)
                .expect("human-panic: printing error message to console failed");
        }));
    }
}

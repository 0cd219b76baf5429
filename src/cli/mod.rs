pub mod render;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;

use crate::{
    engine::{storage::stat_store::FileStatStore, PageView, VisitorEngine},
    utils::{
        clock::{Clock, DefaultClock},
        dir::create_application_default_path,
        logging::enable_logging,
    },
};

use render::render_snapshot;

/// Used when `track` is invoked without an explicit user agent.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36";

#[derive(Parser, Debug)]
#[command(name = "Whovisits", version, long_about = None)]
#[command(about = "Local-first visitor analytics for a personal site", long_about = None)]
struct Args {
    #[command(subcommand)]
    commands: Commands,
    #[arg(long, help = "Enable logging")]
    log: bool,
    #[arg(
        long,
        help = "Application directory. By default tries to save into $XDG_STATE_HOME or $HOME/.local/state"
    )]
    dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(about = "Record a page activation")]
    Track {
        #[arg(
            long = "user-agent",
            help = "User agent of the viewer. Defaults to a generic desktop agent"
        )]
        user_agent: Option<String>,
    },
    #[command(about = "Display visit statistics")]
    Stats {},
    #[command(about = "Reset all stored statistics, identity included")]
    Reset {},
}

pub async fn run_cli() -> Result<()> {
    let args = Args::parse();

    let logging_level = if args.log {
        Some(LevelFilter::TRACE)
    } else {
        None
    };

    let dir = match args.dir {
        Some(dir) => dir,
        None => create_application_default_path()?,
    };
    enable_logging(&dir, logging_level, args.log)?;

    let engine = VisitorEngine::new(FileStatStore::new(dir.join("stats"))?);
    let clock = DefaultClock;

    match args.commands {
        Commands::Track { user_agent } => track(&engine, &clock, user_agent).await,
        Commands::Stats {} => stats(&engine, &clock).await,
        Commands::Reset {} => {
            engine.reset().await?;
            println!("Statistics cleared");
            Ok(())
        }
    }
}

async fn track(
    engine: &VisitorEngine<FileStatStore>,
    clock: &impl Clock,
    user_agent: Option<String>,
) -> Result<()> {
    let now = clock.time();
    let activation = engine
        .on_view_activated(PageView {
            now,
            local_hour: clock.local_hour(),
            user_agent: user_agent.unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
        })
        .await?;

    if activation.countable {
        println!("Counted a new visit for {}", now.date_naive());
    } else {
        println!("Repeat view inside the 24h window, not counted");
    }
    Ok(())
}

async fn stats(engine: &VisitorEngine<FileStatStore>, clock: &impl Clock) -> Result<()> {
    let snapshot = engine.snapshot(clock.time().date_naive()).await?;
    print!("{}", render_snapshot(&snapshot));
    Ok(())
}

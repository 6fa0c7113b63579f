//! Headless Outpost runner.
//!
//! Loads a save (or starts fresh), applies offline progress, optionally buys
//! and wires buildings, runs a fixed number of ticks and writes the save back.
//!
//! ```text
//! outpost-headless --save game.json --place oreMiner --place smelter --wire --ticks 600
//! ```

mod report;

use anyhow::{Context, Result};
use clap::Parser;
use outpost_core::catalog::Catalog;
use outpost_core::config::GameConfig;
use outpost_core::graph::Position;
use outpost_core::serialize::{unix_millis, SaveSnapshot};
use outpost_core::session::Session;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "outpost-headless")]
#[command(about = "Run the Outpost simulation without a UI")]
struct Cli {
    /// Save file to load and write back
    #[arg(short, long)]
    save: Option<PathBuf>,

    /// Directory with resources/buildings/config data files
    #[arg(short, long)]
    data: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(short, long, default_value_t = 600)]
    ticks: u64,

    /// Seconds per tick
    #[arg(long, default_value_t = 1.0)]
    dt: f64,

    /// Wall clock in epoch milliseconds (defaults to the system clock)
    #[arg(long)]
    now: Option<u64>,

    /// Building to buy before running; repeatable
    #[arg(short, long)]
    place: Vec<String>,

    /// Connect newly placed buildings wherever one feeds another
    #[arg(long)]
    wire: bool,

    /// Resource to sell in full after running; repeatable
    #[arg(long)]
    sell: Vec<String>,
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .init();
}

fn load_data(cli: &Cli) -> Result<(Arc<Catalog>, GameConfig)> {
    match &cli.data {
        Some(dir) => {
            let data = outpost_data::load_game_data(dir)
                .with_context(|| format!("loading game data from {}", dir.display()))?;
            Ok((Arc::new(data.catalog), data.config))
        }
        None => Ok((Arc::new(Catalog::standard()), GameConfig::default())),
    }
}

/// Where the running session came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SaveOrigin {
    Fresh,
    Loaded,
    /// A save existed but could not be used; the session is fresh.
    Unreadable,
}

fn open_session(
    catalog: Arc<Catalog>,
    config: GameConfig,
    saved: Option<&str>,
) -> (Session, SaveOrigin) {
    let Some(text) = saved else {
        return (Session::new(catalog, config), SaveOrigin::Fresh);
    };
    let loaded = SaveSnapshot::from_json(text)
        .and_then(|snapshot| Session::from_snapshot(catalog.clone(), config.clone(), &snapshot));
    match loaded {
        Ok(session) => (session, SaveOrigin::Loaded),
        Err(e) => {
            tracing::error!(error = %e, "failed to load save, starting fresh");
            (Session::new(catalog, config), SaveOrigin::Unreadable)
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let (catalog, config) = load_data(&cli)?;
    let now = cli.now.unwrap_or_else(unix_millis);

    let saved = match &cli.save {
        Some(path) if path.exists() => Some(
            std::fs::read_to_string(path)
                .with_context(|| format!("reading save {}", path.display()))?,
        ),
        _ => None,
    };
    let (mut session, origin) = open_session(catalog, config, saved.as_deref());

    if origin == SaveOrigin::Loaded {
        if let Ok(Some(summary)) = session.calculate_offline_progress(now) {
            for line in summary.describe() {
                println!("{line}");
            }
        }
    }

    let mut placed = Vec::new();
    for (i, building) in cli.place.iter().enumerate() {
        let position = Position::new(40.0 + 180.0 * i as f64, 40.0);
        match session.place_node(building, position) {
            Ok(node) => placed.push(node.id),
            Err(e) => println!("could not place {building}: {e}"),
        }
    }
    if cli.wire {
        for &from in &placed {
            for &to in &placed {
                if from != to {
                    // Incompatible pairs are expected here.
                    let _ = session.try_connect(from, to);
                }
            }
        }
    }

    for _ in 0..cli.ticks {
        session.tick(cli.dt);
    }

    for resource in &cli.sell {
        match session.sell_all(resource) {
            Ok(sale) => println!("sold {} {resource} for {}", sale.sold, sale.earned),
            Err(e) => println!("could not sell {resource}: {e}"),
        }
    }

    print!("{}", report::render(&session));

    if let Some(path) = &cli.save {
        if origin == SaveOrigin::Unreadable {
            eprintln!(
                "warning: {} could not be loaded; leaving it untouched",
                path.display()
            );
            tracing::warn!(path = %path.display(), "not overwriting unreadable save");
            return Ok(());
        }
        let elapsed_ms = (cli.ticks as f64 * cli.dt * 1000.0) as u64;
        let text = session
            .save_snapshot_at(now.saturating_add(elapsed_ms))
            .to_json()?;
        std::fs::write(path, text).with_context(|| format!("writing save {}", path.display()))?;
        tracing::info!(path = %path.display(), "saved");
    }
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();
    run(Cli::parse())
}

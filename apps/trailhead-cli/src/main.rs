use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use trailhead_carve::{BlockGrid, ChunkGenerator};
use trailhead_common::{GridCoord, LevelConfig, Side};
use trailhead_persist::LevelStore;
use trailhead_stream::{SinkFactory, StreamingManager};
use trailhead_terrain::{FlatHeightSource, HeightField, HeightSource, NoiseHeightSource};
use trailhead_tools::{LevelInspector, render_blocks, render_layout, render_level_map};

#[derive(Parser)]
#[command(name = "trailhead-cli", about = "Procedural corridor level generator")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Level configuration (YAML). Defaults apply when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Generate a single chunk and print its layout and block columns
    Chunk {
        /// Per-chunk seed
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        seed: i32,
        /// Side the corridor enters from
        #[arg(long, default_value = "west")]
        entry: Side,
        /// Exit sides, comma separated
        #[arg(long, value_delimiter = ',', default_value = "east")]
        exits: Vec<Side>,
        /// Chunk x coordinate used to sample terrain
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        x: i32,
        /// Chunk z coordinate used to sample terrain
        #[arg(long, default_value = "0", allow_hyphen_values = true)]
        z: i32,
        /// Use flat terrain instead of noise
        #[arg(long)]
        flat: bool,
    },
    /// Build a level and walk the observer along its frontier
    Walk {
        /// Number of chunks to advance
        #[arg(short, long, default_value = "20")]
        steps: usize,
        /// Global seed (overrides the config; 0 picks one)
        #[arg(long)]
        seed: Option<u64>,
        /// Save the final state into this level store
        #[arg(long)]
        save: Option<PathBuf>,
    },
    /// Continue the latest snapshot in a level store
    Resume {
        /// Level store directory
        store: PathBuf,
        /// Number of chunks to advance
        #[arg(short, long, default_value = "20")]
        steps: usize,
        /// Don't write the new state back
        #[arg(long)]
        dry_run: bool,
    },
    /// Check a level store's hash chain and latest snapshot
    Verify {
        /// Level store directory
        store: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("trailhead-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", trailhead_common::crate_info());
            println!("terrain: {}", trailhead_terrain::crate_info());
            println!("carve: {}", trailhead_carve::crate_info());
            println!("stream: {}", trailhead_stream::crate_info());
            println!("persist: {}", trailhead_persist::crate_info());
            println!("tools: {}", trailhead_tools::crate_info());
        }
        Commands::Chunk {
            seed,
            entry,
            exits,
            x,
            z,
            flat,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let coord = GridCoord::new(x, z);
            let source: Box<dyn HeightSource> = if flat {
                Box::new(FlatHeightSource::new(0))
            } else {
                let level_seed = config.resolve_seed();
                Box::new(NoiseHeightSource::from_config(&config.terrain, level_seed))
            };
            let heights = HeightField::sample(source.as_ref(), coord, config.chunk_dim);

            let generator = ChunkGenerator::from_config(&config);
            let mut grid = BlockGrid::new();
            let layout = generator.generate_into(seed, entry, &exits, &heights, &mut grid);

            println!(
                "Chunk {coord}: seed={seed} entry={entry} exits={exits:?} dim={}",
                config.chunk_dim
            );
            println!(
                "walkable={} connected={} blocks={}",
                layout.walkable.len(),
                layout.is_connected(),
                grid.block_count()
            );
            println!("\nLayout:\n{}", render_layout(&layout));
            println!("Columns:\n{}", render_blocks(&grid, config.chunk_dim));
        }
        Commands::Walk { steps, seed, save } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(seed) = seed {
                config.seed = seed;
            }
            let mut manager = StreamingManager::new(config, grid_factory())?;
            println!("Spawn: {}", manager.spawn_point());
            walk(&mut manager, steps)?;
            report(&manager);

            if let Some(path) = save {
                let mut store = LevelStore::open(&path)
                    .with_context(|| format!("opening level store at {}", path.display()))?;
                let index = store.save(&manager.save_state())?;
                println!("Saved snapshot {index} to {}", path.display());
            }
        }
        Commands::Resume {
            store: path,
            steps,
            dry_run,
        } => {
            let mut store = LevelStore::open(&path)
                .with_context(|| format!("opening level store at {}", path.display()))?;
            let state = store.load_latest()?;
            println!(
                "Loaded snapshot {} (seed={}, records={})",
                store.meta().snapshot_count,
                state.seed,
                state.records.len()
            );
            let mut manager = StreamingManager::resume(state, grid_factory())?;
            walk(&mut manager, steps)?;
            report(&manager);

            if !dry_run {
                let index = store.save(&manager.save_state())?;
                println!("Saved snapshot {index} to {}", path.display());
            }
        }
        Commands::Verify { store: path } => {
            let store = LevelStore::open(&path)
                .with_context(|| format!("opening level store at {}", path.display()))?;
            store.verify_integrity()?;
            println!(
                "Hash chain OK: {} snapshot(s)",
                store.manifest().entries.len()
            );
            let state = store.load_latest()?;
            let manager = StreamingManager::resume(state, grid_factory())?;
            let issues = LevelInspector::audit_frontier(&manager);
            report(&manager);
            if issues.is_empty() {
                println!("Frontier: OK");
            } else {
                anyhow::bail!("frontier closure violated: {issues:?}");
            }
        }
    }

    Ok(())
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LevelConfig> {
    let config = match path {
        Some(path) => LevelConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => LevelConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

fn grid_factory() -> SinkFactory<BlockGrid> {
    Box::new(|| Ok(BlockGrid::new()))
}

fn walk(manager: &mut StreamingManager<BlockGrid>, steps: usize) -> anyhow::Result<()> {
    for step in 0..steps {
        let Some(target) = LevelInspector::frontier_waypoint(manager) else {
            tracing::info!(step, "no open frontier left; stopping");
            break;
        };
        manager.on_observer_moved(target)?;
        let stats = manager.stats();
        tracing::debug!(
            step,
            coord = ?manager.current_coord(),
            synthesized = stats.chunks_synthesized,
            replayed = stats.chunks_replayed,
            released = stats.chunks_released,
            "observer advanced"
        );
    }
    Ok(())
}

fn report(manager: &StreamingManager<BlockGrid>) {
    println!("{}", LevelInspector::summary(manager));
    let timer = manager.frame_timer();
    println!(
        "Window updates: {} avg={:?} worst={:?}",
        timer.count(),
        timer.average(),
        timer.max()
    );
    if let Some(center) = manager.current_coord() {
        let radius = manager.config().window_radius() as i32 + 2;
        println!(
            "\n{}",
            render_level_map(manager.graph(), center, radius, |c| manager.is_active(c))
        );
    }
}

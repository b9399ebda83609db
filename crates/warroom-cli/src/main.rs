//! Warroom CLI - match archive tooling.
//!
//! - `warroom inspect` - summarize an archive
//! - `warroom seek` - print the state at the start of a turn
//! - `warroom verify` - replay every action and report the first divergence
//! - `warroom convert` - rewrite an archive in the current format
//! - `warroom export-rules` - write the rule catalogs as JSON

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use warroom_core::{
    load_ruleset, parse_archive, visible_set, visible_units, write_archive, GameState,
    ReplayConfig, ReplayError, ReplaySession, Ruleset, RulesSource, SeekStatus, SeekWorker,
};
use warroom_protocol::{PlayerId, ReplayDocument};

#[derive(Parser)]
#[command(name = "warroom")]
#[command(about = "Replay tooling for turn-based strategy match archives", version)]
struct Cli {
    /// Directory with rule catalogs (defaults to the built-in set)
    #[arg(long, global = true)]
    rules: Option<PathBuf>,

    /// YAML replay configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize an archive
    Inspect { archive: PathBuf },

    /// Show the state at the start of a turn
    Seek {
        archive: PathBuf,

        /// Zero-based turn index
        #[arg(long)]
        turn: u32,

        /// Player id whose view to show
        #[arg(long)]
        observer: Option<u32>,

        /// Ignore fog and show everything
        #[arg(long)]
        omniscient: bool,

        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replay the whole log and report the first action that does not reproduce
    Verify { archive: PathBuf },

    /// Rewrite an archive in the current format
    Convert {
        archive: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Write the active rule catalogs to a directory
    ExportRules { dir: PathBuf },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    fmt().with_env_filter(filter).with_target(false).init();

    let rules = Arc::new(match &cli.rules {
        Some(dir) => load_ruleset(RulesSource::Path(dir.clone()))
            .with_context(|| format!("loading rules from {}", dir.display()))?,
        None => load_ruleset(RulesSource::Embedded).context("loading built-in rules")?,
    });
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ReplayConfig::default(),
    };

    match cli.command {
        Commands::Inspect { archive } => inspect(&rules, &read_archive(&archive)?),
        Commands::Seek {
            archive,
            turn,
            observer,
            omniscient,
            json,
        } => {
            let mut config = config;
            if omniscient {
                config.only_show_known_info = false;
            }
            let document = read_archive(&archive)?;
            seek(rules, config, document, turn, observer.map(PlayerId), json).await
        }
        Commands::Verify { archive } => verify(rules, config, read_archive(&archive)?),
        Commands::Convert { archive, output } => convert(&archive, &output),
        Commands::ExportRules { dir } => export_rules(&rules, &dir),
    }
}

fn load_config(path: &Path) -> Result<ReplayConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_yaml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn read_archive(path: &Path) -> Result<ReplayDocument> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading archive {}", path.display()))?;
    parse_archive(&bytes).with_context(|| format!("decoding archive {}", path.display()))
}

fn inspect(rules: &Ruleset, document: &ReplayDocument) -> Result<()> {
    let info = &document.info;
    let map = &document.initial.map;

    println!("Match {} \"{}\"", info.id, info.name);
    println!("==========");
    println!("Format version: {}", document.source_version);
    println!("Map: {}x{}", map.width, map.height);
    println!(
        "Fog of war: {}, CO powers: {}",
        yes_no(info.fog_of_war),
        yes_no(info.co_powers)
    );
    println!(
        "Turns: {}, actions: {}",
        document.turn_count(),
        document.log.len()
    );
    println!();
    println!("Players:");
    for player in &document.initial.players {
        let co = rules
            .co(player.co)
            .map(|co| co.name.as_str())
            .unwrap_or("unknown CO");
        let country = rules
            .country(player.country)
            .map(|c| c.code.as_str())
            .unwrap_or("??");
        let team = player
            .team
            .map(|t| format!(", team {t}"))
            .unwrap_or_default();
        println!("  {} {} ({co}, {country}{team})", player.id, player.name);
    }
    println!();
    println!("Units at start: {}", document.initial.units.len());
    Ok(())
}

async fn seek(
    rules: Arc<Ruleset>,
    config: ReplayConfig,
    document: ReplayDocument,
    turn: u32,
    observer: Option<PlayerId>,
    json: bool,
) -> Result<()> {
    let fog = config.fog_options();
    let session = ReplaySession::new(Arc::clone(&rules), config, document)?;
    let worker = SeekWorker::spawn(session);
    let mut status = worker.subscribe();
    worker.seek(turn);

    let state = loop {
        status.changed().await.context("seek worker stopped")?;
        let current = status.borrow_and_update().clone();
        match current {
            SeekStatus::Ready { turn: t, state } if t == turn => break state,
            SeekStatus::Failed { turn: t, error } if t == turn => {
                worker.shutdown().await;
                bail!("seek to turn {turn} failed: {error}");
            }
            _ => {}
        }
    };
    worker.shutdown().await;

    if json {
        println!("{}", serde_json::to_string_pretty(&state.to_snapshot())?);
        return Ok(());
    }
    print_state(&rules, &state, observer, fog)
}

fn print_state(
    rules: &Ruleset,
    state: &GameState,
    observer: Option<PlayerId>,
    fog: warroom_core::FogOptions,
) -> Result<()> {
    println!(
        "Turn {} (day {}) - {:?}, weather {:?}",
        state.turn, state.day, state.phase, state.weather
    );
    println!();
    for player in &state.players {
        let status = if player.eliminated { " (eliminated)" } else { "" };
        println!(
            "  {} {}: funds {}, charge {}{status}",
            player.id, player.name, player.funds, player.power_charge
        );
    }
    println!();

    let observer = match observer.or_else(|| state.phase.active_player()) {
        Some(id) => id,
        None => state
            .players
            .first()
            .map(|p| p.id)
            .context("match has no players")?,
    };
    let visible = visible_set(rules, state, observer, fog);
    let units = visible_units(state, observer, &visible, fog);
    println!(
        "As seen by {observer}: {} of {} tiles, {} units",
        visible.len(),
        state.map.len(),
        units.len()
    );
    for unit in units {
        let name = rules
            .unit_type(unit.unit_type)
            .map(|t| t.name.as_str())
            .unwrap_or("unknown");
        if let Some(pos) = unit.pos {
            println!(
                "  {} {name} [{}] at {pos}: hp {}, fuel {}, ammo {}",
                unit.id,
                unit.owner,
                unit.display_hp(),
                unit.fuel,
                unit.ammo
            );
        }
    }
    Ok(())
}

fn verify(rules: Arc<Ruleset>, config: ReplayConfig, document: ReplayDocument) -> Result<()> {
    let mut session = ReplaySession::new(rules, config, document)?;
    let last = session.turn_count() - 1;
    match session.snapshot_at(last) {
        Ok(state) => {
            println!(
                "OK: {} turns reproduce, final state hash {:016x}",
                session.turn_count(),
                state.state_hash()?
            );
            Ok(())
        }
        Err(ReplayError::InvariantViolation {
            turn,
            seq,
            action,
            source,
            ..
        }) => {
            bail!("turn {turn}, action {seq} ({}) does not reproduce: {source}", action.name())
        }
        Err(err) => Err(err.into()),
    }
}

fn convert(input: &Path, output: &Path) -> Result<()> {
    let document = read_archive(input)?;
    let bytes = write_archive(&document)?;
    std::fs::write(output, bytes).with_context(|| format!("writing {}", output.display()))?;
    tracing::info!(
        from = document.source_version,
        output = %output.display(),
        "Converted archive"
    );
    Ok(())
}

fn export_rules(rules: &Ruleset, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    let files = [
        ("terrain.json", rules.terrains.to_json()?),
        ("buildings.json", rules.buildings.to_json()?),
        ("units.json", rules.units.to_json()?),
        ("cos.json", rules.cos.to_json()?),
        ("countries.json", rules.countries.to_json()?),
    ];
    for (name, json) in files {
        let path = dir.join(name);
        std::fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    }
    println!("Wrote rule catalogs to {}", dir.display());
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

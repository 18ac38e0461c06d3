mod render;

use std::{
    fs::{self, OpenOptions},
    path::PathBuf,
    sync::{Arc, Mutex},
};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{debug, warn};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};
use uuid::Uuid;
use xsquad_core::{
    config::{self, AppConfig},
    Catalog, CatalogLoader, Faction, HyperspacePolicy, JsonFileStorage, PersistenceError,
    SlotKind, Squad, SquadError, SquadRepository,
};

#[derive(Parser)]
#[command(name = "xsquad")]
#[command(about = "Build, price and store X-Wing squads")]
struct Args {
    /// Config file to use instead of the user default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Browse the card catalog
    #[command(subcommand)]
    Catalog(CatalogCommand),
    /// List stored squads with their point totals
    List,
    /// Show one squad with per-card costs and open slots
    Show {
        squad: String,
        /// Print the stored JSON document instead
        #[arg(long)]
        json: bool,
    },
    /// Create an empty squad
    New {
        faction: Faction,
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Change a squad's name and description
    Rename {
        squad: String,
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Add a pilot to a squad
    AddPilot {
        squad: String,
        ship: String,
        pilot: String,
    },
    /// Remove a member from a squad, by position or id
    RemovePilot { squad: String, member: String },
    /// Equip an upgrade on a member
    AddUpgrade {
        squad: String,
        member: String,
        upgrade: String,
    },
    /// Unequip the last copy of an upgrade from a member
    RemoveUpgrade {
        squad: String,
        member: String,
        upgrade: String,
    },
    /// Toggle the hyperspace-only restriction
    Hyperspace {
        squad: String,
        #[arg(value_enum)]
        state: Toggle,
        /// Remove illegal pilots and upgrades instead of refusing
        #[arg(long)]
        strip: bool,
    },
    /// Store a copy of a squad
    Duplicate { squad: String },
    /// Delete a squad
    Delete { squad: String },
}

#[derive(Subcommand)]
enum CatalogCommand {
    /// Ships, optionally for one faction
    Ships {
        #[arg(short, long)]
        faction: Option<Faction>,
    },
    /// Pilots of a ship or a faction
    Pilots {
        ship: Option<String>,
        #[arg(short, long)]
        faction: Option<Faction>,
        /// Only hyperspace-legal pilots
        #[arg(long)]
        hyperspace: bool,
    },
    /// Upgrades, optionally for one slot kind
    Upgrades {
        #[arg(short, long)]
        slot: Option<SlotKind>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => AppConfig::load_from(path)?,
        None => {
            config::ensure_default_config()?;
            AppConfig::load()?
        }
    };
    init_logging(&config)?;

    let catalog = Arc::new(
        CatalogLoader::new(config.catalog_root())
            .load()
            .context("failed to load the card catalog")?,
    );

    let command = match args.command {
        Command::Catalog(command) => return print_catalog(&catalog, command),
        command => command,
    };
    let repo = open_repository(&config, catalog)?;
    repo.subscribe(|event| debug!(?event, "Squad event"));
    run(&repo, command)
}

fn init_logging(config: &AppConfig) -> Result<()> {
    let log_dir = config.log_dir();
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;
    let log_path = log_dir.join("xsquad.log");
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(LevelFilter::WARN);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(false)
        .compact()
        .with_writer(Mutex::new(log_file));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(())
}

fn open_repository(config: &AppConfig, catalog: Arc<Catalog>) -> Result<SquadRepository> {
    let storage = Arc::new(JsonFileStorage::new(config.squads_path()));
    let repo = match SquadRepository::open(storage.clone(), catalog.clone()) {
        Ok(repo) => repo,
        Err(SquadError::Persistence(err @ PersistenceError::Malformed { .. })) => {
            let moved = storage.quarantine()?;
            warn!(%err, moved = ?moved, "Starting with an empty squad list");
            SquadRepository::empty(storage, catalog)
        }
        Err(err) => return Err(err.into()),
    };
    Ok(repo.with_hyperspace_policy(config.hyperspace_policy))
}

fn print_catalog(catalog: &Catalog, command: CatalogCommand) -> Result<()> {
    let output = match command {
        CatalogCommand::Ships { faction } => {
            let ships = match faction {
                Some(faction) => catalog.ships_for_faction(faction),
                None => catalog.ships().iter().collect(),
            };
            render::ships(&ships)?
        }
        CatalogCommand::Pilots {
            ship,
            faction,
            hyperspace,
        } => {
            let pilots = match (ship, faction) {
                (Some(ship), _) => catalog
                    .pilots_for_ship(&ship)?
                    .into_iter()
                    .filter(|pilot| !hyperspace || pilot.hyperspace)
                    .collect(),
                (None, Some(faction)) => catalog.pilots_for_faction(faction, hyperspace),
                (None, None) => catalog
                    .pilots()
                    .iter()
                    .filter(|pilot| !hyperspace || pilot.hyperspace)
                    .collect(),
            };
            render::pilots(&pilots)?
        }
        CatalogCommand::Upgrades { slot } => {
            let upgrades = match slot {
                Some(slot) => catalog.upgrades_for_slot(slot),
                None => catalog.upgrades().iter().collect(),
            };
            render::upgrades(&upgrades)?
        }
    };
    print!("{output}");
    Ok(())
}

fn run(repo: &SquadRepository, command: Command) -> Result<()> {
    match command {
        Command::Catalog(command) => print_catalog(repo.catalog(), command)?,
        Command::List => {
            print!("{}", render::squad_list(repo.catalog(), &repo.all())?);
        }
        Command::Show { squad, json } => {
            let squad = find_squad(&repo.all(), &squad)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&squad)?);
            } else {
                print!("{}", render::squad(repo.catalog(), &squad)?);
            }
        }
        Command::New {
            faction,
            name,
            description,
        } => {
            let squad = repo.create(faction, name)?;
            if !description.is_empty() {
                repo.rename(squad.id(), squad.name(), &description)?;
            }
            println!("Created {} ({})", squad.name(), squad.id());
        }
        Command::Rename {
            squad,
            name,
            description,
        } => {
            let squad = find_squad(&repo.all(), &squad)?;
            repo.rename(squad.id(), &name, &description)?;
            println!("Renamed {} to {name}", squad.name());
        }
        Command::AddPilot { squad, ship, pilot } => {
            let squad = find_squad(&repo.all(), &squad)?;
            let member = repo.add_member(squad.id(), &ship, &pilot)?;
            println!(
                "Added {} ({}); squad total {}",
                member.pilot(),
                member.id(),
                repo.squad_cost(squad.id())?
            );
        }
        Command::RemovePilot { squad, member } => {
            let squad = find_squad(&repo.all(), &squad)?;
            let member = find_member(&squad, &member)?;
            let removed = repo.remove_member(squad.id(), member)?;
            println!("Removed {}", removed.pilot());
        }
        Command::AddUpgrade {
            squad,
            member,
            upgrade,
        } => {
            let squad = find_squad(&repo.all(), &squad)?;
            let member = find_member(&squad, &member)?;
            repo.add_upgrade(squad.id(), member, &upgrade)?;
            println!(
                "Equipped {upgrade}; squad total {}",
                repo.squad_cost(squad.id())?
            );
        }
        Command::RemoveUpgrade {
            squad,
            member,
            upgrade,
        } => {
            let squad = find_squad(&repo.all(), &squad)?;
            let member_id = find_member(&squad, &member)?;
            let handle = squad
                .member(member_id)
                .and_then(|member| {
                    member
                        .upgrades()
                        .iter()
                        .rev()
                        .find(|equipped| equipped.upgrade() == upgrade)
                })
                .map(|equipped| equipped.handle())
                .with_context(|| format!("{upgrade} is not equipped on that member"))?;
            let removed = repo.remove_upgrade(squad.id(), member_id, handle)?;
            let names: Vec<_> = removed.iter().map(|equipped| equipped.upgrade()).collect();
            println!("Removed {}", names.join(", "));
        }
        Command::Hyperspace {
            squad,
            state,
            strip,
        } => {
            let squad = find_squad(&repo.all(), &squad)?;
            let repo = if strip {
                repo.clone().with_hyperspace_policy(HyperspacePolicy::Strip)
            } else {
                repo.clone()
            };
            let change = repo.set_hyperspace_only(squad.id(), matches!(state, Toggle::On))?;
            for member in &change.removed_members {
                println!("Removed {}", member.pilot());
            }
            for (_, equipped) in &change.removed_upgrades {
                println!("Removed {}", equipped.upgrade());
            }
        }
        Command::Duplicate { squad } => {
            let squad = find_squad(&repo.all(), &squad)?;
            let copy = repo.duplicate(squad.id())?;
            println!("Copied {} to {}", squad.name(), copy.id());
        }
        Command::Delete { squad } => {
            let squad = find_squad(&repo.all(), &squad)?;
            if repo.delete(squad.id())? {
                println!("Deleted {}", squad.name());
            }
        }
    }
    Ok(())
}

/// Match a squad by id, id prefix or exact name.
fn find_squad(squads: &[Squad], needle: &str) -> Result<Squad> {
    let lowered = needle.to_lowercase();
    let matches: Vec<&Squad> = squads
        .iter()
        .filter(|squad| {
            squad.id().to_string().starts_with(&lowered) || squad.name().eq_ignore_ascii_case(needle)
        })
        .collect();
    match matches.as_slice() {
        [squad] => Ok((*squad).clone()),
        [] => bail!("no squad matches '{needle}'"),
        _ => bail!("'{needle}' matches {} squads", matches.len()),
    }
}

/// Match a member by 1-based position, id or id prefix.
fn find_member(squad: &Squad, needle: &str) -> Result<Uuid> {
    if let Ok(position) = needle.parse::<usize>() {
        if let Some(member) = position.checked_sub(1).and_then(|index| squad.members().get(index)) {
            return Ok(member.id());
        }
    }
    let lowered = needle.to_lowercase();
    let matches: Vec<Uuid> = squad
        .members()
        .iter()
        .map(|member| member.id())
        .filter(|id| id.to_string().starts_with(&lowered))
        .collect();
    match matches.as_slice() {
        [id] => Ok(*id),
        [] => bail!("no member of {} matches '{needle}'", squad.name()),
        _ => bail!("'{needle}' matches {} members", matches.len()),
    }
}

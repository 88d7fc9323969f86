use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use pet_core::response::{
    ActionResponse, CoupleCreatedResponse, CoupleResponse, FailureResponse, HistoryResponse,
    PetCreatedResponse, PetStateResponse, UserResponse,
};
use pet_core::*;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "petpal")]
#[command(about = "Virtual pet shared by a couple", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use a specific config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluate the request at this instant (RFC 3339) instead of now
    #[arg(long, global = true, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,

    /// Log progress to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show whether a user belongs to a couple
    User {
        #[arg(long)]
        user_id: UserId,
    },

    /// Show the couple a user belongs to
    Couple {
        #[arg(long)]
        user_id: UserId,
    },

    /// Pair two users into a couple
    CreateCouple {
        #[arg(long)]
        user1_id: UserId,

        #[arg(long)]
        user2_id: UserId,

        #[arg(long, default_value = "")]
        user1_name: String,

        #[arg(long, default_value = "")]
        user2_name: String,
    },

    /// Adopt the couple's pet
    CreatePet {
        #[arg(long)]
        couple_id: CoupleId,

        /// Pet type tag from the catalog (cat, dog, rabbit)
        #[arg(long)]
        pet_type: String,

        #[arg(long)]
        name: Option<String>,
    },

    /// Show the couple's pet with stats brought up to date
    Pet {
        #[arg(long)]
        couple_id: CoupleId,
    },

    /// Perform an action on the couple's pet
    Action {
        #[arg(long)]
        couple_id: CoupleId,

        /// Action type tag from the catalog (feed, play, sleep, pet)
        #[arg(long)]
        action_type: String,

        #[arg(long)]
        user_id: UserId,
    },

    /// Show recent actions, newest first
    History {
        #[arg(long)]
        couple_id: CoupleId,

        /// Maximum number of actions (capped at 10)
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Export the full action history to CSV
    Export {
        #[arg(long)]
        couple_id: CoupleId,

        #[arg(long)]
        output: PathBuf,
    },

    /// List pet and action types
    Catalog,
}

fn parse_instant(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{}': {}", value, e))
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.verbose {
        pet_core::logging::init_with_level("info");
    } else {
        pet_core::logging::init();
    }

    match run(cli) {
        Ok(value) => {
            println!("{}", value);
            ExitCode::SUCCESS
        }
        Err(e) => {
            let failure = FailureResponse::from(&e);
            println!("{}", json!(failure));
            if e.is_domain() {
                ExitCode::from(1)
            } else {
                tracing::error!("{}", e);
                ExitCode::from(2)
            }
        }
    }
}

fn run(cli: Cli) -> Result<Value> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    let catalog = match &config.catalog.path {
        Some(path) => Catalog::load_from(path)?,
        None => build_default_catalog(),
    };

    let data_dir = cli.data_dir.unwrap_or_else(|| config.data.data_dir.clone());
    let store = Arc::new(FileStore::open(data_dir)?);
    let clock: SharedClock = match cli.now {
        Some(now) => Arc::new(FixedClock::new(now)),
        None => Arc::new(DefaultClock),
    };
    let engine = PetEngine::with_clock(store, Arc::new(catalog), clock);

    let value = match cli.command {
        Commands::User { user_id } => json!(UserResponse::from(&engine.user_status(user_id)?)),
        Commands::Couple { user_id } => {
            json!(CoupleResponse::from(&engine.couple_for_user(user_id)?))
        }
        Commands::CreateCouple {
            user1_id,
            user2_id,
            user1_name,
            user2_name,
        } => {
            let couple = engine.create_couple(
                CoupleMember {
                    id: user1_id,
                    name: user1_name,
                },
                CoupleMember {
                    id: user2_id,
                    name: user2_name,
                },
            )?;
            json!(CoupleCreatedResponse::new(couple.id))
        }
        Commands::CreatePet {
            couple_id,
            pet_type,
            name,
        } => {
            let pet = engine.create_pet(couple_id, &pet_type, name.as_deref())?;
            json!(PetCreatedResponse::new(pet.id))
        }
        Commands::Pet { couple_id } => {
            json!(PetStateResponse::from(&engine.get_pet_state(couple_id)?))
        }
        Commands::Action {
            couple_id,
            action_type,
            user_id,
        } => {
            let outcome = engine.perform_action(couple_id, &action_type, user_id)?;
            json!(ActionResponse::from(&outcome))
        }
        Commands::History { couple_id, limit } => {
            let limit = limit.unwrap_or(config.history.default_limit);
            json!(HistoryResponse {
                actions: engine.recent_actions(couple_id, Some(limit))?,
            })
        }
        Commands::Export { couple_id, output } => {
            let count = engine.export_history(couple_id, &output)?;
            json!({
                "success": true,
                "exported": count,
                "path": output.display().to_string(),
            })
        }
        Commands::Catalog => cmd_catalog(engine.catalog())?,
    };

    Ok(value)
}

/// Pet and action types, sorted by tag
fn cmd_catalog(catalog: &Catalog) -> Result<Value> {
    let mut pet_types: Vec<_> = catalog.pet_types.values().collect();
    pet_types.sort_by(|a, b| a.id.cmp(&b.id));

    let mut actions: Vec<_> = catalog.actions.values().collect();
    actions.sort_by(|a, b| a.id.cmp(&b.id));

    Ok(json!({
        "pet_types": serde_json::to_value(pet_types)?,
        "actions": serde_json::to_value(actions)?,
    }))
}

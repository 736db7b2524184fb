#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the pole guard.
//!
//! ```text
//! pole_guard check-location --user 3 --lat 31.5204 --lng 74.3587
//! pole_guard nearby --zone 1 --lat 31.5204 --lng 74.3587 --limit 5
//! pole_guard overlap --zone 1 --lat 31.5204 --lng 74.3587 --radius 150
//! pole_guard line-of-sight --pole 7 --lat 31.5210 --lng 74.3590
//! pole_guard pole create --zone 1 --name "Mall Road 4" --lat 31.52 --lng 74.35 --height 18 --radius 150
//! pole_guard zone create --name "Gulberg" --boundary gulberg.geojson
//! ```
//!
//! Records are read from and written back to a JSON dataset
//! (`--dataset`, default `pole_guard.json`). Output is pretty-printed JSON.
//! Set `RUST_LOG=info` to see what the service decides and why.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use pole_guard_elevation::HttpElevationProvider;
use pole_guard_policy::OverlapCandidate;
use pole_guard_policy_models::{NEARBY_POLES_LIMIT, round2};
use pole_guard_service::config::PolicyConfig;
use pole_guard_service::{LineOfSightRequest, PolicyService};
use pole_guard_spatial::{boundary_from_geojson, distance_meters, point_in_zone};
use pole_guard_store::{Dataset, MemoryStore};
use pole_guard_zone_models::{
    BoundaryPoint, Coordinate, LandOwnerId, NewPole, NewZone, PoleId, PoleUpdate, UserId,
    ValidationError, ZoneId,
};
use serde::Serialize;

#[derive(Parser)]
#[command(
    name = "pole_guard",
    about = "Zone, pole, and marketing-restriction checks over a JSON dataset"
)]
struct Cli {
    /// JSON dataset of zones, poles, users, land owners, and calculations
    #[arg(long, default_value = "pole_guard.json")]
    dataset: PathBuf,

    /// TOML configuration file (cache TTLs, elevation provider)
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct Position {
    /// Latitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lat: f64,
    /// Longitude in degrees
    #[arg(long, allow_negative_numbers = true)]
    lng: f64,
}

impl Position {
    fn coordinate(&self) -> Result<Coordinate, ValidationError> {
        Coordinate::new(self.lat, self.lng)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Decide whether an agent may market at a position (GREEN/RED/GRAY)
    CheckLocation {
        /// Zone to check against
        #[arg(long, conflicts_with = "user")]
        zone: Option<i64>,
        /// Agent whose assigned zone is used
        #[arg(long)]
        user: Option<i64>,
        #[command(flatten)]
        at: Position,
    },
    /// List the active poles of a zone closest to a position
    Nearby {
        #[arg(long)]
        zone: i64,
        #[command(flatten)]
        at: Position,
        #[arg(long, default_value_t = NEARBY_POLES_LIMIT)]
        limit: usize,
    },
    /// Report the pole a proposed position and radius would overlap
    Overlap {
        #[arg(long)]
        zone: i64,
        #[command(flatten)]
        at: Position,
        /// Proposed restricted radius in meters
        #[arg(long)]
        radius: f64,
        /// Pole being moved, ignored in the comparison
        #[arg(long)]
        exclude: Option<i64>,
    },
    /// Compute and record line of sight from a position to a pole top
    LineOfSight {
        #[arg(long)]
        pole: i64,
        #[command(flatten)]
        at: Position,
        /// User recorded as having run the calculation
        #[arg(long)]
        user: Option<i64>,
        #[arg(long)]
        notes: Option<String>,
    },
    /// Line-of-sight history of a pole, newest first
    History {
        #[arg(long)]
        pole: i64,
    },
    /// Paginated line-of-sight records, newest first
    Calculations {
        #[arg(long)]
        zone: Option<i64>,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
    /// Great-circle distance between two positions in meters
    Distance {
        #[arg(long, allow_negative_numbers = true)]
        from_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        from_lng: f64,
        #[arg(long, allow_negative_numbers = true)]
        to_lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        to_lng: f64,
    },
    /// Whether a position lies inside a zone's boundary
    Contains {
        #[arg(long)]
        zone: i64,
        #[command(flatten)]
        at: Position,
    },
    /// Manage zones
    Zone {
        #[command(subcommand)]
        command: ZoneCommand,
    },
    /// Manage poles
    Pole {
        #[command(subcommand)]
        command: PoleCommand,
    },
}

#[derive(Subcommand)]
enum ZoneCommand {
    /// List every zone
    List,
    /// Create a zone from a boundary file
    Create {
        #[arg(long)]
        name: String,
        /// JSON array of points, or a GeoJSON Polygon/Feature
        #[arg(long)]
        boundary: PathBuf,
        #[arg(long)]
        description: Option<String>,
    },
    /// Flip a zone between active and inactive
    Toggle { id: i64 },
    /// Delete a zone that owns no poles or users
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum PoleCommand {
    /// List poles, optionally of one zone
    List {
        #[arg(long)]
        zone: Option<i64>,
    },
    /// Create a pole
    Create {
        #[arg(long)]
        zone: i64,
        #[arg(long)]
        name: String,
        #[command(flatten)]
        at: Position,
        /// Height above ground in meters
        #[arg(long)]
        height: f64,
        /// Restricted radius in meters (50-5000)
        #[arg(long)]
        radius: f64,
        #[arg(long)]
        land_owner: Option<i64>,
    },
    /// Change some fields of a pole
    Update {
        id: i64,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, allow_negative_numbers = true, requires = "lng")]
        lat: Option<f64>,
        #[arg(long, allow_negative_numbers = true, requires = "lat")]
        lng: Option<f64>,
        #[arg(long)]
        height: Option<f64>,
        #[arg(long)]
        radius: Option<f64>,
        #[arg(long)]
        land_owner: Option<i64>,
    },
    /// Flip a pole between active and inactive
    Toggle { id: i64 },
    /// Delete a pole
    Delete { id: i64 },
}

type Service = PolicyService<MemoryStore, HttpElevationProvider>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    pretty_env_logger::init_custom_env("RUST_LOG");
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => PolicyConfig::load(path)?,
        None => PolicyConfig::default(),
    };

    let store = Arc::new(MemoryStore::from_dataset(load_dataset(&cli.dataset)?));
    let service = PolicyService::from_config(Arc::clone(&store), &config)?;

    if run(&service, cli.command).await? {
        store.dataset()?.save(&cli.dataset)?;
        log::info!("Saved dataset to {}", cli.dataset.display());
    }

    Ok(())
}

fn load_dataset(path: &Path) -> Result<Dataset, Box<dyn std::error::Error>> {
    if path.exists() {
        Ok(Dataset::load(path)?)
    } else {
        log::warn!("{} does not exist, starting empty", path.display());
        Ok(Dataset::default())
    }
}

/// Runs one command. Returns whether the dataset changed.
async fn run(service: &Service, command: Commands) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        Commands::CheckLocation { zone, user, at } => {
            let agent = at.coordinate()?;
            let verdict = match user {
                Some(user) => service.check_agent_location(UserId(user), agent).await?,
                None => service.check_location(zone.map(ZoneId), agent).await?,
            };
            print_json(&verdict)?;
        }
        Commands::Nearby { zone, at, limit } => {
            let nearby = service
                .nearby_poles(ZoneId(zone), at.coordinate()?, limit)
                .await?;
            print_json(&nearby)?;
        }
        Commands::Overlap {
            zone,
            at,
            radius,
            exclude,
        } => {
            let candidate = OverlapCandidate::new(ZoneId(zone), at.coordinate()?, radius)?;
            match service.check_overlap(&candidate, exclude.map(PoleId)).await? {
                Some(conflict) => print_json(&conflict)?,
                None => print_json(&serde_json::json!({ "overlap": false }))?,
            }
        }
        Commands::LineOfSight {
            pole,
            at,
            user,
            notes,
        } => {
            let report = service
                .calculate_line_of_sight(LineOfSightRequest {
                    pole_id: PoleId(pole),
                    agent: at.coordinate()?,
                    calculated_by: user.map(UserId),
                    calculation_notes: notes,
                })
                .await?;
            print_json(&report)?;
            return Ok(true);
        }
        Commands::History { pole } => {
            print_json(&service.line_of_sight_history(PoleId(pole)).await?)?;
        }
        Commands::Calculations { zone, page } => {
            print_json(&service.recent_calculations(zone.map(ZoneId), page).await?)?;
        }
        Commands::Distance {
            from_lat,
            from_lng,
            to_lat,
            to_lng,
        } => {
            let from = Coordinate::new(from_lat, from_lng)?;
            let to = Coordinate::new(to_lat, to_lng)?;
            print_json(&serde_json::json!({
                "distance_meters": round2(distance_meters(from, to)),
            }))?;
        }
        Commands::Contains { zone, at } => {
            let zone = service.zone(ZoneId(zone)).await?;
            let point = at.coordinate()?;
            print_json(&serde_json::json!({
                "zone_id": zone.id,
                "zone_name": zone.name,
                "inside": point_in_zone(point, &zone.boundary),
            }))?;
        }
        Commands::Zone { command } => return run_zone(service, command).await,
        Commands::Pole { command } => return run_pole(service, command).await,
    }

    Ok(false)
}

async fn run_zone(
    service: &Service,
    command: ZoneCommand,
) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        ZoneCommand::List => {
            print_json(&service.list_zones().await?)?;
            Ok(false)
        }
        ZoneCommand::Create {
            name,
            boundary,
            description,
        } => {
            let boundary = read_boundary(&boundary)?;
            let zone = service
                .create_zone(NewZone {
                    name,
                    boundary,
                    description,
                    status: None,
                })
                .await?;
            print_json(&zone)?;
            Ok(true)
        }
        ZoneCommand::Toggle { id } => {
            print_json(&service.toggle_zone_status(ZoneId(id)).await?)?;
            Ok(true)
        }
        ZoneCommand::Delete { id } => {
            service.delete_zone(ZoneId(id)).await?;
            print_json(&serde_json::json!({ "deleted": id }))?;
            Ok(true)
        }
    }
}

async fn run_pole(
    service: &Service,
    command: PoleCommand,
) -> Result<bool, Box<dyn std::error::Error>> {
    match command {
        PoleCommand::List { zone } => {
            print_json(&service.list_poles(zone.map(ZoneId)).await?)?;
            Ok(false)
        }
        PoleCommand::Create {
            zone,
            name,
            at,
            height,
            radius,
            land_owner,
        } => {
            let pole = service
                .create_pole(NewPole {
                    pole_name: name,
                    position: at.coordinate()?,
                    pole_height: height,
                    restricted_radius: radius,
                    zone_id: ZoneId(zone),
                    land_owner_id: land_owner.map(LandOwnerId),
                    status: None,
                })
                .await?;
            print_json(&pole)?;
            Ok(true)
        }
        PoleCommand::Update {
            id,
            name,
            lat,
            lng,
            height,
            radius,
            land_owner,
        } => {
            let pole = service
                .update_pole(
                    PoleId(id),
                    PoleUpdate {
                        pole_name: name,
                        latitude: lat,
                        longitude: lng,
                        pole_height: height,
                        restricted_radius: radius,
                        land_owner_id: land_owner.map(LandOwnerId),
                        status: None,
                    },
                )
                .await?;
            print_json(&pole)?;
            Ok(true)
        }
        PoleCommand::Toggle { id } => {
            print_json(&service.toggle_pole_status(PoleId(id)).await?)?;
            Ok(true)
        }
        PoleCommand::Delete { id } => {
            service.delete_pole(PoleId(id)).await?;
            print_json(&serde_json::json!({ "deleted": id }))?;
            Ok(true)
        }
    }
}

/// Reads a boundary as a JSON array of points, falling back to GeoJSON.
fn read_boundary(path: &Path) -> Result<Vec<BoundaryPoint>, Box<dyn std::error::Error>> {
    let input = std::fs::read_to_string(path)?;

    if let Ok(points) = serde_json::from_str::<Vec<BoundaryPoint>>(&input) {
        return Ok(points);
    }

    Ok(boundary_from_geojson(&input)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

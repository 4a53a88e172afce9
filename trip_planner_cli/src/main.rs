use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, bail, Context};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use trip_planner_data_management::{
    default_database_path, LocationResolutionSession, NominatimConfig, NominatimGeocodingClient, SessionConfig,
    SessionEvent, TapOutcome, TripStore,
};
use trip_planner_lib::{
    AnyItem, Coordinate, Item, ItemId, ItemKind, LocationResult, NewTrip, SearchLocation, TripId, TripPatch,
};

/// How long a search may take before the CLI gives up on the provider.
const SEARCH_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Parser)]
#[command(name = "trip")]
#[command(about = "Plan trips and the places you visit on them", long_about = None)]
struct Cli {
    /// SQLite database to use. Defaults to data/trips.db in the project root
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Trips(TripCommands),
    #[command(flatten)]
    Places(PlaceCommands),
}

/// Commands working on the trip database.
#[derive(Subcommand)]
enum TripCommands {
    /// Create a trip. Without coordinates the destination is looked up by name
    CreateTrip {
        name: String,
        start_date: NaiveDate,
        end_date: NaiveDate,
        destination: String,
        #[arg(long, requires = "longitude", allow_hyphen_values = true)]
        latitude: Option<f64>,
        #[arg(long, requires = "latitude", allow_hyphen_values = true)]
        longitude: Option<f64>,
    },
    /// List all trips by start date
    ListTrips,
    /// Show a trip with all of its items
    ShowTrip { trip_id: TripId },
    /// Change the details of a trip
    UpdateTrip {
        trip_id: TripId,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        start_date: Option<NaiveDate>,
        #[arg(long)]
        end_date: Option<NaiveDate>,
        /// New destination, looked up by name
        #[arg(long)]
        destination: Option<String>,
    },
    /// Delete a trip and every item in it. BE CAREFUL
    DeleteTrip { trip_id: TripId },
    /// Add an item to a trip. The item is given as JSON, e.g. {"activity": {...}}
    AddItem {
        trip_id: TripId,
        /// Inline JSON, or @path to read it from a file
        item: String,
    },
    /// List the items of one kind in a trip
    ListItems { trip_id: TripId, kind: ItemKind },
    /// Remove an item from a trip and delete it
    RemoveItem {
        trip_id: TripId,
        kind: ItemKind,
        item_id: ItemId,
    },
}

/// Commands that only talk to the geocoding provider.
#[derive(Subcommand)]
enum PlaceCommands {
    /// Search for places matching a query
    Search { query: String },
    /// Name the place at a coordinate
    Reverse {
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("{}=info,trip_planner_data_management=info", env!("CARGO_CRATE_NAME")).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Places(command) => run_place_command(command).await,
        Commands::Trips(command) => {
            let path = match cli.database {
                Some(path) => path,
                None => default_database_path()?,
            };
            debug!(path = %path.display(), "Opening trip database");
            let store = TripStore::open(&path)
                .await
                .with_context(|| format!("Could not open {}", path.display()))?;

            run_trip_command(&store, command).await
        }
    }
}

async fn run_trip_command(store: &TripStore, command: TripCommands) -> anyhow::Result<()> {
    match command {
        TripCommands::CreateTrip {
            name,
            start_date,
            end_date,
            destination,
            latitude,
            longitude,
        } => {
            let mut new_trip = NewTrip {
                name,
                start_date,
                end_date,
                destination: destination.clone(),
                latitude: latitude.unwrap_or_default(),
                longitude: longitude.unwrap_or_default(),
            };
            if !new_trip.has_valid_dates() {
                bail!("The trip cannot end before it starts");
            }
            if latitude.is_none() {
                new_trip = new_trip.with_destination(resolve_destination(&destination).await?);
            }

            let trip_id = store.create_trip(new_trip).await?;
            println!("{trip_id}");
        }
        TripCommands::ListTrips => {
            for trip in store.list_trips().await? {
                println!(
                    "{}  {}  {} - {}  {}  ({} items)",
                    trip.trip_id,
                    trip.name,
                    trip.start_date,
                    trip.end_date,
                    trip.destination,
                    trip.collections.len()
                );
            }
        }
        TripCommands::ShowTrip { trip_id } => {
            let snapshot = store
                .get_trip(trip_id)
                .await?
                .ok_or_else(|| anyhow!("Trip {trip_id} does not exist"))?;
            let trip = &snapshot.trip;

            println!("{} ({} days)", trip.name, trip.duration_days());
            println!("{} - {}", trip.start_date, trip.end_date);
            println!("{} ({}, {})", trip.destination, trip.latitude, trip.longitude);
            for kind in ItemKind::ALL {
                let items: Vec<_> = snapshot.items.iter().filter(|item| item.kind() == *kind).collect();
                if items.is_empty() {
                    continue;
                }
                println!();
                println!("{}:", kind.label());
                for item in &items {
                    print_item(item);
                }
            }
            println!();
            println!("Total cost: {:.2}", snapshot.total_cost());
        }
        TripCommands::UpdateTrip {
            trip_id,
            name,
            start_date,
            end_date,
            destination,
        } => {
            let mut patch = TripPatch {
                name,
                start_date,
                end_date,
                ..Default::default()
            };
            if let Some(destination) = destination {
                let resolved = resolve_destination(&destination).await?;
                patch.latitude = Some(resolved.latitude);
                patch.longitude = Some(resolved.longitude);
                patch.destination = Some(resolved.display_text);
            }

            let trip = store.update_trip(trip_id, patch).await?;
            if trip.end_date < trip.start_date {
                warn!("{} now ends before it starts", trip.name);
            }
            println!("Updated {}", trip.name);
        }
        TripCommands::DeleteTrip { trip_id } => {
            store.delete_trip(trip_id).await?;
            println!("Deleted {trip_id}");
        }
        TripCommands::AddItem { trip_id, item } => {
            let json = match item.strip_prefix('@') {
                Some(path) => std::fs::read_to_string(path).with_context(|| format!("Could not read {path}"))?,
                None => item,
            };
            let item: AnyItem = serde_json::from_str(&json).context("Invalid item")?;
            let added = add_item(store, item, trip_id).await?;
            println!("{}", added.item_id());
        }
        TripCommands::ListItems { trip_id, kind } => {
            for item in list_items(store, kind, trip_id).await? {
                print_item(&item);
            }
        }
        TripCommands::RemoveItem { trip_id, kind, item_id } => {
            let removed = remove_item(store, kind, item_id, trip_id).await?;
            println!("Removed {}", removed.label());
        }
    }

    Ok(())
}

async fn run_place_command(command: PlaceCommands) -> anyhow::Result<()> {
    let session = location_session()?;

    match command {
        PlaceCommands::Search { query } => {
            for candidate in search(&session, &query).await? {
                print_candidate(&candidate);
            }
        }
        PlaceCommands::Reverse { latitude, longitude } => {
            let coordinate = Coordinate::new(latitude, longitude);
            if !coordinate.is_valid() {
                bail!("{latitude}, {longitude} is not a valid coordinate");
            }
            match session.select_from_map_tap(coordinate).await? {
                TapOutcome::Resolved(result) => println!("{} ({}, {})", result.display_text, result.latitude, result.longitude),
                TapOutcome::Unresolved(_) => println!("Nothing known at {latitude}, {longitude}"),
                TapOutcome::Superseded => {}
            }
        }
    }

    Ok(())
}

fn location_session() -> anyhow::Result<LocationResolutionSession> {
    let geocoder = NominatimGeocodingClient::new(&NominatimConfig::default())?;
    Ok(LocationResolutionSession::new(Arc::new(geocoder), SessionConfig::default()))
}

/// Runs a search through the session and waits for its candidates.
async fn search(session: &LocationResolutionSession, query: &str) -> anyhow::Result<Vec<SearchLocation>> {
    if query.trim().is_empty() {
        bail!("The search query is empty");
    }

    let mut events = session.subscribe();
    session.search(query);

    tokio::time::timeout(SEARCH_TIMEOUT, async {
        loop {
            match events.recv().await {
                Ok(SessionEvent::CandidatesUpdated(candidates)) => return Ok(candidates),
                Ok(SessionEvent::ResolutionFailed(failure)) => return Err(anyhow::Error::new(failure)),
                Ok(SessionEvent::SelectionChanged(_)) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => bail!("The location session closed"),
            }
        }
    })
    .await
    .context("The search timed out")?
}

/// Picks the best match for `destination`.
async fn resolve_destination(destination: &str) -> anyhow::Result<LocationResult> {
    let session = location_session()?;
    let candidates = search(&session, destination).await?;
    let best = candidates
        .first()
        .ok_or_else(|| anyhow!("No place matches \"{destination}\""))?;
    let result = session.select_candidate(best);
    debug!(?result, "Resolved destination");
    Ok(result)
}

async fn add_item(store: &TripStore, item: AnyItem, trip_id: TripId) -> anyhow::Result<AnyItem> {
    let added = match item {
        AnyItem::Accommodation(item) => store.accommodations().add(item, trip_id).await?.into_any(),
        AnyItem::Activity(item) => store.activities().add(item, trip_id).await?.into_any(),
        AnyItem::DiningLocation(item) => store.dining_locations().add(item, trip_id).await?.into_any(),
        AnyItem::Event(item) => store.events().add(item, trip_id).await?.into_any(),
        AnyItem::PointOfInterest(item) => store.points_of_interest().add(item, trip_id).await?.into_any(),
        AnyItem::Transportation(item) => store.transportations().add(item, trip_id).await?.into_any(),
    };
    Ok(added)
}

async fn list_items(store: &TripStore, kind: ItemKind, trip_id: TripId) -> anyhow::Result<Vec<AnyItem>> {
    fn erase<T: Item>(items: Vec<T>) -> Vec<AnyItem> {
        items.into_iter().map(Item::into_any).collect()
    }

    let items = match kind {
        ItemKind::Accommodation => erase(store.accommodations().list_for(trip_id).await?),
        ItemKind::Activity => erase(store.activities().list_for(trip_id).await?),
        ItemKind::DiningLocation => erase(store.dining_locations().list_for(trip_id).await?),
        ItemKind::Event => erase(store.events().list_for(trip_id).await?),
        ItemKind::PointOfInterest => erase(store.points_of_interest().list_for(trip_id).await?),
        ItemKind::Transportation => erase(store.transportations().list_for(trip_id).await?),
    };
    Ok(items)
}

async fn remove_item(store: &TripStore, kind: ItemKind, item_id: ItemId, trip_id: TripId) -> anyhow::Result<AnyItem> {
    let removed = match kind {
        ItemKind::Accommodation => store.accommodations().remove(item_id, trip_id).await?.into_any(),
        ItemKind::Activity => store.activities().remove(item_id, trip_id).await?.into_any(),
        ItemKind::DiningLocation => store.dining_locations().remove(item_id, trip_id).await?.into_any(),
        ItemKind::Event => store.events().remove(item_id, trip_id).await?.into_any(),
        ItemKind::PointOfInterest => store.points_of_interest().remove(item_id, trip_id).await?.into_any(),
        ItemKind::Transportation => store.transportations().remove(item_id, trip_id).await?.into_any(),
    };
    Ok(removed)
}

fn print_item(item: &AnyItem) {
    let cost = item.cost().map(|cost| format!("  {cost:.2}")).unwrap_or_default();
    println!("  {}  {}  @ {}{}", item.item_id(), item.label(), item.location().address, cost);
}

fn print_candidate(candidate: &SearchLocation) {
    let address = candidate.placemark.address.postal_address();
    println!(
        "{} ({}, {}){}",
        candidate.name,
        candidate.coordinate.latitude,
        candidate.coordinate.longitude,
        if address.is_empty() { String::new() } else { format!("\n    {address}") }
    );
}

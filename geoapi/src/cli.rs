//! Définition et implémentation des commandes CLI
//!
//! Chaque commande écrit son résultat en JSON sur la sortie standard.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use clap::Subcommand;
use futures::stream;
use futures::StreamExt;
use serde::Serialize;
use tracing::{info, warn};

use geoapi::models::{parse_documents, validate_distance, GeometryAndDistance};
use geoapi::store::{create_pool, test_connection, PgPropertyStore};
use geoapi::{ApiError, AppConfig, PropertyDocument};
use geozone::{GeoStatsError, MemoryStore, Property, PropertyStore, ZoneStatisticsEngine};

#[derive(Subcommand)]
pub enum Commands {
    /// Create the PostGIS extension, the properties table and its indexes
    Init {
        /// Drop the table before creating it
        #[arg(long)]
        drop: bool,
    },

    /// Load properties from a JSON file (array or single object)
    Load {
        /// Path to the JSON file
        #[arg(short, long)]
        path: PathBuf,

        /// Maximum number of concurrent inserts
        #[arg(long, alias = "threads")]
        jobs: Option<usize>,
    },

    /// Print one property as GeoJSON
    Get {
        /// Property id
        id: String,
    },

    /// Print all properties
    List,

    /// Find ids of properties within a distance of a geometry
    Find {
        /// GeoJSON Point or Polygon (EPSG:4326)
        #[arg(short, long)]
        geometry: String,

        /// Distance in meters (integer >= 1)
        #[arg(short, long)]
        distance: i64,
    },

    /// Compute zone statistics around a property
    Stats {
        /// Property id
        id: String,

        /// Zone radius in meters (default: statistics.default_distance)
        #[arg(short, long)]
        distance: Option<i64>,

        /// Read properties from a JSON file instead of the database
        #[arg(long)]
        from_file: Option<PathBuf>,
    },
}

/// Exécute une commande
pub async fn run(command: Commands, config: &AppConfig) -> Result<()> {
    match command {
        Commands::Init { drop } => cmd_init(config, drop).await,
        Commands::Load { path, jobs } => cmd_load(config, &path, jobs).await,
        Commands::Get { id } => cmd_get(config, &id).await,
        Commands::List => cmd_list(config).await,
        Commands::Find { geometry, distance } => cmd_find(config, &geometry, distance).await,
        Commands::Stats {
            id,
            distance,
            from_file,
        } => cmd_stats(config, &id, distance, from_file.as_deref()).await,
    }
}

/// Connecte le store PostGIS
async fn connect(config: &AppConfig) -> Result<PgPropertyStore> {
    info!(db = %config.database.target(), ssl = ?config.database.ssl_mode, "Connecting to PostgreSQL");
    let pool = create_pool(&config.database)?;
    test_connection(&pool).await?;
    PgPropertyStore::new(pool, config.database.table.clone())
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

/// Lit et valide un fichier de propriétés
fn read_properties(path: &Path) -> Result<Vec<Property>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read properties file: {}", path.display()))?;
    let documents = parse_documents(&content)
        .with_context(|| format!("Failed to parse properties file: {}", path.display()))?;

    documents
        .into_iter()
        .map(|doc| Property::try_from(doc).map_err(anyhow::Error::from))
        .collect()
}

async fn cmd_init(config: &AppConfig, drop: bool) -> Result<()> {
    let store = connect(config).await?;
    store.create_schema(drop).await?;
    println!("Table {} ready", store.table());
    Ok(())
}

async fn cmd_load(config: &AppConfig, path: &Path, jobs: Option<usize>) -> Result<()> {
    let properties = read_properties(path)?;
    let store = connect(config).await?;

    // Un document isolé : l'erreur est remontée telle quelle
    if let [property] = properties.as_slice() {
        store.insert(property).await?;
        println!("Inserted: {}", property.id);
        return Ok(());
    }

    let jobs = jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });

    println!("=== Load {} ===", path.display());
    println!("Properties: {}", properties.len());
    println!("Table: {}", store.table());
    println!("Jobs: {}", jobs);

    let inserted = AtomicUsize::new(0);
    let duplicates = AtomicUsize::new(0);
    let failed = AtomicUsize::new(0);

    stream::iter(&properties)
        .for_each_concurrent(jobs, |property| {
            let store = &store;
            let (inserted, duplicates, failed) = (&inserted, &duplicates, &failed);
            async move {
                match store.insert(property).await {
                    Ok(()) => {
                        inserted.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(GeoStatsError::DuplicateId(id)) => {
                        warn!(id = %id, "Property already exists, skipped");
                        duplicates.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(e) => {
                        warn!(id = %property.id, error = %e, "Failed to insert property");
                        failed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            }
        })
        .await;

    let failed = failed.into_inner();
    println!("Inserted: {}", inserted.into_inner());
    println!("Duplicates: {}", duplicates.into_inner());
    println!("Failed: {}", failed);

    if failed > 0 {
        anyhow::bail!("{failed} properties could not be inserted");
    }
    Ok(())
}

async fn cmd_get(config: &AppConfig, id: &str) -> Result<()> {
    let store = connect(config).await?;
    let property = store.get(id).await?;
    print_json(&PropertyDocument::from(&property))
}

async fn cmd_list(config: &AppConfig) -> Result<()> {
    let store = connect(config).await?;
    let documents: Vec<PropertyDocument> = store
        .list()
        .await?
        .iter()
        .map(PropertyDocument::from)
        .collect();
    print_json(&documents)
}

async fn cmd_find(config: &AppConfig, geometry: &str, distance: i64) -> Result<()> {
    let location_geo = serde_json::from_str(geometry)
        .map_err(|e| ApiError::from(GeoStatsError::geometry(format!("Invalid GeoJSON: {e}"))))?;
    let (geometry, distance) = GeometryAndDistance {
        location_geo,
        distance,
    }
    .validate()?;

    let store = connect(config).await?;
    let ids = store.find_near(&geometry, distance).await?;
    print_json(&ids)
}

async fn cmd_stats(
    config: &AppConfig,
    id: &str,
    distance: Option<i64>,
    from_file: Option<&Path>,
) -> Result<()> {
    let distance =
        validate_distance(distance.unwrap_or(config.statistics.default_distance))?;

    match from_file {
        Some(path) => {
            let store = MemoryStore::new(read_properties(path)?)?;
            info!(properties = store.len(), "Using properties from file");
            statistics(store, config, id, distance).await
        }
        None => statistics(connect(config).await?, config, id, distance).await,
    }
}

async fn statistics<S: PropertyStore>(
    store: S,
    config: &AppConfig,
    id: &str,
    distance: f64,
) -> Result<()> {
    let engine = ZoneStatisticsEngine::new(store, config.statistics.engine_config());
    let stats = engine.statistics(id, distance).await?;
    print_json(&stats)
}

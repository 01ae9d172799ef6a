//! # geoapi
//!
//! Stockage PostGIS de propriétés géocodées et statistiques de zone.
//!
//! ## Features
//!
//! - Table `properties` en `geography` EPSG:4326 avec index GiST
//! - Pool de connexions, TLS optionnel
//! - Documents GeoJSON en entrée/sortie
//! - Statistiques de zone via `geozone`, en base ou hors ligne
//!
//! ## Usage CLI
//!
//! ```bash
//! # Créer la table
//! geoapi init
//!
//! # Charger des propriétés
//! geoapi load --path ./properties.json
//!
//! # Statistiques dans un rayon de 10 m
//! geoapi stats b2cddf80a32a41daaa34454d4883b903 --distance 10
//!
//! # Sans base de données
//! geoapi stats b2cddf80a32a41daaa34454d4883b903 --from-file ./properties.json
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod store;

pub use config::AppConfig;
pub use error::{ApiError, ErrorBody};
pub use models::PropertyDocument;
pub use store::{create_pool, DatabaseConfig, PgPropertyStore};

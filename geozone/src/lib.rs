//! # geozone
//!
//! Statistiques de zone autour de propriétés géocodées : buffer métrique,
//! aires, distances au centre et densité de bâti.
//!
//! ## Features
//!
//! - Codec GeoJSON limité aux `Point` et `Polygon` (EPSG:4326)
//! - Reprojection WGS84 ↔ Web Mercator sans dépendance externe
//! - Buffer, aires et distances calculés en mètres Web Mercator
//! - Lectures parcelles/bâtiments concurrentes sous délai
//! - Types `geo` pour l'interopérabilité avec l'écosystème Rust géospatial
//!
//! ## Usage
//!
//! ```rust,ignore
//! use geozone::{MemoryStore, StatisticsConfig, ZoneStatisticsEngine};
//!
//! let store = MemoryStore::new(properties)?;
//! let engine = ZoneStatisticsEngine::new(store, StatisticsConfig::default());
//!
//! let stats = engine.statistics("b2cddf80a32a41daaa34454d4883b903", 10.0).await?;
//! println!("Densité: {}%", stats.zone_density);
//! ```

pub mod buffer;
pub mod codec;
pub mod error;
pub mod measure;
pub mod projection;
pub mod stats;
pub mod store;
pub mod types;

pub use error::GeoStatsError;
pub use stats::{zone_density, StatisticsConfig, ZoneStatisticsEngine};
pub use store::{MemoryStore, PropertyStore};
pub use types::{AreaDistance, BoundingBox, Geometry, Property, ZoneStatistics};

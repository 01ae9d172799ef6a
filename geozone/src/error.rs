//! Types d'erreurs pour le crate geozone

use std::time::Duration;

use thiserror::Error;

/// Erreur source d'un store (driver, pool, I/O…)
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Erreurs pouvant survenir lors du calcul des statistiques de zone
#[derive(Debug, Error)]
pub enum GeoStatsError {
    /// Entité absente du store
    #[error("Property not found - id: {0}")]
    NotFound(String),

    /// Recherche ou listing sans aucun résultat
    #[error("No properties found")]
    NoProperties,

    /// Entité présente mais champ géométrique requis à NULL
    #[error("Property missing {field} data - id: {id}")]
    MissingData { id: String, field: &'static str },

    /// Géométrie filaire (GeoJSON) invalide ou non supportée
    #[error("Invalid geometry: {0}")]
    Geometry(String),

    /// Couple de CRS non supporté
    #[error("Unsupported CRS transform: EPSG:{source_epsg} -> EPSG:{target_epsg}")]
    UnsupportedCrs { source_epsg: u32, target_epsg: u32 },

    /// Géométrie obligatoire absente pour l'opération
    #[error("Missing geometry: {0}")]
    MissingGeometry(&'static str),

    /// Échec d'une lecture/écriture du store
    #[error("Store error: {context}")]
    Store {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Délai dépassé pendant les lectures concurrentes
    #[error("Store reads did not complete within {0:?}")]
    Timeout(Duration),

    /// Identifiant déjà présent dans le store
    #[error("Property already exists - id: {0}")]
    DuplicateId(String),
}

impl GeoStatsError {
    /// Crée une erreur de géométrie invalide
    pub fn geometry(reason: impl Into<String>) -> Self {
        Self::Geometry(reason.into())
    }

    /// Crée une erreur de store avec contexte
    pub fn store(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Store {
            context: context.into(),
            source: source.into(),
        }
    }
}

/// Résultat du crate geozone
pub type Result<T, E = GeoStatsError> = std::result::Result<T, E>;

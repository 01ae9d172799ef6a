//! Erreurs exposées à l'appelant et leur code de statut
//!
//! Le corps d'erreur suit la forme `{"status": .., "detail": {"message": ..}}`.

use geozone::GeoStatsError;
use serde::Serialize;
use thiserror::Error;

/// Erreur de frontière : validation des entrées ou erreur du moteur
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Core(#[from] GeoStatsError),

    /// URL d'image qui n'est pas http(s)
    #[error("Invalid image_url: {0}")]
    InvalidUrl(String),

    /// Distance hors domaine (entier ≥ 1 attendu)
    #[error("Invalid distance: {0}, expected an integer >= 1")]
    InvalidDistance(i64),

    /// Document de propriété illisible (JSON invalide, champ manquant…)
    #[error("Invalid property document: {0}")]
    InvalidDocument(String),
}

impl ApiError {
    /// Code de statut HTTP équivalent
    pub fn status(&self) -> u16 {
        match self {
            Self::Core(e) => status_of(e),
            Self::InvalidUrl(_) | Self::InvalidDistance(_) | Self::InvalidDocument(_) => 422,
        }
    }
}

/// Code de statut HTTP d'une erreur du moteur
pub fn status_of(error: &GeoStatsError) -> u16 {
    match error {
        GeoStatsError::NotFound(_) | GeoStatsError::NoProperties => 404,
        GeoStatsError::MissingData { .. } | GeoStatsError::Geometry(_) => 422,
        GeoStatsError::DuplicateId(_) => 409,
        GeoStatsError::Timeout(_) => 504,
        GeoStatsError::UnsupportedCrs { .. }
        | GeoStatsError::MissingGeometry(_)
        | GeoStatsError::Store { .. } => 500,
    }
}

/// Corps d'une réponse d'erreur
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorBody {
    pub status: u16,
    pub detail: ErrorDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDetail {
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            detail: ErrorDetail {
                message: message.into(),
            },
        }
    }

    /// Construit le corps depuis une erreur quelconque de l'application
    ///
    /// Les erreurs qui ne viennent ni du moteur ni de la validation
    /// (configuration, pool…) donnent 500.
    pub fn from_error(error: &anyhow::Error) -> Self {
        let status = if let Some(api) = error.downcast_ref::<ApiError>() {
            api.status()
        } else if let Some(core) = error.downcast_ref::<GeoStatsError>() {
            status_of(core)
        } else {
            500
        };
        Self::new(status, format!("{error:#}"))
    }
}

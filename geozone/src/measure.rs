//! Aires et distances en mètres Web Mercator
//!
//! Les valeurs sont arrondies à l'entier le plus proche, les demis vers le
//! haut (`f64::round`, les mesures étant positives).

use geo::{Area, Distance, Euclidean, Polygon};

use crate::error::{GeoStatsError, Result};
use crate::projection::Projector;
use crate::types::{AreaDistance, Geometry};

/// Distance renvoyée quand aucune géométrie de référence n'est fournie
pub const NO_DISTANCE: i64 = -1;

/// Arrondi métrique : entier le plus proche, 0.5 → 1
pub fn round_metric(value: f64) -> i64 {
    value.round() as i64
}

/// Aire plane d'un polygone déjà en EPSG:3857 (m²)
pub fn projected_area(polygon: &Polygon) -> i64 {
    round_metric(polygon.unsigned_area())
}

/// Aire d'un polygone EPSG:4326, calculée en EPSG:3857 (m²)
pub fn area(polygon: Option<&Polygon>) -> Result<i64> {
    let polygon = polygon.ok_or(GeoStatsError::MissingGeometry("polygon"))?;
    Ok(projected_area(&Projector::to_metric().transform_polygon(polygon)))
}

/// Aire d'un polygone et distance entre son centroïde et celui de la référence
///
/// Sans référence la distance vaut [`NO_DISTANCE`].
pub fn area_distance(
    polygon: Option<&Polygon>,
    reference: Option<&Geometry>,
) -> Result<AreaDistance> {
    let polygon = polygon.ok_or(GeoStatsError::MissingGeometry("polygon"))?;
    let projector = Projector::to_metric();
    let metric = projector.transform_polygon(polygon);
    let area = projected_area(&metric);

    let Some(reference) = reference else {
        return Ok(AreaDistance {
            area,
            distance: NO_DISTANCE,
        });
    };

    let center = Geometry::Polygon(metric)
        .centroid()
        .ok_or_else(|| GeoStatsError::geometry("empty polygon has no centroid"))?;
    let origin = projector
        .transform_geometry(reference)
        .centroid()
        .ok_or_else(|| GeoStatsError::geometry("empty reference geometry has no centroid"))?;

    Ok(AreaDistance {
        area,
        distance: round_metric(Euclidean.distance(origin, center)),
    })
}

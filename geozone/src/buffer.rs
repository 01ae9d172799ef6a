//! Buffer métrique autour d'une géométrie WGS84
//!
//! La géométrie est projetée en Web Mercator, bufferisée dans le plan
//! (jointures arrondies) puis reprojetée en WGS84.

use geo::{Area, Buffer, MultiPolygon, Polygon};
use tracing::debug;

use crate::error::{GeoStatsError, Result};
use crate::projection::Projector;
use crate::types::Geometry;

/// Buffer de `distance_meters` autour d'une géométrie EPSG:4326
///
/// Retourne `None` si la géométrie est absente, si la distance vaut zéro
/// ou si le résultat est vide (distance négative qui fait disparaître la
/// géométrie). Une distance négative réduit la géométrie.
pub fn buffer(geometry: Option<&Geometry>, distance_meters: f64) -> Result<Option<Polygon>> {
    if !distance_meters.is_finite() {
        return Err(GeoStatsError::geometry(format!(
            "buffer distance must be finite, got {distance_meters}"
        )));
    }

    let Some(geometry) = geometry else {
        return Ok(None);
    };
    if distance_meters == 0.0 {
        return Ok(None);
    }

    let metric = Projector::to_metric().transform_geometry(geometry);
    let buffered = buffer_metric(&metric, distance_meters);

    Ok(buffered.map(|p| Projector::to_geographic().transform_polygon(&p)))
}

/// Buffer plan d'une géométrie déjà en EPSG:3857
pub fn buffer_metric(geometry: &Geometry, distance_meters: f64) -> Option<Polygon> {
    let result = match geometry {
        // Un point n'a pas d'intérieur à réduire
        Geometry::Point(_) if distance_meters < 0.0 => return None,
        Geometry::Point(p) => p.buffer(distance_meters),
        Geometry::Polygon(p) => p.buffer(distance_meters),
    };
    largest_part(result)
}

/// Garde la plus grande partie d'un buffer éclaté en plusieurs polygones
fn largest_part(multi: MultiPolygon) -> Option<Polygon> {
    let parts = multi.0.len();
    if parts > 1 {
        debug!(parts, "buffer split into several polygons, keeping the largest");
    }

    multi
        .0
        .into_iter()
        .filter(|p| p.unsigned_area() > 0.0)
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::polygon_from_bbox;
    use geo::{polygon, Contains, Point};
    use std::f64::consts::PI;

    fn geocode() -> Geometry {
        Geometry::Point(Point::new(-73.748751, 40.918548))
    }

    #[test]
    fn test_none_geometry() {
        assert!(buffer(None, 10.0).unwrap().is_none());
    }

    #[test]
    fn test_zero_distance_is_none() {
        assert!(buffer(Some(&geocode()), 0.0).unwrap().is_none());
    }

    #[test]
    fn test_non_finite_distance() {
        assert!(buffer(Some(&geocode()), f64::NAN).is_err());
        assert!(buffer(Some(&geocode()), f64::INFINITY).is_err());
    }

    #[test]
    fn test_point_buffer_is_circle_in_mercator() {
        let zone = buffer(Some(&geocode()), 10.0).unwrap().unwrap();
        let metric = Projector::to_metric().transform_polygon(&zone);

        // Cercle de rayon 10 m approximé par des segments
        let area = metric.unsigned_area();
        assert!(area > 0.97 * PI * 100.0 && area < 1.001 * PI * 100.0, "area={area}");
        assert!(zone.contains(geocode().as_point().unwrap()));
    }

    #[test]
    fn test_result_is_wgs84() {
        let zone = buffer(Some(&geocode()), 10.0).unwrap().unwrap();
        for c in zone.exterior().coords() {
            assert!((c.x + 73.748751).abs() < 0.001);
            assert!((c.y - 40.918548).abs() < 0.001);
        }
    }

    #[test]
    fn test_polygon_grows() {
        let square = Geometry::Polygon(polygon_from_bbox([2.35, 48.85, 2.351, 48.851]));
        let grown = buffer(Some(&square), 5.0).unwrap().unwrap();

        let before = Projector::to_metric()
            .transform_polygon(square.as_polygon().unwrap())
            .unsigned_area();
        let after = Projector::to_metric().transform_polygon(&grown).unsigned_area();
        assert!(after > before);
    }

    #[test]
    fn test_negative_distance_shrinks() {
        let square = Geometry::Polygon(polygon![
            (x: 0.0, y: 0.0),
            (x: 100.0, y: 0.0),
            (x: 100.0, y: 100.0),
            (x: 0.0, y: 100.0),
            (x: 0.0, y: 0.0),
        ]);
        let shrunk = buffer_metric(&square, -10.0).unwrap();
        assert!((shrunk.unsigned_area() - 6400.0).abs() < 1.0);
    }

    #[test]
    fn test_negative_distance_on_point_is_none() {
        assert!(buffer(Some(&geocode()), -10.0).unwrap().is_none());
    }

    #[test]
    fn test_shrink_to_nothing_is_none() {
        let square = Geometry::Polygon(polygon_from_bbox([2.35, 48.85, 2.35001, 48.85001]));
        assert!(buffer(Some(&square), -1000.0).unwrap().is_none());
    }
}

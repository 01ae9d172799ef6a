//! Conversion GeoJSON ↔ géométries internes, et boîte englobante ↔ polygone
//!
//! Seuls les types GeoJSON `Point` et `Polygon` en EPSG:4326 sont acceptés ;
//! tout autre type est une erreur de géométrie.

use geo::{BoundingRect, Coord, LineString, Point, Polygon};
use geojson::{PolygonType, Position, Value};

use crate::error::{GeoStatsError, Result};
use crate::types::{BoundingBox, Geometry};

/// Décode une géométrie GeoJSON
///
/// `None` en entrée donne `None` en sortie.
pub fn decode(wire: Option<&geojson::Geometry>) -> Result<Option<Geometry>> {
    let Some(wire) = wire else {
        return Ok(None);
    };

    match &wire.value {
        Value::Point(position) => Ok(Some(Geometry::Point(Point(decode_position(position)?)))),
        Value::Polygon(rings) => Ok(Some(Geometry::Polygon(decode_rings(rings)?))),
        other => Err(GeoStatsError::geometry(format!(
            "unsupported geometry type {}, expected Point or Polygon",
            type_name(other)
        ))),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Point(_) => "Point",
        Value::MultiPoint(_) => "MultiPoint",
        Value::LineString(_) => "LineString",
        Value::MultiLineString(_) => "MultiLineString",
        Value::Polygon(_) => "Polygon",
        Value::MultiPolygon(_) => "MultiPolygon",
        Value::GeometryCollection(_) => "GeometryCollection",
    }
}

/// Décode un champ qui doit être un `Point`
pub fn decode_point(wire: Option<&geojson::Geometry>) -> Result<Option<Point>> {
    match decode(wire)? {
        None => Ok(None),
        Some(Geometry::Point(p)) => Ok(Some(p)),
        Some(other) => Err(GeoStatsError::geometry(format!(
            "expected Point, got {}",
            other.kind()
        ))),
    }
}

/// Décode un champ qui doit être un `Polygon`
pub fn decode_polygon(wire: Option<&geojson::Geometry>) -> Result<Option<Polygon>> {
    match decode(wire)? {
        None => Ok(None),
        Some(Geometry::Polygon(p)) => Ok(Some(p)),
        Some(other) => Err(GeoStatsError::geometry(format!(
            "expected Polygon, got {}",
            other.kind()
        ))),
    }
}

/// Encode une géométrie en GeoJSON
pub fn encode(geom: Option<&Geometry>) -> Option<geojson::Geometry> {
    let value = match geom? {
        Geometry::Point(p) => Value::Point(vec![p.x(), p.y()]),
        Geometry::Polygon(p) => Value::Polygon(encode_rings(p)),
    };
    Some(geojson::Geometry::new(value))
}

/// Construit le rectangle `[minX, minY, maxX, maxY]`
///
/// Anneau fermé : (minX,minY), (maxX,minY), (maxX,maxY), (minX,maxY).
pub fn polygon_from_bbox(bbox: BoundingBox) -> Polygon {
    let [min_x, min_y, max_x, max_y] = bbox;
    Polygon::new(
        LineString::from(vec![
            (min_x, min_y),
            (max_x, min_y),
            (max_x, max_y),
            (min_x, max_y),
            (min_x, min_y),
        ]),
        vec![],
    )
}

/// Rectangle englobant d'un polygone (perte d'information si non rectangulaire)
pub fn bbox_from_polygon(polygon: &Polygon) -> Result<BoundingBox> {
    let rect = polygon
        .bounding_rect()
        .ok_or_else(|| GeoStatsError::geometry("empty polygon has no bounding box"))?;
    Ok([rect.min().x, rect.min().y, rect.max().x, rect.max().y])
}

fn decode_position(position: &Position) -> Result<Coord> {
    let (x, y) = match position.as_slice() {
        [x, y, ..] => (*x, *y),
        _ => {
            return Err(GeoStatsError::geometry(format!(
                "position needs at least 2 numbers, got {}",
                position.len()
            )))
        }
    };

    if !x.is_finite() || !y.is_finite() {
        return Err(GeoStatsError::geometry("non-finite coordinate"));
    }
    if !(-180.0..=180.0).contains(&x) {
        return Err(GeoStatsError::geometry(format!("longitude {x} out of range")));
    }
    if !(-90.0..=90.0).contains(&y) {
        return Err(GeoStatsError::geometry(format!("latitude {y} out of range")));
    }

    Ok(Coord { x, y })
}

fn decode_ring(ring: &[Position]) -> Result<LineString> {
    if ring.len() < 4 {
        return Err(GeoStatsError::geometry(format!(
            "linear ring needs at least 4 positions, got {}",
            ring.len()
        )));
    }

    let coords = ring
        .iter()
        .map(decode_position)
        .collect::<Result<Vec<_>>>()?;

    if coords.first() != coords.last() {
        return Err(GeoStatsError::geometry("linear ring is not closed"));
    }

    Ok(LineString::new(coords))
}

fn decode_rings(rings: &PolygonType) -> Result<Polygon> {
    let (exterior, interiors) = rings
        .split_first()
        .ok_or_else(|| GeoStatsError::geometry("polygon has no rings"))?;

    let exterior = decode_ring(exterior)?;
    let interiors = interiors
        .iter()
        .map(|ring| decode_ring(ring))
        .collect::<Result<Vec<_>>>()?;

    Ok(Polygon::new(exterior, interiors))
}

fn encode_ring(ring: &LineString) -> Vec<Position> {
    ring.coords().map(|c| vec![c.x, c.y]).collect()
}

fn encode_rings(polygon: &Polygon) -> PolygonType {
    std::iter::once(polygon.exterior())
        .chain(polygon.interiors())
        .map(encode_ring)
        .collect()
}

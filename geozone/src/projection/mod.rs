//! Reprojection entre WGS84 (EPSG:4326) et Web Mercator (EPSG:3857)
//!
//! Les calculs métriques (buffer, aire, distance) se font en EPSG:3857 ;
//! toute géométrie exposée reste en EPSG:4326. Seuls les deux sens
//! 4326 → 3857 et 3857 → 4326 sont supportés.

pub mod mercator;

use geo::{Coord, LineString, Point, Polygon};

use crate::error::{GeoStatsError, Result};
use crate::types::Geometry;

/// Système de coordonnées supporté
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Crs {
    /// WGS84 géographique, degrés (lon, lat)
    Wgs84,
    /// Web Mercator, mètres
    WebMercator,
}

impl Crs {
    /// Code EPSG du système
    pub fn epsg(self) -> u32 {
        match self {
            Self::Wgs84 => 4326,
            Self::WebMercator => 3857,
        }
    }

    /// Retrouve un système depuis son code EPSG
    pub fn from_epsg(epsg: u32) -> Option<Self> {
        match epsg {
            4326 => Some(Self::Wgs84),
            3857 => Some(Self::WebMercator),
            _ => None,
        }
    }
}

/// Sens de transformation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Inverse,
}

/// Reprojection entre deux EPSG
///
/// Sans état : un `Projector` peut être partagé librement entre threads.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    direction: Direction,
}

impl Projector {
    /// Crée un reprojector pour un couple d'EPSG
    ///
    /// Toute autre paire que 4326 → 3857 ou 3857 → 4326 (identité comprise)
    /// est refusée.
    pub fn new(source_epsg: u32, target_epsg: u32) -> Result<Self> {
        let unsupported = || GeoStatsError::UnsupportedCrs {
            source_epsg,
            target_epsg,
        };
        let source = Crs::from_epsg(source_epsg).ok_or_else(unsupported)?;
        let target = Crs::from_epsg(target_epsg).ok_or_else(unsupported)?;

        let direction = match (source, target) {
            (Crs::Wgs84, Crs::WebMercator) => Direction::Forward,
            (Crs::WebMercator, Crs::Wgs84) => Direction::Inverse,
            _ => return Err(unsupported()),
        };

        Ok(Self { direction })
    }

    /// 4326 → 3857
    pub fn to_metric() -> Self {
        Self {
            direction: Direction::Forward,
        }
    }

    /// 3857 → 4326
    pub fn to_geographic() -> Self {
        Self {
            direction: Direction::Inverse,
        }
    }

    /// Retourne le SRID source
    pub fn source_epsg(&self) -> u32 {
        match self.direction {
            Direction::Forward => Crs::Wgs84.epsg(),
            Direction::Inverse => Crs::WebMercator.epsg(),
        }
    }

    /// Retourne le SRID cible
    pub fn target_epsg(&self) -> u32 {
        match self.direction {
            Direction::Forward => Crs::WebMercator.epsg(),
            Direction::Inverse => Crs::Wgs84.epsg(),
        }
    }

    /// Transforme une coordonnée unique
    pub fn transform_coord(&self, c: Coord) -> Coord {
        match self.direction {
            Direction::Forward => mercator::forward(c),
            Direction::Inverse => mercator::inverse(c),
        }
    }

    pub fn transform_point(&self, p: &Point) -> Point {
        Point(self.transform_coord(p.0))
    }

    /// Transforme une LineString en conservant le nombre et l'ordre des sommets
    fn transform_linestring(&self, ls: &LineString) -> LineString {
        LineString::new(ls.0.iter().map(|c| self.transform_coord(*c)).collect())
    }

    /// Transforme un Polygon
    pub fn transform_polygon(&self, p: &Polygon) -> Polygon {
        let exterior = self.transform_linestring(p.exterior());
        let interiors = p
            .interiors()
            .iter()
            .map(|ls| self.transform_linestring(ls))
            .collect();
        Polygon::new(exterior, interiors)
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &Geometry) -> Geometry {
        match geom {
            Geometry::Point(p) => Geometry::Point(self.transform_point(p)),
            Geometry::Polygon(p) => Geometry::Polygon(self.transform_polygon(p)),
        }
    }
}

/// Reprojette une géométrie d'un EPSG vers un autre
pub fn project(geom: &Geometry, source_epsg: u32, target_epsg: u32) -> Result<Geometry> {
    Ok(Projector::new(source_epsg, target_epsg)?.transform_geometry(geom))
}

//! Types de données pour le crate geozone

use geo::{Centroid, Point, Polygon};
use serde::{Deserialize, Serialize};

/// Boîte englobante `[minX, minY, maxX, maxY]` en degrés (EPSG:4326)
pub type BoundingBox = [f64; 4];

/// Géométrie simple manipulée par le moteur
///
/// Seuls les points et les polygones simples sont supportés. Aux frontières du
/// système les coordonnées sont toujours en EPSG:4326 (lon, lat).
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Point),
    Polygon(Polygon),
}

impl Geometry {
    /// Nom GeoJSON du type de géométrie
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::Polygon(_) => "Polygon",
        }
    }

    /// Centroïde (le point lui-même pour un `Point`)
    ///
    /// `None` pour un polygone vide.
    pub fn centroid(&self) -> Option<Point> {
        match self {
            Self::Point(p) => Some(*p),
            Self::Polygon(p) => p.centroid(),
        }
    }

    pub fn as_point(&self) -> Option<&Point> {
        match self {
            Self::Point(p) => Some(p),
            Self::Polygon(_) => None,
        }
    }

    pub fn as_polygon(&self) -> Option<&Polygon> {
        match self {
            Self::Point(_) => None,
            Self::Polygon(p) => Some(p),
        }
    }
}

impl From<Point> for Geometry {
    fn from(p: Point) -> Self {
        Self::Point(p)
    }
}

impl From<Polygon> for Geometry {
    fn from(p: Polygon) -> Self {
        Self::Polygon(p)
    }
}

impl From<Geometry> for geo::Geometry {
    fn from(geom: Geometry) -> Self {
        match geom {
            Geometry::Point(p) => geo::Geometry::Point(p),
            Geometry::Polygon(p) => geo::Geometry::Polygon(p),
        }
    }
}

/// Une propriété telle que stockée
///
/// Chaque champ géométrique est indépendamment optionnel.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    /// Identifiant unique (opaque)
    pub id: String,

    /// Localisation de la propriété
    pub geocode: Option<Point>,

    /// Emprise de la parcelle
    pub parcel: Option<Polygon>,

    /// Emprise du bâtiment
    pub building: Option<Polygon>,

    /// Emprise de l'image
    pub image_bounds: Option<BoundingBox>,

    /// URL de l'image
    pub image_url: Option<String>,
}

impl Property {
    /// Crée une propriété sans aucune donnée géographique
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            geocode: None,
            parcel: None,
            building: None,
            image_bounds: None,
            image_url: None,
        }
    }
}

/// Aire (m²) et distance au centre de zone (m) d'un bâtiment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AreaDistance {
    pub area: i64,

    /// `-1` quand aucune géométrie de référence n'a été fournie
    pub distance: i64,
}

/// Statistiques d'une zone autour d'une propriété
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ZoneStatistics {
    /// Somme des aires des parcelles intersectant la zone (m²)
    pub parcel_area: i64,

    /// Aire et distance de chaque bâtiment intersectant la zone, dans l'ordre du store
    pub buildings_area_distance: Vec<AreaDistance>,

    /// Aire de la zone (m²)
    pub zone_area: i64,

    /// Pourcentage de la zone couvert par les bâtiments, dans [0, 100]
    pub zone_density: f64,
}

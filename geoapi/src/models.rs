//! Objets d'échange JSON (entrée/sortie de la CLI)

use std::sync::OnceLock;

use geozone::codec::{
    bbox_from_polygon, decode, decode_point, decode_polygon, encode, polygon_from_bbox,
};
use geozone::{GeoStatsError, Geometry, Property};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;

/// Propriété au format GeoJSON
///
/// `image_bounds` est un `Polygon` GeoJSON ; seule sa boîte englobante est
/// conservée.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDocument {
    pub id: String,
    #[serde(default)]
    pub geocode_geo: Option<geojson::Geometry>,
    #[serde(default)]
    pub parcel_geo: Option<geojson::Geometry>,
    #[serde(default)]
    pub building_geo: Option<geojson::Geometry>,
    #[serde(default)]
    pub image_bounds: Option<geojson::Geometry>,
    #[serde(default)]
    pub image_url: Option<String>,
}

fn url_regex() -> Option<&'static Regex> {
    static URL: OnceLock<Option<Regex>> = OnceLock::new();
    URL.get_or_init(|| Regex::new(r"^https?://[^\s/?#]+[^\s]*$").ok())
        .as_ref()
}

/// Vérifie qu'une URL d'image est en http(s)
pub fn validate_image_url(url: &str) -> Result<(), ApiError> {
    if url_regex().is_some_and(|re| re.is_match(url)) {
        Ok(())
    } else {
        Err(ApiError::InvalidUrl(url.to_string()))
    }
}

impl TryFrom<PropertyDocument> for Property {
    type Error = ApiError;

    fn try_from(doc: PropertyDocument) -> Result<Self, Self::Error> {
        if let Some(url) = &doc.image_url {
            validate_image_url(url)?;
        }

        let image_bounds = decode_polygon(doc.image_bounds.as_ref())?
            .map(|p| bbox_from_polygon(&p))
            .transpose()?;

        Ok(Property {
            id: doc.id,
            geocode: decode_point(doc.geocode_geo.as_ref())?,
            parcel: decode_polygon(doc.parcel_geo.as_ref())?,
            building: decode_polygon(doc.building_geo.as_ref())?,
            image_bounds,
            image_url: doc.image_url,
        })
    }
}

impl From<&Property> for PropertyDocument {
    fn from(property: &Property) -> Self {
        let geometry = |g: Option<Geometry>| encode(g.as_ref());
        Self {
            id: property.id.clone(),
            geocode_geo: geometry(property.geocode.map(Geometry::Point)),
            parcel_geo: geometry(property.parcel.clone().map(Geometry::Polygon)),
            building_geo: geometry(property.building.clone().map(Geometry::Polygon)),
            image_bounds: geometry(
                property
                    .image_bounds
                    .map(|b| Geometry::Polygon(polygon_from_bbox(b))),
            ),
            image_url: property.image_url.clone(),
        }
    }
}

/// Champs géométriques d'un document
const GEOMETRY_FIELDS: [&str; 4] = ["geocode_geo", "parcel_geo", "building_geo", "image_bounds"];

/// Lit un fichier de propriétés : tableau JSON ou objet unique
///
/// Une géométrie que `geojson` refuse donne une erreur de géométrie qui
/// nomme le champ fautif.
pub fn parse_documents(json: &str) -> Result<Vec<PropertyDocument>, ApiError> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| ApiError::InvalidDocument(format!("invalid JSON: {e}")))?;

    match &value {
        serde_json::Value::Array(items) => items.iter().map(parse_document).collect(),
        item => Ok(vec![parse_document(item)?]),
    }
}

fn parse_document(value: &serde_json::Value) -> Result<PropertyDocument, ApiError> {
    let error = match PropertyDocument::deserialize(value) {
        Ok(doc) => return Ok(doc),
        Err(e) => e,
    };

    let id = value
        .get("id")
        .and_then(serde_json::Value::as_str)
        .unwrap_or("?");
    for field in GEOMETRY_FIELDS {
        if let Some(geometry) = value.get(field) {
            if let Err(e) = Option::<geojson::Geometry>::deserialize(geometry) {
                let reason = format!("{field} of property {id}: {e}");
                return Err(GeoStatsError::geometry(reason).into());
            }
        }
    }
    Err(ApiError::InvalidDocument(format!("property {id}: {error}")))
}

/// Géométrie de recherche et distance en mètres
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct GeometryAndDistance {
    pub location_geo: geojson::Geometry,
    pub distance: i64,
}

impl GeometryAndDistance {
    /// Décode la géométrie et valide la distance
    pub fn validate(&self) -> Result<(Geometry, f64), ApiError> {
        let distance = validate_distance(self.distance)?;
        let geometry = decode(Some(&self.location_geo))?
            .ok_or(GeoStatsError::MissingGeometry("location_geo"))?;
        Ok((geometry, distance))
    }
}

/// Distance de recherche : entier ≥ 1
pub fn validate_distance(distance: i64) -> Result<f64, ApiError> {
    if distance < 1 {
        return Err(ApiError::InvalidDistance(distance));
    }
    Ok(distance as f64)
}

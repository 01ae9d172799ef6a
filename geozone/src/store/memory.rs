//! Store en mémoire
//!
//! Mêmes sémantiques que le store PostGIS : intersection au sens large
//! (contact compris), aire géodésique des parcelles, ordre d'insertion.

use std::collections::HashMap;

use geo::{GeodesicArea, Intersects, Point, Polygon};
use tracing::debug;

use super::PropertyStore;
use crate::error::{GeoStatsError, Result};
use crate::types::Property;

/// Propriétés conservées dans un `Vec`, dans l'ordre d'insertion
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    properties: Vec<Property>,
    /// id -> position dans `properties`
    index: HashMap<String, usize>,
}

impl MemoryStore {
    /// Crée un store à partir de propriétés
    ///
    /// Un identifiant en double est une erreur.
    pub fn new(properties: impl IntoIterator<Item = Property>) -> Result<Self> {
        let mut store = Self::default();
        for property in properties {
            store.insert(property)?;
        }
        Ok(store)
    }

    /// Ajoute une propriété
    pub fn insert(&mut self, property: Property) -> Result<()> {
        if self.index.contains_key(&property.id) {
            return Err(GeoStatsError::DuplicateId(property.id));
        }
        self.index.insert(property.id.clone(), self.properties.len());
        self.properties.push(property);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Property> {
        self.index.get(id).and_then(|&i| self.properties.get(i))
    }

    pub fn properties(&self) -> &[Property] {
        &self.properties
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }
}

impl PropertyStore for MemoryStore {
    async fn get_geocode(&self, id: &str) -> Result<Option<Point>> {
        self.get(id)
            .map(|p| p.geocode)
            .ok_or_else(|| GeoStatsError::NotFound(id.to_string()))
    }

    async fn sum_intersecting_parcel_area(&self, zone: &Polygon) -> Result<Option<f64>> {
        let areas: Vec<f64> = self
            .properties
            .iter()
            .filter_map(|p| p.parcel.as_ref())
            .filter(|parcel| parcel.intersects(zone))
            .map(|parcel| parcel.geodesic_area_unsigned())
            .collect();

        debug!(parcels = areas.len(), "parcels intersecting zone");
        if areas.is_empty() {
            return Ok(None);
        }
        Ok(Some(areas.iter().sum()))
    }

    async fn find_intersecting_buildings(&self, zone: &Polygon) -> Result<Vec<Polygon>> {
        let buildings: Vec<Polygon> = self
            .properties
            .iter()
            .filter_map(|p| p.building.as_ref())
            .filter(|building| building.intersects(zone))
            .cloned()
            .collect();

        debug!(buildings = buildings.len(), "buildings intersecting zone");
        Ok(buildings)
    }
}

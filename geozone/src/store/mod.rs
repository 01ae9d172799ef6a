//! Accès en lecture aux propriétés
//!
//! Le moteur de statistiques ne dépend que de ce trait ; l'implémentation
//! PostGIS vit dans l'application, [`MemoryStore`] sert hors ligne et en test.

mod memory;

pub use memory::MemoryStore;

use std::future::Future;
use std::sync::Arc;

use geo::{Point, Polygon};

use crate::error::Result;

/// Lectures nécessaires au calcul des statistiques de zone
///
/// Les trois lectures sont indépendantes et peuvent être lancées
/// simultanément.
pub trait PropertyStore: Send + Sync {
    /// Géocode d'une propriété
    ///
    /// `Err(NotFound)` si l'identifiant est inconnu, `Ok(None)` si la
    /// propriété existe sans géocode.
    fn get_geocode(&self, id: &str) -> impl Future<Output = Result<Option<Point>>> + Send;

    /// Somme des aires (m², géodésiques) des parcelles qui intersectent la zone
    ///
    /// `None` quand aucune parcelle n'intersecte.
    fn sum_intersecting_parcel_area(
        &self,
        zone: &Polygon,
    ) -> impl Future<Output = Result<Option<f64>>> + Send;

    /// Bâtiments qui intersectent la zone, dans l'ordre du store
    fn find_intersecting_buildings(
        &self,
        zone: &Polygon,
    ) -> impl Future<Output = Result<Vec<Polygon>>> + Send;
}

impl<S: PropertyStore> PropertyStore for Arc<S> {
    fn get_geocode(&self, id: &str) -> impl Future<Output = Result<Option<Point>>> + Send {
        (**self).get_geocode(id)
    }

    fn sum_intersecting_parcel_area(
        &self,
        zone: &Polygon,
    ) -> impl Future<Output = Result<Option<f64>>> + Send {
        (**self).sum_intersecting_parcel_area(zone)
    }

    fn find_intersecting_buildings(
        &self,
        zone: &Polygon,
    ) -> impl Future<Output = Result<Vec<Polygon>>> + Send {
        (**self).find_intersecting_buildings(zone)
    }
}

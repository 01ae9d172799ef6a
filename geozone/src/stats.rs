//! Statistiques de zone autour d'une propriété
//!
//! Pipeline : géocode → buffer → aire de zone → lectures concurrentes
//! (parcelles, bâtiments) → aire/distance par bâtiment → densité.

use std::time::{Duration, Instant};

use tracing::{debug, info, info_span, Instrument};

use crate::buffer::buffer;
use crate::error::{GeoStatsError, Result};
use crate::measure::{area, area_distance, round_metric};
use crate::store::PropertyStore;
use crate::types::{Geometry, ZoneStatistics};

/// Délai par défaut des lectures concurrentes
pub const DEFAULT_FANOUT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration du moteur, figée à la construction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatisticsConfig {
    /// Délai maximal pour la paire de lectures parcelles/bâtiments
    pub fanout_timeout: Duration,

    /// Trace la durée de chaque calcul au niveau INFO
    pub timing: bool,
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            fanout_timeout: DEFAULT_FANOUT_TIMEOUT,
            timing: false,
        }
    }
}

/// Moteur de statistiques de zone
#[derive(Debug, Clone)]
pub struct ZoneStatisticsEngine<S> {
    store: S,
    config: StatisticsConfig,
}

impl<S: PropertyStore> ZoneStatisticsEngine<S> {
    pub fn new(store: S, config: StatisticsConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &StatisticsConfig {
        &self.config
    }

    /// Calcule les statistiques de la zone de `distance_meters` autour du
    /// géocode de la propriété `property_id`
    ///
    /// La distance n'est pas validée ici (c'est le rôle de l'appelant) ;
    /// une zone vide est une erreur `MissingGeometry`.
    pub async fn statistics(
        &self,
        property_id: &str,
        distance_meters: f64,
    ) -> Result<ZoneStatistics> {
        if !self.config.timing {
            return self.compute(property_id, distance_meters).await;
        }

        let span = info_span!("zone_statistics", id = property_id, distance = distance_meters);
        async {
            let start = Instant::now();
            let result = self.compute(property_id, distance_meters).await;
            info!(
                elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
                ok = result.is_ok(),
                "zone statistics computed"
            );
            result
        }
        .instrument(span)
        .await
    }

    async fn compute(&self, property_id: &str, distance_meters: f64) -> Result<ZoneStatistics> {
        let geocode = self
            .store
            .get_geocode(property_id)
            .await?
            .ok_or_else(|| GeoStatsError::MissingData {
                id: property_id.to_string(),
                field: "geocode_geo",
            })?;
        let center = Geometry::Point(geocode);

        let zone = buffer(Some(&center), distance_meters)?
            .ok_or(GeoStatsError::MissingGeometry("zone"))?;
        let zone_area = area(Some(&zone))?;
        debug!(zone_area, "zone built");

        let deadline = self.config.fanout_timeout;
        let (parcel_sum, buildings) = tokio::time::timeout(deadline, async {
            tokio::try_join!(
                self.store.sum_intersecting_parcel_area(&zone),
                self.store.find_intersecting_buildings(&zone),
            )
        })
        .await
        .map_err(|_| GeoStatsError::Timeout(deadline))??;

        let buildings_area_distance = buildings
            .iter()
            .map(|b| area_distance(Some(b), Some(&center)))
            .collect::<Result<Vec<_>>>()?;
        let building_area: i64 = buildings_area_distance.iter().map(|ad| ad.area).sum();

        debug!(
            buildings = buildings_area_distance.len(),
            building_area, "buildings measured"
        );

        Ok(ZoneStatistics {
            parcel_area: round_metric(parcel_sum.unwrap_or(0.0)),
            buildings_area_distance,
            zone_area,
            zone_density: zone_density(building_area, zone_area),
        })
    }
}

/// Pourcentage de la zone couvert par les bâtiments
///
/// Arrondi à 2 décimales puis plafonné à 100 ; une zone d'aire nulle donne 0.
pub fn zone_density(building_area: i64, zone_area: i64) -> f64 {
    if zone_area <= 0 {
        return 0.0;
    }
    let percent = 100.0 * building_area as f64 / zone_area as f64;
    ((percent * 100.0).round() / 100.0).min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_density_rounding() {
        assert_eq!(zone_density(50, 313), 15.97);
        assert_eq!(zone_density(1, 3), 33.33);
        assert_eq!(zone_density(2, 3), 66.67);
        assert_eq!(zone_density(0, 313), 0.0);
    }

    #[test]
    fn test_density_is_clamped() {
        assert_eq!(zone_density(150, 100), 100.0);
        assert_eq!(zone_density(100, 100), 100.0);
    }

    #[test]
    fn test_density_zero_zone() {
        assert_eq!(zone_density(10, 0), 0.0);
        assert_eq!(zone_density(0, 0), 0.0);
    }

    #[test]
    fn test_default_config() {
        let config = StatisticsConfig::default();
        assert_eq!(config.fanout_timeout, Duration::from_secs(10));
        assert!(!config.timing);
    }
}

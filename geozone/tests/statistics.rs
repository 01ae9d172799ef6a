//! Tests du moteur de statistiques avec un store scripté

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use geo::{Coord, Point, Polygon};
use geozone::codec::polygon_from_bbox;
use geozone::error::Result;
use geozone::projection::Projector;
use geozone::{
    zone_density, AreaDistance, GeoStatsError, PropertyStore, StatisticsConfig,
    ZoneStatisticsEngine,
};

const ID: &str = "b2cddf80a32a41daaa34454d4883b903";

fn geocode() -> Point {
    Point::new(-73.748751, 40.918548)
}

/// Rectangle 10 x 5 m centré 5 m à l'est du géocode
fn building() -> Polygon {
    let origin = Projector::to_metric().transform_point(&geocode()).0;
    let center = Coord {
        x: origin.x + 5.0,
        y: origin.y,
    };
    let rect = polygon_from_bbox([center.x - 5.0, center.y - 2.5, center.x + 5.0, center.y + 2.5]);
    Projector::to_geographic().transform_polygon(&rect)
}

/// Store aux réponses, délais et échecs fixés à l'avance
#[derive(Default)]
struct ScriptedStore {
    geocode: Option<Point>,
    known: bool,
    parcel_sum: Option<f64>,
    buildings: Vec<Polygon>,
    parcel_delay: Duration,
    building_delay: Duration,
    fail_parcels: bool,
    buildings_done: AtomicBool,
    calls: AtomicUsize,
}

impl ScriptedStore {
    fn sample() -> Self {
        Self {
            geocode: Some(geocode()),
            known: true,
            parcel_sum: Some(500.0),
            buildings: vec![building()],
            ..Default::default()
        }
    }
}

impl PropertyStore for ScriptedStore {
    async fn get_geocode(&self, id: &str) -> Result<Option<Point>> {
        if !self.known {
            return Err(GeoStatsError::NotFound(id.to_string()));
        }
        Ok(self.geocode)
    }

    async fn sum_intersecting_parcel_area(&self, _zone: &Polygon) -> Result<Option<f64>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.parcel_delay).await;
        if self.fail_parcels {
            return Err(GeoStatsError::store(
                "parcel query failed",
                std::io::Error::other("connection reset"),
            ));
        }
        Ok(self.parcel_sum)
    }

    async fn find_intersecting_buildings(&self, _zone: &Polygon) -> Result<Vec<Polygon>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.building_delay).await;
        self.buildings_done.store(true, Ordering::SeqCst);
        Ok(self.buildings.clone())
    }
}

fn engine(store: ScriptedStore) -> ZoneStatisticsEngine<Arc<ScriptedStore>> {
    ZoneStatisticsEngine::new(Arc::new(store), StatisticsConfig::default())
}

#[tokio::test]
async fn test_statistics_scenario() {
    let engine = engine(ScriptedStore::sample());
    let stats = engine.statistics(ID, 10.0).await.unwrap();

    assert_eq!(stats.parcel_area, 500);
    assert_eq!(
        stats.buildings_area_distance,
        vec![AreaDistance {
            area: 50,
            distance: 5
        }]
    );
    // Cercle de 10 m : π·100 ≈ 314 m², un peu moins une fois polygonisé
    assert!(
        (300..=315).contains(&stats.zone_area),
        "zone_area={}",
        stats.zone_area
    );
    assert_eq!(stats.zone_density, zone_density(50, stats.zone_area));
    assert!(stats.zone_density > 15.0 && stats.zone_density < 17.0);
}

#[tokio::test]
async fn test_statistics_body_shape() {
    let engine = engine(ScriptedStore::sample());
    let stats = engine.statistics(ID, 10.0).await.unwrap();

    let body = serde_json::to_value(&stats).unwrap();
    assert_eq!(body["parcel_area"], 500);
    assert_eq!(body["buildings_area_distance"][0]["area"], 50);
    assert_eq!(body["buildings_area_distance"][0]["distance"], 5);
    assert!(body["zone_area"].is_i64());
    assert!(body["zone_density"].is_f64());
}

#[tokio::test]
async fn test_unknown_property() {
    let engine = engine(ScriptedStore::default());
    let err = engine.statistics("nope", 10.0).await.unwrap_err();
    assert!(matches!(err, GeoStatsError::NotFound(id) if id == "nope"));
}

#[tokio::test]
async fn test_property_without_geocode() {
    let engine = engine(ScriptedStore {
        known: true,
        ..Default::default()
    });
    let err = engine.statistics(ID, 10.0).await.unwrap_err();
    assert!(matches!(
        err,
        GeoStatsError::MissingData { ref id, field: "geocode_geo" } if id == ID
    ));
    assert_eq!(engine.store().calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_distance_has_no_zone() {
    let engine = engine(ScriptedStore::sample());
    let err = engine.statistics(ID, 0.0).await.unwrap_err();
    assert!(matches!(err, GeoStatsError::MissingGeometry("zone")));
}

#[tokio::test]
async fn test_empty_zone_contents() {
    let engine = engine(ScriptedStore {
        parcel_sum: None,
        buildings: vec![],
        ..ScriptedStore::sample()
    });
    let stats = engine.statistics(ID, 10.0).await.unwrap();

    assert_eq!(stats.parcel_area, 0);
    assert!(stats.buildings_area_distance.is_empty());
    assert_eq!(stats.zone_density, 0.0);
    assert!(stats.zone_area > 0);
}

#[tokio::test]
async fn test_density_is_clamped() {
    // Bâtiment 40 x 40 m couvrant toute la zone de 10 m
    let origin = Projector::to_metric().transform_point(&geocode()).0;
    let big = Projector::to_geographic().transform_polygon(&polygon_from_bbox([
        origin.x - 20.0,
        origin.y - 20.0,
        origin.x + 20.0,
        origin.y + 20.0,
    ]));

    let engine = engine(ScriptedStore {
        buildings: vec![big],
        ..ScriptedStore::sample()
    });
    let stats = engine.statistics(ID, 10.0).await.unwrap();

    assert_eq!(stats.buildings_area_distance[0].area, 1600);
    assert_eq!(stats.buildings_area_distance[0].distance, 0);
    assert_eq!(stats.zone_density, 100.0);
}

#[tokio::test]
async fn test_buildings_keep_store_order() {
    let far = {
        let origin = Projector::to_metric().transform_point(&geocode()).0;
        Projector::to_geographic().transform_polygon(&polygon_from_bbox([
            origin.x - 1.0,
            origin.y + 7.0,
            origin.x + 1.0,
            origin.y + 9.0,
        ]))
    };
    let engine = engine(ScriptedStore {
        buildings: vec![far, building()],
        ..ScriptedStore::sample()
    });
    let stats = engine.statistics(ID, 10.0).await.unwrap();

    assert_eq!(
        stats.buildings_area_distance,
        vec![
            AreaDistance {
                area: 4,
                distance: 8
            },
            AreaDistance {
                area: 50,
                distance: 5
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_reads_run_concurrently() {
    let engine = engine(ScriptedStore {
        parcel_delay: Duration::from_millis(100),
        building_delay: Duration::from_millis(100),
        ..ScriptedStore::sample()
    });

    let start = tokio::time::Instant::now();
    engine.statistics(ID, 10.0).await.unwrap();
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(100), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(150), "{elapsed:?}");
    assert_eq!(engine.store().calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn test_fanout_timeout() {
    let store = ScriptedStore {
        building_delay: Duration::from_secs(30),
        ..ScriptedStore::sample()
    };
    let engine = ZoneStatisticsEngine::new(
        store,
        StatisticsConfig {
            fanout_timeout: Duration::from_secs(2),
            timing: false,
        },
    );

    let err = engine.statistics(ID, 10.0).await.unwrap_err();
    assert!(matches!(err, GeoStatsError::Timeout(d) if d == Duration::from_secs(2)));
    assert!(!engine.store().buildings_done.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_failure_cancels_sibling_read() {
    let engine = engine(ScriptedStore {
        parcel_delay: Duration::from_millis(10),
        building_delay: Duration::from_secs(5),
        fail_parcels: true,
        ..ScriptedStore::sample()
    });

    let start = tokio::time::Instant::now();
    let err = engine.statistics(ID, 10.0).await.unwrap_err();

    assert!(matches!(err, GeoStatsError::Store { .. }));
    assert!(start.elapsed() < Duration::from_secs(1));
    // Le future des bâtiments a été abandonné avant la fin de son délai
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert!(!engine.store().buildings_done.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_timing_does_not_change_result() {
    let plain = engine(ScriptedStore::sample()).statistics(ID, 10.0).await.unwrap();
    let timed = ZoneStatisticsEngine::new(
        ScriptedStore::sample(),
        StatisticsConfig {
            timing: true,
            ..Default::default()
        },
    )
    .statistics(ID, 10.0)
    .await
    .unwrap();

    assert_eq!(plain, timed);
}

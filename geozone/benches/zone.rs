//! Benchmarks du calcul de statistiques de zone

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use geo::Point;
use geozone::buffer::buffer;
use geozone::codec::polygon_from_bbox;
use geozone::measure::area_distance;
use geozone::projection::Projector;
use geozone::{Geometry, MemoryStore, Property, StatisticsConfig, ZoneStatisticsEngine};

fn geocode() -> Point {
    Point::new(-73.748751, 40.918548)
}

/// Grille de `side` x `side` propriétés de 20 m autour du géocode
fn grid(side: usize) -> MemoryStore {
    let origin = Projector::to_metric().transform_point(&geocode()).0;
    let back = Projector::to_geographic();
    let half = side as f64 * 10.0;

    let properties = (0..side * side).map(|i| {
        let x = origin.x - half + (i % side) as f64 * 20.0;
        let y = origin.y - half + (i / side) as f64 * 20.0;

        let mut property = Property::new(format!("p{i}"));
        property.geocode = Some(back.transform_point(&Point::new(x + 10.0, y + 10.0)));
        property.parcel = Some(back.transform_polygon(&polygon_from_bbox([x, y, x + 20.0, y + 20.0])));
        property.building = Some(back.transform_polygon(&polygon_from_bbox([
            x + 4.0,
            y + 4.0,
            x + 16.0,
            y + 16.0,
        ])));
        property
    });

    MemoryStore::new(properties).unwrap()
}

fn bench_buffer(c: &mut Criterion) {
    let point = Geometry::Point(geocode());
    let mut group = c.benchmark_group("buffer");

    for distance in [10.0, 100.0, 1000.0] {
        group.bench_with_input(BenchmarkId::from_parameter(distance), &distance, |b, &d| {
            b.iter(|| black_box(buffer(Some(black_box(&point)), d).unwrap()))
        });
    }

    group.finish();
}

fn bench_area_distance(c: &mut Criterion) {
    let store = grid(1);
    let building = store.properties()[0].building.clone().unwrap();
    let reference = Geometry::Point(geocode());

    c.bench_function("area_distance", |b| {
        b.iter(|| black_box(area_distance(Some(&building), Some(&reference)).unwrap()))
    });
}

fn bench_statistics(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let mut group = c.benchmark_group("statistics");

    for side in [10, 50] {
        let engine = ZoneStatisticsEngine::new(grid(side), StatisticsConfig::default());
        group.bench_with_input(BenchmarkId::from_parameter(side * side), &engine, |b, engine| {
            b.to_async(&rt)
                .iter(|| async { black_box(engine.statistics("p0", 50.0).await.unwrap()) })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_buffer, bench_area_distance, bench_statistics);
criterion_main!(benches);

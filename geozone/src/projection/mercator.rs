//! Projection Web Mercator (EPSG:3857)
//!
//! Aussi connu sous le nom de Pseudo-Mercator ou Spherical Mercator.
//! Modèle sphérique sur le rayon équatorial WGS84.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use geo::Coord;

/// Rayon de la sphère : demi-grand axe WGS84 (mètres)
pub const EARTH_RADIUS: f64 = 6_378_137.0;

/// Latitude maximale du carré Web Mercator (degrés)
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Demi-étendue du carré Web Mercator (mètres)
pub const HALF_EXTENT: f64 = std::f64::consts::PI * EARTH_RADIUS;

/// Convertit (lon, lat) en degrés vers Web Mercator (mètres)
pub fn forward(c: Coord) -> Coord {
    let r = EARTH_RADIUS;

    // Limiter la latitude pour éviter l'infini aux pôles
    let lat = c.y.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();

    Coord {
        x: r * c.x.to_radians(),
        y: r * (FRAC_PI_4 + lat / 2.0).tan().ln(),
    }
}

/// Convertit Web Mercator (mètres) vers (lon, lat) en degrés
pub fn inverse(c: Coord) -> Coord {
    let r = EARTH_RADIUS;

    // Latitude = 2 * atan(exp(y/R)) - π/2
    Coord {
        x: (c.x / r).to_degrees(),
        y: (2.0 * (c.y / r).exp().atan() - FRAC_PI_2).to_degrees(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paris_to_web_mercator() {
        // Paris: 2.35°E, 48.85°N
        let c = forward(Coord { x: 2.35, y: 48.85 });

        // X ≈ 261600, Y ≈ 6250000
        assert!((c.x - 261600.0).abs() < 1000.0, "x={}", c.x);
        assert!((c.y - 6250000.0).abs() < 10000.0, "y={}", c.y);
    }

    #[test]
    fn test_origin() {
        let c = forward(Coord { x: 0.0, y: 0.0 });
        assert!(c.x.abs() < 1e-9);
        assert!(c.y.abs() < 1e-9);
    }

    #[test]
    fn test_extent_corner() {
        let c = forward(Coord {
            x: 180.0,
            y: MAX_LATITUDE,
        });
        assert!((c.x - HALF_EXTENT).abs() < 1e-6, "x={}", c.x);
        assert!((c.y - HALF_EXTENT).abs() < 1e-3, "y={}", c.y);
    }

    #[test]
    fn test_latitude_is_clamped() {
        let pole = forward(Coord { x: 0.0, y: 90.0 });
        assert!(pole.y.is_finite());
        assert!((pole.y - HALF_EXTENT).abs() < 1e-3);
    }

    #[test]
    fn test_roundtrip() {
        let c = Coord {
            x: -73.748751,
            y: 40.918548,
        };
        let back = inverse(forward(c));

        assert!((back.x - c.x).abs() < 1e-9, "lon={}", back.x);
        assert!((back.y - c.y).abs() < 1e-9, "lat={}", back.y);
    }
}

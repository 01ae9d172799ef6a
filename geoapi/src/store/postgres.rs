//! Store de propriétés PostgreSQL/PostGIS
//!
//! Colonnes géographiques `geography` en EPSG:4326 : `ST_Area` et
//! `ST_Intersects` travaillent sur le sphéroïde. Les géométries sont écrites
//! en EWKB et relues via `ST_AsBinary`.

use std::sync::OnceLock;

use anyhow::{Context, Result};
use deadpool_postgres::{Object, Pool};
use geo::{Point, Polygon};
use geozero::wkb::Wkb;
use geozero::ToGeo;
use regex::Regex;
use tokio_postgres::error::SqlState;
use tokio_postgres::Row;
use tracing::{debug, info, warn};
use wkb::geom_to_wkb;

use geozone::buffer::buffer;
use geozone::error::Result as StoreResult;
use geozone::{GeoStatsError, Geometry, Property, PropertyStore};

/// SRID des colonnes géographiques
const SRID: u32 = 4326;

const COLUMNS: &str = "id, ST_AsBinary(geocode_geo), ST_AsBinary(parcel_geo), \
                       ST_AsBinary(building_geo), image_bounds, image_url";

/// Store PostGIS sur une table de propriétés
#[derive(Clone)]
pub struct PgPropertyStore {
    pool: Pool,
    table: String,
}

fn table_regex() -> Option<&'static Regex> {
    static TABLE: OnceLock<Option<Regex>> = OnceLock::new();
    TABLE
        .get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").ok())
        .as_ref()
}

/// Vérifie qu'un nom de table peut être interpolé tel quel dans le SQL
pub fn validate_table_name(table: &str) -> Result<()> {
    if table_regex().is_some_and(|re| re.is_match(table)) {
        Ok(())
    } else {
        anyhow::bail!("Invalid table name: {table}. Use [schema.]table with letters, digits and _")
    }
}

impl PgPropertyStore {
    pub fn new(pool: Pool, table: impl Into<String>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self { pool, table })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    async fn client(&self) -> StoreResult<Object> {
        self.pool
            .get()
            .await
            .map_err(|e| GeoStatsError::store("Failed to get connection from pool", e))
    }

    /// Crée l'extension PostGIS, la table et ses index
    pub async fn create_schema(&self, drop_existing: bool) -> Result<()> {
        let client = self.pool.get().await.context("Failed to get connection from pool")?;

        // Peut nécessiter des droits superuser : on accepte une extension déjà installée
        if let Err(e) = client
            .execute("CREATE EXTENSION IF NOT EXISTS postgis", &[])
            .await
        {
            warn!("CREATE EXTENSION postgis failed (will check if already installed): {e}");
            let exists = client
                .query_opt("SELECT 1 FROM pg_extension WHERE extname = 'postgis'", &[])
                .await
                .context("Failed to check pg_extension")?
                .is_some();
            if !exists {
                anyhow::bail!("PostGIS extension is not installed and could not be created: {e}");
            }
        }

        if drop_existing {
            client
                .execute(&format!("DROP TABLE IF EXISTS {} CASCADE", self.table), &[])
                .await
                .context("Failed to drop table")?;
        }

        let index_prefix = self.table.replace('.', "_");
        let sql = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {table} (
                id TEXT PRIMARY KEY,
                geocode_geo geography(POINT, 4326),
                parcel_geo geography(POLYGON, 4326),
                building_geo geography(POLYGON, 4326),
                image_bounds DOUBLE PRECISION[],
                image_url TEXT
            );
            CREATE INDEX IF NOT EXISTS {prefix}_geocode_geo_idx ON {table} USING GIST (geocode_geo);
            CREATE INDEX IF NOT EXISTS {prefix}_parcel_geo_idx ON {table} USING GIST (parcel_geo);
            CREATE INDEX IF NOT EXISTS {prefix}_building_geo_idx ON {table} USING GIST (building_geo);
            "#,
            table = self.table,
            prefix = index_prefix,
        );

        client
            .batch_execute(&sql)
            .await
            .with_context(|| format!("Failed to create table {}", self.table))?;

        info!(table = %self.table, drop_existing, "Schema ready");
        Ok(())
    }

    /// Insère une propriété dans une transaction
    ///
    /// Un identifiant existant donne `DuplicateId`.
    pub async fn insert(&self, property: &Property) -> StoreResult<()> {
        let geocode = property
            .geocode
            .map(|p| geometry_to_ewkb(&Geometry::Point(p)))
            .transpose()?;
        let parcel = optional_polygon_ewkb(property.parcel.as_ref())?;
        let building = optional_polygon_ewkb(property.building.as_ref())?;
        let image_bounds = property.image_bounds.map(|b| b.to_vec());

        let mut client = self.client().await?;
        let transaction = client
            .transaction()
            .await
            .map_err(|e| GeoStatsError::store("Failed to begin transaction", e))?;

        let sql = format!(
            "INSERT INTO {} (id, geocode_geo, parcel_geo, building_geo, image_bounds, image_url) \
             VALUES ($1, ST_GeomFromEWKB($2)::geography, ST_GeomFromEWKB($3)::geography, \
             ST_GeomFromEWKB($4)::geography, $5, $6)",
            self.table
        );

        let inserted = transaction
            .execute(
                &sql,
                &[
                    &property.id,
                    &geocode,
                    &parcel,
                    &building,
                    &image_bounds,
                    &property.image_url,
                ],
            )
            .await;

        if let Err(e) = inserted {
            // Rollback implicite au drop de la transaction
            if e.code() == Some(&SqlState::UNIQUE_VIOLATION) {
                return Err(GeoStatsError::DuplicateId(property.id.clone()));
            }
            return Err(GeoStatsError::store(
                format!("Failed to insert property {}", property.id),
                e,
            ));
        }

        transaction
            .commit()
            .await
            .map_err(|e| GeoStatsError::store("Failed to commit transaction", e))?;

        debug!(id = %property.id, "Property inserted");
        Ok(())
    }

    /// Lit une propriété
    pub async fn get(&self, id: &str) -> StoreResult<Property> {
        let client = self.client().await?;
        let sql = format!("SELECT {COLUMNS} FROM {} WHERE id = $1", self.table);

        let row = client
            .query_opt(&sql, &[&id])
            .await
            .map_err(|e| GeoStatsError::store(format!("Failed to read property {id}"), e))?
            .ok_or_else(|| GeoStatsError::NotFound(id.to_string()))?;

        row_to_property(&row)
    }

    /// Lit toutes les propriétés
    ///
    /// Une table vide donne `NoProperties`.
    pub async fn list(&self) -> StoreResult<Vec<Property>> {
        let client = self.client().await?;
        let sql = format!("SELECT {COLUMNS} FROM {} ORDER BY id", self.table);

        let rows = client
            .query(&sql, &[])
            .await
            .map_err(|e| GeoStatsError::store("Failed to list properties", e))?;
        if rows.is_empty() {
            return Err(GeoStatsError::NoProperties);
        }

        rows.iter().map(row_to_property).collect()
    }

    /// Identifiants des propriétés dont le géocode est à moins de
    /// `distance_meters` de la géométrie
    pub async fn find_near(
        &self,
        geometry: &Geometry,
        distance_meters: f64,
    ) -> StoreResult<Vec<String>> {
        let zone = buffer(Some(geometry), distance_meters)?
            .ok_or(GeoStatsError::MissingGeometry("zone"))?;
        let zone = geometry_to_ewkb(&Geometry::Polygon(zone))?;

        let client = self.client().await?;
        let sql = format!(
            "SELECT id FROM {} WHERE ST_Intersects(geocode_geo, ST_GeomFromEWKB($1)::geography)",
            self.table
        );

        let ids: Vec<String> = client
            .query(&sql, &[&zone])
            .await
            .map_err(|e| GeoStatsError::store("Failed to search properties", e))?
            .iter()
            .map(|row| row.get(0))
            .collect();

        debug!(found = ids.len(), distance_meters, "Properties near geometry");
        if ids.is_empty() {
            return Err(GeoStatsError::NoProperties);
        }
        Ok(ids)
    }
}

impl PropertyStore for PgPropertyStore {
    async fn get_geocode(&self, id: &str) -> StoreResult<Option<Point>> {
        let client = self.client().await?;
        let sql = format!("SELECT ST_AsBinary(geocode_geo) FROM {} WHERE id = $1", self.table);

        let row = client
            .query_opt(&sql, &[&id])
            .await
            .map_err(|e| GeoStatsError::store(format!("Failed to read geocode of {id}"), e))?
            .ok_or_else(|| GeoStatsError::NotFound(id.to_string()))?;

        let wkb: Option<Vec<u8>> = row.get(0);
        wkb.map(wkb_to_point).transpose()
    }

    async fn sum_intersecting_parcel_area(&self, zone: &Polygon) -> StoreResult<Option<f64>> {
        let zone = geometry_to_ewkb(&Geometry::Polygon(zone.clone()))?;
        let client = self.client().await?;
        let sql = format!(
            "SELECT SUM(ST_Area(parcel_geo)) FROM {} \
             WHERE ST_Intersects(parcel_geo, ST_GeomFromEWKB($1)::geography)",
            self.table
        );

        let row = client
            .query_one(&sql, &[&zone])
            .await
            .map_err(|e| GeoStatsError::store("Failed to sum parcel areas", e))?;
        Ok(row.get(0))
    }

    async fn find_intersecting_buildings(&self, zone: &Polygon) -> StoreResult<Vec<Polygon>> {
        let zone = geometry_to_ewkb(&Geometry::Polygon(zone.clone()))?;
        let client = self.client().await?;
        let sql = format!(
            "SELECT ST_AsBinary(building_geo) FROM {} \
             WHERE ST_Intersects(building_geo, ST_GeomFromEWKB($1)::geography)",
            self.table
        );

        client
            .query(&sql, &[&zone])
            .await
            .map_err(|e| GeoStatsError::store("Failed to find buildings", e))?
            .iter()
            .map(|row| wkb_to_polygon(row.get(0)))
            .collect()
    }
}

fn row_to_property(row: &Row) -> StoreResult<Property> {
    let geocode: Option<Vec<u8>> = row.get(1);
    let parcel: Option<Vec<u8>> = row.get(2);
    let building: Option<Vec<u8>> = row.get(3);
    let image_bounds: Option<Vec<f64>> = row.get(4);

    let image_bounds = match image_bounds {
        None => None,
        Some(values) => Some(<[f64; 4]>::try_from(values.as_slice()).map_err(|_| {
            GeoStatsError::geometry(format!(
                "image_bounds must hold 4 numbers, got {}",
                values.len()
            ))
        })?),
    };

    Ok(Property {
        id: row.get(0),
        geocode: geocode.map(wkb_to_point).transpose()?,
        parcel: parcel.map(wkb_to_polygon).transpose()?,
        building: building.map(wkb_to_polygon).transpose()?,
        image_bounds,
        image_url: row.get(5),
    })
}

fn optional_polygon_ewkb(polygon: Option<&Polygon>) -> StoreResult<Option<Vec<u8>>> {
    polygon
        .map(|p| geometry_to_ewkb(&Geometry::Polygon(p.clone())))
        .transpose()
}

/// Convertit une géométrie en EWKB avec le SRID des colonnes
fn geometry_to_ewkb(geom: &Geometry) -> StoreResult<Vec<u8>> {
    let geom: geo::Geometry = geom.clone().into();
    let wkb = geom_to_wkb(&geom)
        .map_err(|e| GeoStatsError::geometry(format!("Failed to convert geometry to WKB: {e:?}")))?;
    ewkb_with_srid(&wkb, SRID)
}

/// Ajoute le flag SRID (0x20000000) et le SRID à un WKB
fn ewkb_with_srid(wkb: &[u8], srid: u32) -> StoreResult<Vec<u8>> {
    if wkb.len() < 5 {
        return Err(GeoStatsError::geometry("WKB too short"));
    }

    let little_endian = wkb[0] == 1;
    let type_bytes = [wkb[1], wkb[2], wkb[3], wkb[4]];

    let mut ewkb = Vec::with_capacity(wkb.len() + 4);
    ewkb.push(wkb[0]);
    if little_endian {
        ewkb.extend_from_slice(&(u32::from_le_bytes(type_bytes) | 0x2000_0000).to_le_bytes());
        ewkb.extend_from_slice(&srid.to_le_bytes());
    } else {
        ewkb.extend_from_slice(&(u32::from_be_bytes(type_bytes) | 0x2000_0000).to_be_bytes());
        ewkb.extend_from_slice(&srid.to_be_bytes());
    }
    ewkb.extend_from_slice(&wkb[5..]);

    Ok(ewkb)
}

fn wkb_to_geometry(bytes: Vec<u8>) -> StoreResult<geo::Geometry> {
    Wkb(bytes)
        .to_geo()
        .map_err(|e| GeoStatsError::geometry(format!("Failed to decode WKB: {e}")))
}

fn wkb_to_point(bytes: Vec<u8>) -> StoreResult<Point> {
    match wkb_to_geometry(bytes)? {
        geo::Geometry::Point(p) => Ok(p),
        _ => Err(GeoStatsError::geometry("expected Point in geocode_geo")),
    }
}

fn wkb_to_polygon(bytes: Vec<u8>) -> StoreResult<Polygon> {
    match wkb_to_geometry(bytes)? {
        geo::Geometry::Polygon(p) => Ok(p),
        _ => Err(GeoStatsError::geometry("expected Polygon")),
    }
}

//! Pool de connexions PostgreSQL

use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;
use tracing::debug;

/// Mode SSL pour la connexion PostgreSQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SslMode {
    /// Pas de SSL (défaut)
    #[default]
    Disable,
    /// SSL préféré mais non requis
    Prefer,
    /// SSL requis
    Require,
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" | "yes" => Ok(SslMode::Require),
            _ => Err(format!("Invalid SSL mode: {}. Use: disable, prefer, require", s)),
        }
    }
}

/// Configuration de la base de données
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,

    /// URL de connexion complète, prioritaire sur les champs ci-dessus
    pub url: Option<String>,

    pub pool_size: usize,
    pub ssl_mode: SslMode,

    /// Table des propriétés (éventuellement qualifiée `schema.table`)
    pub table: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "geoapi".into(),
            user: "postgres".into(),
            password: None,
            url: None,
            pool_size: 16,
            ssl_mode: SslMode::Disable,
            table: "properties".into(),
        }
    }
}

impl DatabaseConfig {
    /// Applique les variables d'environnement `PG*`, `POOL_SIZE`,
    /// `GEOAPI_DATABASE_URL` et `GEOAPI_TABLE`
    ///
    /// Une valeur numérique ou un mode SSL illisible est une erreur.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = var("PGHOST") {
            self.host = host;
        }
        if let Some(port) = var("PGPORT") {
            self.port = port
                .parse()
                .with_context(|| format!("Invalid PGPORT: {port}"))?;
        }
        if let Some(dbname) = var("PGDATABASE") {
            self.dbname = dbname;
        }
        if let Some(user) = var("PGUSER") {
            self.user = user;
        }
        if let Some(password) = var("PGPASSWORD") {
            self.password = Some(password);
        }
        if let Some(size) = var("POOL_SIZE") {
            self.pool_size = size
                .parse()
                .with_context(|| format!("Invalid POOL_SIZE: {size}"))?;
        }
        if let Some(mode) = var("PGSSLMODE") {
            self.ssl_mode = mode.parse().map_err(anyhow::Error::msg)?;
        }
        if let Some(url) = var("GEOAPI_DATABASE_URL") {
            self.url = Some(url);
        }
        if let Some(table) = var("GEOAPI_TABLE") {
            self.table = table;
        }
        Ok(())
    }

    /// Description lisible de la cible, sans mot de passe
    pub fn target(&self) -> String {
        match &self.url {
            Some(_) => "<database url>".to_string(),
            None => format!("{}@{}:{}/{}", self.user, self.host, self.port, self.dbname),
        }
    }
}

/// Crée la configuration TLS pour rustls
fn make_tls_connector() -> Result<MakeRustlsConnect> {
    let root_store =
        rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let config = rustls::ClientConfig::builder()
        .with_root_certificates(root_store)
        .with_no_client_auth();

    Ok(MakeRustlsConnect::new(config))
}

/// Crée un pool de connexions
pub fn create_pool(config: &DatabaseConfig) -> Result<Pool> {
    let mut cfg = Config::new();
    match &config.url {
        Some(url) => cfg.url = Some(url.clone()),
        None => {
            cfg.host = Some(config.host.clone());
            cfg.port = Some(config.port);
            cfg.dbname = Some(config.dbname.clone());
            cfg.user = Some(config.user.clone());
            cfg.password = config.password.clone();
        }
    }

    cfg.pool = Some(PoolConfig {
        max_size: config.pool_size,
        timeouts: Timeouts {
            wait: Some(Duration::from_secs(30)),
            create: Some(Duration::from_secs(10)),
            recycle: Some(Duration::from_secs(30)),
        },
        ..Default::default()
    });

    debug!(
        db = %config.target(),
        ssl = ?config.ssl_mode,
        pool_size = config.pool_size,
        "Creating pool"
    );

    match config.ssl_mode {
        SslMode::Disable => cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .context("Failed to create database pool"),
        SslMode::Prefer | SslMode::Require => {
            let tls = make_tls_connector()?;
            cfg.create_pool(Some(Runtime::Tokio1), tls)
                .context("Failed to create database pool with TLS")
        }
    }
}

/// Teste la connexion à la base
pub async fn test_connection(pool: &Pool) -> Result<()> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    client
        .execute("SELECT 1", &[])
        .await
        .context("Connection test failed")?;
    Ok(())
}

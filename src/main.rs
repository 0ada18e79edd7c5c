use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use anyhow::Context;
use tracing::info;

mod auth;
mod config;
mod error;
mod matrix;
mod members;
mod policy;
mod render;
mod reports;
mod repository;
mod routes;
mod schemas;
mod store;

use crate::auth::{load_user_records, Credentials};
use crate::config::Config;
use crate::repository::Registry;
use crate::routes::AppState;
use crate::store::Store;

/// Used when `RUST_LOG` is unset. `actix_web` carries the per-request lines of
/// `middleware::Logger`.
const DEFAULT_LOG_FILTER: &str = "association_manager=info,actix_web=info";

fn cors(allowed_origin: Option<&str>) -> Cors {
    match allowed_origin {
        Some(origin) => Cors::default()
            .allowed_origin(origin)
            .allow_any_method()
            .allow_any_header()
            .max_age(3600),
        None => Cors::default(),
    }
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let config = Config::from_env()?;

    let records = load_user_records(&config.users_file)?;
    info!(users = records.len(), path = %config.users_file.display(), "users loaded");
    let credentials = Credentials::from_records(
        &config.session_secret,
        config.session_ttl_secs,
        records,
    )?;

    let store = Store::connect(config.mongodb_uri.as_deref())
        .await
        .context("failed to connect to mongodb")?;
    let (members, payments) = store.load().await?;

    let state = web::Data::new(AppState::new(
        Registry::new(members, payments),
        credentials,
        store,
        config.association_name.clone(),
    ));

    info!(addr = %config.bind_addr, port = config.port, "starting server");
    let allowed_origin = config.allowed_origin.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(cors(allowed_origin.as_deref()))
            .wrap(Logger::default())
            .app_data(state.clone())
            .configure(routes::configure)
    })
    .bind((config.bind_addr.as_str(), config.port))?
    .run()
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    #[test]
    fn default_filter_keeps_request_logs() {
        let filter: EnvFilter = DEFAULT_LOG_FILTER.parse().unwrap();
        let directives = filter.to_string();
        assert!(directives.contains("actix_web=info"));
        assert!(directives.contains("association_manager=info"));
    }
}

use ledger_common::db::{CategoryStore, DbHandle, MemoryStore, PgStore, Store};

use actix_web::web::Data;
use actix_web::{App, HttpServer};
use chrono::Utc;
use flexi_logger::{
    Age, Cleanup, Criterion, Duplicate, FileSpec, LogSpecification, Logger, Naming, WriteMode,
};
use std::sync::Arc;

use crate::env::StoreBackend;
use crate::middleware::cors::CorsMiddleware;
use crate::services::api::RouteLimiters;

mod env;
mod handlers;
mod middleware;
mod services;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let mut port = 9000u16;

    let mut args = std::env::args();

    // Eat the first argument, which is the relative path to the executable
    args.next();

    while let Some(arg) = args.next() {
        match arg.to_lowercase().as_str() {
            "--port" => {
                let port_str = {
                    let next_arg = args.next();

                    match next_arg {
                        Some(s) => s,
                        None => {
                            eprintln!("ERROR: --port option specified but no port was given");
                            std::process::exit(1);
                        }
                    }
                };

                port = match port_str.parse::<u16>() {
                    Ok(p) => p,
                    Err(_) => {
                        eprintln!("ERROR: Incorrect format for port. Integer expected");
                        std::process::exit(1);
                    }
                };

                continue;
            }
            a => {
                eprintln!("ERROR: Invalid argument: {}", &a);
                std::process::exit(1);
            }
        }
    }

    let base_addr = format!("127.0.0.1:{}", &port);

    let log_spec = match LogSpecification::parse(&env::CONF.log_level) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("ERROR: Invalid log level '{}': {e}", env::CONF.log_level);
            std::process::exit(1);
        }
    };

    let _logger = match Logger::with(log_spec)
        .log_to_file(FileSpec::default().directory("./logs"))
        .rotate(
            Criterion::Age(Age::Day),
            Naming::Timestamps,
            Cleanup::KeepLogAndCompressedFiles(60, 365),
        )
        .cleanup_in_background_thread(true)
        .duplicate_to_stdout(Duplicate::All)
        .write_mode(WriteMode::Async)
        .format(|writer, now, record| {
            write!(
                writer,
                "{:5} | {} | {}:{} | {}",
                record.level(),
                now.format("%Y-%m-%dT%H:%M:%S%.6fZ"),
                record.module_path().unwrap_or("<unknown>"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .use_utc()
        .start()
    {
        Ok(l) => l,
        Err(e) => {
            eprintln!("ERROR: Failed to start logger: {e}");
            std::process::exit(1);
        }
    };

    let store: Arc<dyn Store> = match (env::CONF.store_backend, &env::CONF.db) {
        (StoreBackend::Postgres, Some(db_conf)) => {
            log::info!("Connecting to database...");

            // Each actix worker may hold a connection while blocked
            let max_connections = db_conf
                .max_connections
                .max(env::CONF.actix_worker_count as u32);

            let db_handle = DbHandle::new(
                db_conf.database_uri().as_str(),
                max_connections,
                db_conf.idle_timeout,
            );

            if let Err(e) = db_handle.open() {
                log::error!("{e}");
                eprintln!("ERROR: Failed to connect to database");
                std::process::exit(1);
            }

            log::info!("Successfully connected to database");

            Arc::new(PgStore::new(Arc::new(db_handle)))
        }
        (StoreBackend::Postgres, None) => {
            eprintln!("ERROR: Database configuration missing");
            std::process::exit(1);
        }
        (StoreBackend::Memory, _) => {
            log::warn!("Using in-memory store. Data will be lost on shutdown.");
            Arc::new(MemoryStore::new())
        }
    };

    match store.seed_default_categories(Utc::now()) {
        Ok(true) => log::info!("Seeded default categories"),
        Ok(false) => (),
        Err(e) => {
            log::error!("Failed to seed default categories: {e}");
            std::process::exit(1);
        }
    }

    let store = Data::from(store);
    let limiters = RouteLimiters::default();

    log::info!("Listening on {base_addr}");

    HttpServer::new(move || {
        App::new()
            .app_data(store.clone())
            .configure(|cfg| services::api::configure(cfg, limiters.clone()))
            .wrap(CorsMiddleware::default())
            .wrap(actix_web::middleware::Logger::default())
    })
    .workers(env::CONF.actix_worker_count)
    .bind(base_addr)?
    .run()
    .await?;

    Ok(())
}

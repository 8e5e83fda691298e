use actix_web::{web, App, HttpServer, middleware::Logger};
use actix_cors::Cors;
use dotenv::dotenv;
use std::net::TcpListener;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use givecart_payments::config::AppSettings;
use givecart_payments::db::connection::{create_pool, verify_connection};
use givecart_payments::db::repositories::PaymentRepository;
use givecart_payments::db::store::PaymentStore;
use givecart_payments::handlers;
use givecart_payments::routes::configure_payment_routes;
use givecart_payments::services::gateway::PaymentGateway;
use givecart_payments::services::payment_service::PaymentService;
use givecart_payments::services::razorpay_service::RazorpayClient;
use givecart_payments::services::reconciliation_service::ReconciliationService;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    // Load application settings
    let app_settings = match AppSettings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("Failed to load application settings: {}", e);
            log::error!("Cannot start server without valid settings");
            std::process::exit(1);
        }
    };

    // Database connection setup
    let db_pool = match create_pool(&app_settings.database).await {
        Ok(pool) => {
            if let Err(e) = verify_connection(&pool).await {
                log::error!("Database connection verification failed: {}", e);
                log::error!("Cannot start server without a working database connection");
                std::process::exit(1);
            }
            log::info!("Database connection established successfully");
            pool
        },
        Err(e) => {
            log::error!("Failed to create database connection pool: {}", e);
            log::error!("Cannot start server without a working database connection");
            std::process::exit(1);
        }
    };

    // Gateway client and payment service; credentials come from settings,
    // never from source.
    let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayClient::new(&app_settings.razorpay));
    let store: Arc<dyn PaymentStore> = Arc::new(PaymentRepository::new(db_pool.clone()));
    let payment_service = PaymentService::new(store.clone(), gateway.clone());

    // Reconciliation sweep for intents whose callback never arrived.
    let scheduler = match JobScheduler::new().await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            log::error!("Failed to create job scheduler: {}", e);
            std::process::exit(1);
        }
    };

    if app_settings.reconciliation.enabled {
        let reconciliation = ReconciliationService::new(
            store.clone(),
            gateway.clone(),
            app_settings.reconciliation.clone(),
        );
        let schedule = app_settings.reconciliation.schedule.clone();

        let job = Job::new_async(schedule.as_str(), move |_id, _scheduler| {
            let reconciliation = reconciliation.clone();
            Box::pin(async move {
                match reconciliation.reconcile_stuck_intents().await {
                    Ok(report) => {
                        log::debug!(
                            "Reconciliation sweep: {} checked, {} completed, {} abandoned",
                            report.checked, report.completed, report.abandoned
                        );
                    }
                    Err(e) => log::error!("Reconciliation sweep failed: {}", e),
                }
            })
        });

        match job {
            Ok(job) => {
                if let Err(e) = scheduler.add(job).await {
                    log::error!("Failed to schedule reconciliation job: {}", e);
                    std::process::exit(1);
                }
            }
            Err(e) => {
                log::error!("Invalid reconciliation schedule '{}': {}", schedule, e);
                std::process::exit(1);
            }
        }

        if let Err(e) = scheduler.start().await {
            log::error!("Failed to start job scheduler: {}", e);
            std::process::exit(1);
        }
        log::info!("Reconciliation job scheduled ({})", app_settings.reconciliation.schedule);
    } else {
        log::info!("Reconciliation job disabled by configuration");
    }

    // Get server host and port from settings
    let host = &app_settings.server.host;
    let port = app_settings.server.port;

    log::info!("Starting server at http://{}:{}", host, port);

    let server_addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(server_addr)?;

    HttpServer::new(move || {
        let app_settings = app_settings.clone();
        let payment_service = payment_service.clone();

        // Configure CORS using actix-cors; the checkout endpoints answer
        // preflight requests from the storefront origin(s).
        let mut cors = Cors::default();

        if app_settings.server.cors_origins.contains(&"*".to_string()) {
            cors = cors.allow_any_origin();
        } else {
            for origin in &app_settings.server.cors_origins {
                cors = cors.allowed_origin(origin);
            }
        }

        cors = cors
            .allow_any_method()
            .allow_any_header();

        App::new()
            .wrap(Logger::default())
            .wrap(cors)
            .app_data(web::Data::new(payment_service))
            // Register health check endpoint
            .service(
                web::resource("/health")
                    .route(web::get().to(handlers::health::health_check))
            )
            // Payment routes (public, called from the storefront)
            .service(
                web::scope("/api")
                    .configure(configure_payment_routes)
            )
    })
    .listen(listener)?
    .run()
    .await
}

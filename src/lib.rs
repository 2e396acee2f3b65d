pub mod application;
pub mod db;
pub mod domain;
pub mod errors;
pub mod handlers;
pub mod infrastructure;
pub mod schema;

use actix_web::{middleware::Logger, web, App, HttpServer};
use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub use db::{create_pool, DbPool};

pub const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Run any pending Diesel migrations against the pool's database.
pub fn run_migrations(pool: &DbPool) {
    let mut conn = pool.get().expect("Failed to get DB connection for migrations");
    conn.run_pending_migrations(MIGRATIONS)
        .expect("Failed to run database migrations");
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
        handlers::orders::business_orders,
        handlers::orders::user_orders,
        handlers::inventory::register_inventory,
        handlers::inventory::set_stock,
        handlers::inventory::check_availability,
        handlers::inventory::stock_for_date,
        handlers::inventory::inventory_history,
        handlers::inventory::adjust_inventory,
        handlers::inventory::remove_inventory,
        handlers::wallet::wallet_balance,
        handlers::wallet::deposit,
        handlers::wallet::withdraw,
        handlers::wallet::wallet_transactions,
        handlers::subscriptions::create_subscription,
        handlers::subscriptions::get_subscription,
        handlers::subscriptions::update_subscription_status,
        handlers::subscriptions::record_payment,
        handlers::subscriptions::user_subscriptions,
    ),
    tags(
        (name = "orders", description = "Order placement and lifecycle"),
        (name = "inventory", description = "Daily stock ledger"),
        (name = "wallet", description = "Prepaid wallet ledger"),
        (name = "subscriptions", description = "Recurring pickup plans"),
    )
)]
struct ApiDoc;

/// Build and return an actix-web `Server` bound to `host:port`.
///
/// The caller is responsible for `.await`-ing (or `tokio::spawn`-ing) the
/// returned server.
pub fn build_server(
    pool: DbPool,
    host: &str,
    port: u16,
) -> std::io::Result<actix_web::dev::Server> {
    Ok(HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(pool.clone()))
            .wrap(Logger::default())
            .service(
                web::scope("/orders")
                    .route("", web::post().to(handlers::orders::create_order))
                    .route(
                        "/business/{business_id}",
                        web::get().to(handlers::orders::business_orders),
                    )
                    .route("/user/{user_id}", web::get().to(handlers::orders::user_orders))
                    .route("/{id}", web::get().to(handlers::orders::get_order))
                    .route(
                        "/{id}/status",
                        web::patch().to(handlers::orders::update_order_status),
                    ),
            )
            .service(
                web::scope("/inventory")
                    .route("", web::post().to(handlers::inventory::register_inventory))
                    .route("/set-stock", web::put().to(handlers::inventory::set_stock))
                    .route(
                        "/availability",
                        web::get().to(handlers::inventory::check_availability),
                    )
                    .route(
                        "/stock/{item_id}/{date}",
                        web::get().to(handlers::inventory::stock_for_date),
                    )
                    .route(
                        "/history/{item_id}",
                        web::get().to(handlers::inventory::inventory_history),
                    )
                    .route("/{id}", web::patch().to(handlers::inventory::adjust_inventory))
                    .route("/{id}", web::delete().to(handlers::inventory::remove_inventory)),
            )
            .service(
                web::scope("/wallet")
                    .route("/balance", web::get().to(handlers::wallet::wallet_balance))
                    .route("/deposit", web::post().to(handlers::wallet::deposit))
                    .route("/withdraw", web::post().to(handlers::wallet::withdraw))
                    .route(
                        "/{wallet_id}/transactions",
                        web::get().to(handlers::wallet::wallet_transactions),
                    ),
            )
            .service(
                web::scope("/subscriptions")
                    .route(
                        "",
                        web::post().to(handlers::subscriptions::create_subscription),
                    )
                    .route(
                        "/user/{user_id}",
                        web::get().to(handlers::subscriptions::user_subscriptions),
                    )
                    .route(
                        "/{id}",
                        web::get().to(handlers::subscriptions::get_subscription),
                    )
                    .route(
                        "/{id}/status",
                        web::patch().to(handlers::subscriptions::update_subscription_status),
                    )
                    .route(
                        "/{id}/payments",
                        web::post().to(handlers::subscriptions::record_payment),
                    ),
            )
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi()),
            )
    })
    .bind((host.to_string(), port))?
    .run())
}

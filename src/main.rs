use anyhow::Result;
use canteen_orderservice::{
    core::{app_state::AppState, bootstrap, config, db},
    routes,
};
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use tower_http::trace::TraceLayer;
use utoipa_swagger_ui::SwaggerUi;

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_tracing();
    bootstrap::init_env();

    let routes = routes::pay_orders::routes_with_openapi()
        .merge(routes::orders::routes_with_openapi())
        .merge(routes::carts::routes_with_openapi());

    let (router, mut openapi) = routes.split_for_parts();
    openapi.info = utoipa::openapi::InfoBuilder::new()
        .title("Canteen OrderService API")
        .version("1.0.0")
        .build();

    tracing::info!("Running migrations...");
    let config = config::load()?;
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    let state = AppState::init(&config).await?;
    let app = router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", openapi))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!("Canteen OrderService listening on port {}", config.port);
    axum::serve(listener, app).await?;

    Ok(())
}

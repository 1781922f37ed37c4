//! Example consumer: serves a `User` model.
//!
//! Run from repo root: `cargo run -p example-consumer`
//! Settings come from the environment (or `.env`): `LAYER_PORT`, `LAYER_LOG`, `LAYER_DATABASE`,
//! `DATABASE_URL`, `LAYER_BODY_LIMIT`.

use axum::{routing::get, Router};
use layer::{logging::init_subscriber, Logger, ServerConfig};
use serde_json::json;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let config = ServerConfig::from_env();
    init_subscriber(&format!("layer={},example_consumer=info", config.log_level));

    let app = Router::new().route("/health", get(|| async { "ok" }));
    let mut lib = layer::start(app, &config.database_value(), Logger::from_level_str(&config.log_level))?;
    if let Some(limit) = config.body_limit {
        lib.set_body_limit(limit);
    }

    lib.define(
        "User",
        json!({
            "collection": true,
            "routing": {
                "fetchAll": { "remove": ["password"] },
                "fetch": { "by": "name", "remove": ["password"] },
                "create": { "remove": ["password"] }
            },
            "name": { "type": "string", "required": true, "length": { "min": 3, "max": 32 } },
            "password": { "type": "string", "required": true, "length": { "min": 6, "max": 64 } }
        }),
    )
    .await?;

    for route in lib.routes() {
        tracing::info!("{}", route);
    }
    lib.listen(config.port).await?;
    Ok(())
}

use std::error::Error;

use foodgram::{routes, AppContext, Config, RECIPE_IMAGE_DIR};
use log::LevelFilter;
use simple_logger::SimpleLogger;
use sqlx::postgres::PgPoolOptions;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    SimpleLogger::new()
        .with_level(LevelFilter::Info)
        .with_module_level("sqlx", LevelFilter::Warn)
        .env()
        .init()?;

    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await?;
    log::info!("> Connected to database");

    sqlx::migrate!("./migrations").run(&pool).await?;
    log::info!("> Migrations applied");

    tokio::fs::create_dir_all(config.media_root.join(RECIPE_IMAGE_DIR)).await?;

    let addr = config.bind_addr;
    let api = routes(AppContext::new(pool, config));

    log::info!("> Listening on {addr}");
    warp::serve(api).run(addr).await;

    Ok(())
}

use std::error::Error;
use std::sync::Arc;

use ordering::executable_utils::{
    AppState, create_pool, initialize_executable, initialize_tracing, install_metrics_recorder,
    run_backend,
};
use ordering::extractor::OrdersExtractor;
use ordering::storage::{
    MIGRATOR, OrdersStorage, ProdOrdersStorage, ProdPerformersStorage, ProdScoresStorage,
    ProdUsersStorage,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    dotenvy::dotenv().ok();
    println!("Starting backend...");
    let config = initialize_executable()?;
    initialize_tracing(&config.backend.log_level);

    let pool = create_pool(&config).await?;
    MIGRATOR.run(&pool).await?;
    tracing::info!(project = %config.common.project_name, "Database migrations applied");

    let orders: Arc<dyn OrdersStorage> = Arc::new(ProdOrdersStorage::new(pool.clone()));
    let extractor = Arc::new(OrdersExtractor::new(
        Arc::new(ProdPerformersStorage::new(pool.clone())),
        Arc::new(ProdScoresStorage::new(pool.clone())),
        Arc::new(ProdUsersStorage::new(pool)),
    ));

    let state = AppState::new(orders, extractor).with_metrics(install_metrics_recorder()?);
    run_backend(config.backend, state).await
}

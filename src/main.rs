/// namegate - tiered name resolution server
///
/// Runs one hop of the edge cache → resolver → registry chain, or all of
/// them in one process (`NAMEGATE_ROLE=standalone`).
use namegate::{
    config::{LoggingConfig, ServerConfig},
    context::AppContext,
    error::NameResult,
    jobs, server,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> NameResult<()> {
    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize logging
    init_logging(&config.logging);

    // Print banner
    print_banner(&config);

    // Create application context
    let ctx = Arc::new(AppContext::new(config).await?);

    // Start background jobs
    let scheduler = Arc::new(jobs::JobScheduler::new(Arc::clone(&ctx)));
    scheduler.start();

    // Start server
    server::serve((*ctx).clone()).await?;

    Ok(())
}

fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("namegate={0},tower_http={0}", logging.level).into()
    });

    if logging.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

fn print_banner(config: &ServerConfig) {
    println!(
        r#"
    _ __   __ _ _ __ ___   ___  __ _  __ _| |_ ___
   | '_ \ / _` | '_ ` _ \ / _ \/ _` |/ _` | __/ _ \
   | | | | (_| | | | | | |  __/ (_| | (_| | ||  __/
   |_| |_|\__,_|_| |_| |_|\___|\__, |\__,_|\__\___|
                               |___/
        Tiered name resolution v{} ({})
        "#,
        env!("CARGO_PKG_VERSION"),
        config.role.as_str()
    );
}

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conductor::config::Config;
use conductor::integrator::ProjectIntegrator;
use conductor::registry::ProjectRegistry;
use conductor::server::{AppState, build_router};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "conductor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "conductor.toml".to_string());
    let config = match Config::from_path(config_path.as_ref()) {
        Ok(config) => config,
        Err(e) => {
            error!(path = %config_path, error = %e, "could not load configuration");
            std::process::exit(1);
        }
    };

    let registry = Arc::new(ProjectRegistry::new());
    let projects = match config.build_projects(&registry) {
        Ok(projects) => projects,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            std::process::exit(1);
        }
    };

    for project in projects {
        let name = project.name.clone();
        registry.insert(ProjectIntegrator::new(project).start());
        info!(project = %name, "project started");
    }

    let app = build_router(AppState::new(Arc::clone(&registry)));

    info!(listen = %config.listen, "management API listening");
    let listener = tokio::net::TcpListener::bind(config.listen).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();

    info!("shutting down: stopping integrators");
    registry.shutdown().await;
    info!("all integrators stopped");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

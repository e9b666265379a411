//! Stroke Risk API - Main Entry Point
//!
//! Loads the model artifacts and serves predictions over HTTP. Artifact
//! failures never stop the server: it starts degraded and `/predict`
//! answers 503 until it is restarted with working artifacts.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use stroke_risk_api::{
    api::{router, AppState},
    cli::Cli,
    config::{AppConfig, Deployment},
    logging,
    metrics::MetricsReporter,
    models::{loader::resolve_models_dir, InferenceEngine, ModelLoader, ScoreAggregator},
};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // .env is for local runs only; hosted deployments configure the environment directly
    let deployment = Deployment::detect();
    let dotenv = (!deployment.is_hosted()).then(dotenvy::dotenv);

    let mut config = AppConfig::load(cli.config.as_deref())?;
    cli.apply(&mut config);
    config.validate()?;

    logging::init(&config.logging)?;

    match dotenv {
        Some(Ok(path)) => info!(path = %path.display(), "Loaded .env file"),
        Some(Err(e)) if e.not_found() => debug!("No .env file found, relying on process environment"),
        Some(Err(e)) => warn!(error = %e, "Failed to load .env file"),
        None => info!(deployment = ?deployment, "Skipping .env load in hosted deployment"),
    }

    info!("Starting Stroke Risk API");

    let models_dir = resolve_models_dir(Path::new(&config.models.models_dir));
    info!(
        models_dir = %models_dir.display(),
        deployment = ?deployment,
        "Model directory configured"
    );

    let artifacts = ModelLoader::new(&config.models).load_all(&models_dir);
    let aggregator = ScoreAggregator::new(config.models.weights.clone());
    let (engine, report) = InferenceEngine::from_artifacts(artifacts, aggregator, config.risk);

    if cli.check {
        println!("{}", serde_json::to_string_pretty(&report)?);
        if !report.is_complete() {
            anyhow::bail!("Model artifacts failed to load");
        }
        return Ok(());
    }

    match &engine {
        Some(engine) => info!(models = ?engine.model_names(), "Models ready"),
        None => warn!("Serving in degraded mode: /predict will answer 503"),
    }

    let state = AppState::new(engine, report, deployment).shared();

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(Arc::clone(&state.metrics), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let app = router(Arc::clone(&state), &config.cors);

    let bind_address = config.server.bind_address();
    let listener = TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!(address = %bind_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Shutting down");
    state.metrics.log_summary();

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

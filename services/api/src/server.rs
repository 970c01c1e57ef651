use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_immunization_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use health_gateway::config::AppConfig;
use health_gateway::error::AppError;
use health_gateway::immunization::build_orchestrator;
use health_gateway::telemetry;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let orchestrator = Arc::new(build_orchestrator(&config));

    let app = with_immunization_routes(orchestrator)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        bcmp_max_retries = config.bc_mail_plus.max_retries,
        "immunization service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

use crate::{config::ServerConfig, handlers::not_found};
use anyhow::Context;
use axum::{
    response::IntoResponse,
    routing::{get, MethodRouter},
    Extension, Router,
};
use axum_prometheus::PrometheusMetricLayer;
use axum_test::{transport_layer::IntoTransportLayer, TestServer};
use sentry_tower::{NewSentryLayer, SentryHttpLayer};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::compression::CompressionLayer;
use tracing::info;
use tracing_subscriber::{
    filter::EnvFilter,
    fmt::{
        self,
        format::{Format, JsonFields},
    },
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

pub struct App {
    router: Router,
    metrics: PrometheusMetricLayer<'static>,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        // May not know if app is constructed before database, so trigger dotenvs in both situations
        dotenvy::dotenv().ok();
        logger();
        let (metric_gatherer, metric_printer) = PrometheusMetricLayer::pair();
        let router = Router::new()
            .route("/status/liveness", get(|| async { "".into_response() }))
            .route(
                "/metrics/prometheus",
                get(|| async move { metric_printer.render() }),
            )
            .fallback(not_found);
        Self {
            router,
            metrics: metric_gatherer,
        }
    }

    pub async fn start(self, config: &ServerConfig, shutdown: CancellationToken) -> anyhow::Result<()> {
        let addr = config.address();
        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("failed binding {addr}"))?;
        self.serve(listener, shutdown).await
    }

    /// Serves on an already bound listener until `shutdown` is cancelled,
    /// then drains in-flight requests.
    pub async fn serve(self, listener: TcpListener, shutdown: CancellationToken) -> anyhow::Result<()> {
        serve(self.into_router(), listener, shutdown).await
    }

    pub fn router(self, router: Router) -> Self {
        Self {
            router: self.router.merge(router),
            ..self
        }
    }

    pub fn inject<T: Clone + Send + Sync + 'static>(self, t: T) -> Self {
        Self {
            router: self.router.layer(Extension(t)),
            ..self
        }
    }

    pub fn route(self, path: &str, method_router: MethodRouter<()>) -> Self {
        let mut app = self;
        app.router = app.router.route(path, method_router);
        app
    }

    pub fn as_test_server(self) -> TestServer {
        TestServer::new(self).unwrap()
    }

    fn into_router(self) -> Router {
        self.router.layer(self.metrics)
    }
}

impl IntoTransportLayer for App {
    fn into_http_transport_layer(
        self,
        builder: axum_test::transport_layer::TransportLayerBuilder,
    ) -> anyhow::Result<Box<dyn axum_test::transport_layer::TransportLayer>> {
        self.into_router().into_http_transport_layer(builder)
    }

    fn into_mock_transport_layer(
        self,
    ) -> anyhow::Result<Box<dyn axum_test::transport_layer::TransportLayer>> {
        self.into_router().into_mock_transport_layer()
    }
}

async fn serve(app: Router, listener: TcpListener, shutdown: CancellationToken) -> anyhow::Result<()> {
    let _guard = sentry();
    let compression_layer: CompressionLayer = CompressionLayer::new()
        .br(true)
        .deflate(true)
        .gzip(true)
        .zstd(true);
    let app = app
        .layer(NewSentryLayer::new_from_top())
        .layer(SentryHttpLayer::with_transaction())
        .layer(compression_layer);

    info!("Starting server on {}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    info!("Server closed");
    Ok(())
}

fn sentry() -> Option<sentry::ClientInitGuard> {
    if let Ok(url) = std::env::var("SENTRY_URL") {
        return Some(sentry::init((
            url,
            sentry::ClientOptions {
                release: sentry::release_name!(),
                traces_sample_rate: 1.0,
                ..Default::default()
            },
        )));
    }
    None
}

pub(crate) fn logger() {
    let enabled: bool = std::env::var("STRUCTURED_LOGGING")
        .map(|s| s.parse::<bool>().unwrap_or(false))
        .unwrap_or(false);
    if enabled {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .event_format(Format::default().json())
                    .fmt_fields(JsonFields::new()),
            )
            .with(EnvFilter::from_default_env())
            .try_init()
            .ok();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(EnvFilter::from_default_env())
            .try_init()
            .ok();
    };
}

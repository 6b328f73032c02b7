#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web server for the SoF event extractor.
//!
//! Serves the upload page, accepts documents over multipart upload, and
//! serves the rendered HTML/JSON/CSV reports from the output directory.
//! Each upload is processed synchronously by the [`pipeline::Pipeline`]
//! before the response is sent.

pub mod config;
pub mod error;
mod handlers;
pub mod interactive;
pub mod pipeline;

use std::path::Path;
use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};

pub use config::ServerConfig;
pub use error::ApiError;
pub use pipeline::Pipeline;

/// URL path the output directory is served under.
pub const OUTPUTS_PATH: &str = "/outputs";

/// Shared application state.
pub struct AppState {
    /// Runtime configuration.
    pub config: ServerConfig,
    /// Upload processing.
    pub pipeline: Arc<Pipeline>,
}

/// Registers all routes. Stored reports are served from `output_dir`.
pub fn configure(cfg: &mut web::ServiceConfig, output_dir: &Path) {
    cfg.route("/", web::get().to(handlers::index))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(handlers::health))
                .route("/upload", web::post().to(handlers::api_upload)),
        )
        .route("/upload", web::post().to(handlers::form_upload))
        .route("/results/{id}", web::get().to(handlers::result))
        .service(Files::new(OUTPUTS_PATH, output_dir));
}

/// Starts the SoF event extractor server.
///
/// Loads the rule table, creates the staging directories, and starts the
/// Actix-Web HTTP server. The caller is responsible for initializing
/// logging and providing the async runtime (e.g. via
/// `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the rule table cannot be loaded,
/// the staging directories cannot be created, or the HTTP server fails to
/// bind or encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig) -> std::io::Result<()> {
    log::info!("Loading field rules...");
    let pipeline = Pipeline::from_config(&config).map_err(std::io::Error::other)?;

    log::info!("Preparing staging directories under {}", config.data_dir.display());
    pipeline.staging().ensure_dirs()?;

    let output_dir = config.staging().output_dir;
    let bind_addr = config.bind_addr.clone();
    let port = config.port;

    let state = web::Data::new(AppState {
        config,
        pipeline: Arc::new(pipeline),
    });

    log::info!("Starting server on {bind_addr}:{port}");

    HttpServer::new(move || {
        let cors = Cors::permissive();
        let output_dir = output_dir.clone();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(move |cfg| configure(cfg, &output_dir))
    })
    .bind((bind_addr, port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use actix_web::http::StatusCode;
    use actix_web::http::header::CONTENT_TYPE;
    use actix_web::{App, test};
    use sof_events_server_models::{ApiErrorBody, ApiHealth, UploadResponse};

    use super::*;

    const BOUNDARY: &str = "sofboundary";

    fn state(max_upload_bytes: usize) -> (PathBuf, web::Data<AppState>) {
        let (base, pipeline) = pipeline::tests::temp_pipeline();
        let config = ServerConfig {
            data_dir: base.clone(),
            max_upload_bytes,
            ..ServerConfig::default()
        };
        let state = web::Data::new(AppState {
            config,
            pipeline: Arc::new(pipeline),
        });
        (base, state)
    }

    fn multipart(filename: Option<&str>, content: &[u8]) -> Vec<u8> {
        let disposition = filename.map_or_else(
            || "form-data; name=\"note\"".to_owned(),
            |name| format!("form-data; name=\"file\"; filename=\"{name}\""),
        );
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: {disposition}\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn upload_request(uri: &str, filename: Option<&str>, content: &[u8]) -> test::TestRequest {
        test::TestRequest::post()
            .uri(uri)
            .insert_header((
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(multipart(filename, content))
    }

    macro_rules! app {
        ($state:expr, $base:expr) => {{
            let output_dir = $base.join("outputs");
            test::init_service(
                App::new()
                    .app_data($state.clone())
                    .configure(move |cfg| configure(cfg, &output_dir)),
            )
            .await
        }};
    }

    const SOF: &[u8] = b"Vessel: MV Example\nPort: Singapore\nOperation: Loading\n\
        Voyage 2023\n6. Loading commenced: 5th NOV @ 0700\n7. Loading completed: 6th NOV @ 1430\n";

    #[actix_web::test]
    async fn health_reports_version() {
        let (base, state) = state(1024);
        let app = app!(state, base);

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let health: ApiHealth = test::call_and_read_body_json(&app, req).await;
        assert!(health.healthy);
        assert_eq!(health.version, env!("CARGO_PKG_VERSION"));

        std::fs::remove_dir_all(base).unwrap();
    }

    #[actix_web::test]
    async fn index_serves_upload_form() {
        let (base, state) = state(1024);
        let app = app!(state, base);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = test::read_body(resp).await;
        assert!(std::str::from_utf8(&body).unwrap().contains("multipart/form-data"));

        std::fs::remove_dir_all(base).unwrap();
    }

    #[actix_web::test]
    async fn api_upload_returns_summary_and_links() {
        let (base, state) = state(1024 * 1024);
        let app = app!(state, base);

        let req = upload_request("/api/upload", Some("sof.txt"), SOF).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let upload: UploadResponse = test::read_body_json(resp).await;

        assert_eq!(upload.filename, "sof.txt");
        assert_eq!(upload.events_count, 2);
        assert!(upload.metadata.voyage_to.is_absent());
        assert_eq!(
            upload
                .summary
                .get(sof_events_document_models::EventField::Port)
                .as_found(),
            Some("Singapore")
        );
        assert_eq!(upload.links.html, format!("/results/{}", upload.id));

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(&upload.links.html).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = test::read_body(resp).await;
        assert!(std::str::from_utf8(&html).unwrap().contains("MV Example"));

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(&upload.links.csv).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let csv = test::read_body(resp).await;
        assert!(std::str::from_utf8(&csv)
            .unwrap()
            .contains("LOADING COMMENCED"));

        std::fs::remove_dir_all(base).unwrap();
    }

    #[actix_web::test]
    async fn form_upload_returns_html_report() {
        let (base, state) = state(1024 * 1024);
        let app = app!(state, base);

        let req = upload_request("/upload", Some("sof.txt"), SOF).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = test::read_body(resp).await;
        let html = std::str::from_utf8(&html).unwrap();
        assert!(html.contains("<table class=\"summary\">"));
        assert!(html.contains("2023-11-05T07:00:00"));
        assert!(html.contains("href=\"/outputs/sof_"));
        assert!(html.contains("<details class=\"raw-text\">"));

        std::fs::remove_dir_all(base).unwrap();
    }

    #[actix_web::test]
    async fn form_upload_errors_are_html() {
        let (base, state) = state(1024 * 1024);
        let app = app!(state, base);

        let req = upload_request("/upload", Some("photo.jpg"), b"\xFF\xD8\xFF").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let html = test::read_body(resp).await;
        assert!(std::str::from_utf8(&html)
            .unwrap()
            .contains("Could not process document"));

        std::fs::remove_dir_all(base).unwrap();
    }

    #[actix_web::test]
    async fn api_upload_error_statuses() {
        let (base, state) = state(64);
        let app = app!(state, base);

        let cases: [(Option<&str>, &[u8], StatusCode); 4] = [
            (None, b"just a note", StatusCode::BAD_REQUEST),
            (Some("photo.jpg"), b"\xFF\xD8\xFF", StatusCode::UNSUPPORTED_MEDIA_TYPE),
            (Some("blank.txt"), b"  \n \n", StatusCode::UNPROCESSABLE_ENTITY),
            (Some("big.txt"), &[b'a'; 65], StatusCode::PAYLOAD_TOO_LARGE),
        ];

        for (filename, content, status) in cases {
            let req = upload_request("/api/upload", filename, content).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), status, "{filename:?}");
            let body: ApiErrorBody = test::read_body_json(resp).await;
            assert!(!body.error.is_empty());
        }

        std::fs::remove_dir_all(base).unwrap();
    }

    #[actix_web::test]
    async fn unknown_results_are_not_found() {
        let (base, state) = state(1024);
        let app = app!(state, base);

        for uri in ["/results/sof_unknown", "/results/..%2Fsecret"] {
            let resp = test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{uri}");
        }

        std::fs::remove_dir_all(base).unwrap();
    }
}

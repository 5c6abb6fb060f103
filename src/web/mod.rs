use std::{convert::Infallible, sync::Arc};

use filters::api_filters;
use warp::{http::Method, http::StatusCode, reject::Rejection, Filter};

use crate::{
    conference::{db::ConferenceDb, settings::Settings},
    error::ErrorBody,
    uploads::UploadStore,
};

pub mod filters;
pub mod handlers;
pub mod multipart;

fn rejection_body(code: StatusCode, msg: String) -> warp::reply::WithStatus<warp::reply::Json> {
    warp::reply::with_status(
        warp::reply::json(&ErrorBody {
            message: code.canonical_reason().unwrap_or("Error").to_string(),
            error: msg,
        }),
        code,
    )
}

async fn handle_rejection(err: Rejection) -> Result<impl warp::Reply, Infallible> {
    let (code, msg) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(err) = err.find::<warp::filters::body::BodyDeserializeError>() {
        log::error!("{}", err);
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::PayloadTooLarge>() {
        log::error!("Payload Too Large: {}", err);
        (StatusCode::PAYLOAD_TOO_LARGE, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::LengthRequired>() {
        log::error!("Length Required: {}", err);
        (StatusCode::LENGTH_REQUIRED, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::UnsupportedMediaType>() {
        log::error!("Unsupported Media Type: {}", err);
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::MissingHeader>() {
        log::error!("Missing Header: {}", err);
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::InvalidHeader>() {
        log::error!("Invalid Header: {}", err);
        (StatusCode::BAD_REQUEST, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::MethodNotAllowed>() {
        log::error!("Method Not Allowed: {}", err);
        (StatusCode::METHOD_NOT_ALLOWED, err.to_string())
    } else if let Some(err) = err.find::<warp::reject::InvalidQuery>() {
        log::error!("Invalid Query: {}", err);
        (StatusCode::BAD_REQUEST, err.to_string())
    } else {
        log::error!("Unhandled Rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal Server Error".to_string(),
        )
    };

    Ok(rejection_body(code, msg))
}

/// All routes with rejections turned into Json error bodies
pub fn routes(
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
    settings: &Settings,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Infallible> + Clone {
    api_filters(db, uploads, settings.max_upload_bytes()).recover(handle_rejection)
}

pub async fn run_http_server(
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
    settings: Arc<Settings>,
) -> anyhow::Result<()> {
    let cors = warp::cors()
        .allow_headers(vec![
            "User-Agent",
            "Sec-Fetch-Mode",
            "Referer",
            "Origin",
            "Content-Type",
            "Access-Control-Allow-Origin",
            "Access-Control-Request-Method",
            "Access-Control-Request-Headers",
            "Access-Control-Allow-Headers",
        ])
        .allow_methods(&[
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let cors = if settings.allowed_origins.is_empty() {
        cors.allow_any_origin()
    } else {
        cors.allow_origins(settings.allowed_origins.iter().map(String::as_str))
    };

    let routes = routes(db, uploads, &settings)
        .with(cors)
        .with(warp::log("genvision::web"));

    log::info!("Listening on port {}", settings.port);
    warp::serve(routes).run(([0, 0, 0, 0], settings.port)).await;

    Ok(())
}

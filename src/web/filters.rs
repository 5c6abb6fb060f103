use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use warp::{http::StatusCode, multipart::FormData, reject::Rejection, Filter};

use crate::{
    conference::{admin::AdminInput, db::ConferenceDb, participant::ParticipantInput},
    error::ApiError,
    uploads::UploadStore,
};

use super::handlers::{self, to_http_deleted, to_http_output};

pub fn with_db(
    db: Arc<ConferenceDb>,
) -> impl Filter<Extract = (Arc<ConferenceDb>,), Error = Infallible> + Clone {
    warp::any().map(move || db.clone())
}

pub fn with_uploads(
    uploads: Arc<UploadStore>,
) -> impl Filter<Extract = (Arc<UploadStore>,), Error = Infallible> + Clone {
    warp::any().map(move || uploads.clone())
}

/// Largest accepted Json request body
const MAX_JSON_BYTES: u64 = 64 * 1024;

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone {
    warp::body::content_length_limit(MAX_JSON_BYTES).and(warp::body::json())
}

fn multipart(
    max_upload_bytes: u64,
) -> impl Filter<Extract = (FormData,), Error = Rejection> + Clone {
    warp::multipart::form().max_length(max_upload_bytes)
}

fn event_filters(
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let list_events = warp::path!("api" / "events")
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_events().await, StatusCode::OK, "Server Error")
        });

    let read_event = warp::path!("api" / "events" / i64)
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_event(id).await, StatusCode::OK, "Error fetching event")
        });

    let event_participants = warp::path!("api" / "events" / i64 / "participants")
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_output(
                db.get_participants_for_event(id).await,
                StatusCode::OK,
                "Error fetching participants",
            )
        });

    let create_event = warp::path!("api" / "events")
        .and(warp::post())
        .and(multipart(max_upload_bytes))
        .and(with_db(db.clone()))
        .and(with_uploads(uploads.clone()))
        .and_then(
            |form: FormData, db: Arc<ConferenceDb>, uploads: Arc<UploadStore>| async move {
                to_http_output(
                    handlers::create_event(form, db, uploads).await,
                    StatusCode::CREATED,
                    "Error creating event",
                )
            },
        );

    let update_event = warp::path!("api" / "events" / i64)
        .and(warp::put())
        .and(multipart(max_upload_bytes))
        .and(with_db(db.clone()))
        .and(with_uploads(uploads))
        .and_then(
            |id: i64, form: FormData, db: Arc<ConferenceDb>, uploads: Arc<UploadStore>| async move {
                to_http_output(
                    handlers::update_event(id, form, db, uploads).await,
                    StatusCode::OK,
                    "Error updating event",
                )
            },
        );

    let delete_event = warp::path!("api" / "events" / i64)
        .and(warp::delete())
        .and(with_db(db))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_deleted(db.delete_event(id).await, "Event")
        });

    list_events
        .or(read_event)
        .or(event_participants)
        .or(create_event)
        .or(update_event)
        .or(delete_event)
}

fn participant_filters(
    db: Arc<ConferenceDb>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let list_participants = warp::path!("api" / "participants")
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_participants().await, StatusCode::OK, "Server Error")
        });

    let read_participant = warp::path!("api" / "participants" / i64)
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_output(
                db.get_participant(id).await,
                StatusCode::OK,
                "Error fetching participant",
            )
        });

    let create_participant = warp::path!("api" / "participants")
        .and(warp::post())
        .and(json_body())
        .and(with_db(db.clone()))
        .and_then(|participant: ParticipantInput, db: Arc<ConferenceDb>| async move {
            let result = match participant.validate() {
                Ok(_) => db.add_participant(&participant).await.map_err(ApiError::from),
                Err(e) => Err(e),
            };
            to_http_output(result, StatusCode::CREATED, "Error registering participant")
        });

    let update_participant = warp::path!("api" / "participants" / i64)
        .and(warp::put())
        .and(json_body())
        .and(with_db(db.clone()))
        .and_then(
            |id: i64, participant: ParticipantInput, db: Arc<ConferenceDb>| async move {
                let result = match participant.validate() {
                    Ok(_) => db
                        .update_participant(id, &participant)
                        .await
                        .map_err(ApiError::from),
                    Err(e) => Err(e),
                };
                to_http_output(result, StatusCode::OK, "Error updating participant")
            },
        );

    let delete_participant = warp::path!("api" / "participants" / i64)
        .and(warp::delete())
        .and(with_db(db))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_deleted(db.delete_participant(id).await, "Participant")
        });

    list_participants
        .or(read_participant)
        .or(create_participant)
        .or(update_participant)
        .or(delete_participant)
}

fn guest_filters(
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let list_guests = warp::path!("api" / "guests")
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_guests().await, StatusCode::OK, "Server Error")
        });

    let read_guest = warp::path!("api" / "guests" / i64)
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_guest(id).await, StatusCode::OK, "Error fetching guest")
        });

    let create_guest = warp::path!("api" / "guests")
        .and(warp::post())
        .and(multipart(max_upload_bytes))
        .and(with_db(db.clone()))
        .and(with_uploads(uploads.clone()))
        .and_then(
            |form: FormData, db: Arc<ConferenceDb>, uploads: Arc<UploadStore>| async move {
                to_http_output(
                    handlers::create_guest(form, db, uploads).await,
                    StatusCode::CREATED,
                    "Error creating guest",
                )
            },
        );

    let update_guest = warp::path!("api" / "guests" / i64)
        .and(warp::put())
        .and(multipart(max_upload_bytes))
        .and(with_db(db.clone()))
        .and(with_uploads(uploads))
        .and_then(
            |id: i64, form: FormData, db: Arc<ConferenceDb>, uploads: Arc<UploadStore>| async move {
                to_http_output(
                    handlers::update_guest(id, form, db, uploads).await,
                    StatusCode::OK,
                    "Error updating guest",
                )
            },
        );

    let delete_guest = warp::path!("api" / "guests" / i64)
        .and(warp::delete())
        .and(with_db(db))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_deleted(db.delete_guest(id).await, "Guest")
        });

    list_guests
        .or(read_guest)
        .or(create_guest)
        .or(update_guest)
        .or(delete_guest)
}

fn coordinator_filters(
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let list_coordinators = warp::path!("api" / "coordinators")
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_coordinators().await, StatusCode::OK, "Server Error")
        });

    let read_coordinator = warp::path!("api" / "coordinators" / i64)
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_output(
                db.get_coordinator(id).await,
                StatusCode::OK,
                "Error fetching coordinator",
            )
        });

    let create_coordinator = warp::path!("api" / "coordinators")
        .and(warp::post())
        .and(multipart(max_upload_bytes))
        .and(with_db(db.clone()))
        .and(with_uploads(uploads.clone()))
        .and_then(
            |form: FormData, db: Arc<ConferenceDb>, uploads: Arc<UploadStore>| async move {
                to_http_output(
                    handlers::create_coordinator(form, db, uploads).await,
                    StatusCode::CREATED,
                    "Error creating coordinator",
                )
            },
        );

    let update_coordinator = warp::path!("api" / "coordinators" / i64)
        .and(warp::put())
        .and(multipart(max_upload_bytes))
        .and(with_db(db.clone()))
        .and(with_uploads(uploads))
        .and_then(
            |id: i64, form: FormData, db: Arc<ConferenceDb>, uploads: Arc<UploadStore>| async move {
                to_http_output(
                    handlers::update_coordinator(id, form, db, uploads).await,
                    StatusCode::OK,
                    "Error updating coordinator",
                )
            },
        );

    let delete_coordinator = warp::path!("api" / "coordinators" / i64)
        .and(warp::delete())
        .and(with_db(db))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_deleted(db.delete_coordinator(id).await, "Coordinator")
        });

    list_coordinators
        .or(read_coordinator)
        .or(create_coordinator)
        .or(update_coordinator)
        .or(delete_coordinator)
}

fn admin_filters(
    db: Arc<ConferenceDb>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let list_admins = warp::path!("api" / "admin")
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_admins().await, StatusCode::OK, "Server Error")
        });

    let read_admin = warp::path!("api" / "admin" / i64)
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_admin(id).await, StatusCode::OK, "Error fetching admin")
        });

    let create_admin = warp::path!("api" / "admin")
        .and(warp::post())
        .and(json_body())
        .and(with_db(db.clone()))
        .and_then(|admin: AdminInput, db: Arc<ConferenceDb>| async move {
            let result = match admin.validate() {
                Ok(_) => db.add_admin(&admin).await.map_err(ApiError::from),
                Err(e) => Err(e),
            };
            to_http_output(result, StatusCode::CREATED, "Error creating admin")
        });

    let update_admin = warp::path!("api" / "admin" / i64)
        .and(warp::put())
        .and(json_body())
        .and(with_db(db.clone()))
        .and_then(|id: i64, admin: AdminInput, db: Arc<ConferenceDb>| async move {
            let result = match admin.validate() {
                Ok(_) => db.update_admin(id, &admin).await.map_err(ApiError::from),
                Err(e) => Err(e),
            };
            to_http_output(result, StatusCode::OK, "Error updating admin")
        });

    let delete_admin = warp::path!("api" / "admin" / i64)
        .and(warp::delete())
        .and(with_db(db))
        .and_then(|id: i64, db: Arc<ConferenceDb>| async move {
            to_http_deleted(db.delete_admin(id).await, "Admin")
        });

    list_admins
        .or(read_admin)
        .or(create_admin)
        .or(update_admin)
        .or(delete_admin)
}

fn about_filters(
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let read_about = warp::path!("api" / "about")
        .and(warp::get())
        .and(with_db(db.clone()))
        .and_then(|db: Arc<ConferenceDb>| async move {
            to_http_output(db.get_or_create_about().await, StatusCode::OK, "Server Error")
        });

    let update_about = warp::path!("api" / "about" / "update")
        .and(warp::put())
        .and(multipart(max_upload_bytes))
        .and(with_db(db))
        .and(with_uploads(uploads))
        .and_then(
            |form: FormData, db: Arc<ConferenceDb>, uploads: Arc<UploadStore>| async move {
                to_http_output(
                    handlers::update_about(form, db, uploads).await,
                    StatusCode::OK,
                    "Error updating about",
                )
            },
        );

    read_about.or(update_about)
}

pub fn api_filters(
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
    max_upload_bytes: u64,
) -> impl Filter<Extract = (impl warp::Reply,), Error = Rejection> + Clone {
    let media = warp::path("uploads").and(warp::fs::dir(uploads.root().to_path_buf()));

    event_filters(db.clone(), uploads.clone(), max_upload_bytes)
        .or(participant_filters(db.clone()))
        .or(guest_filters(db.clone(), uploads.clone(), max_upload_bytes))
        .or(coordinator_filters(db.clone(), uploads.clone(), max_upload_bytes))
        .or(admin_filters(db.clone()))
        .or(about_filters(db, uploads, max_upload_bytes))
        .or(media)
}

use std::{convert::Infallible, sync::Arc};

use serde::Serialize;
use warp::{http::StatusCode, multipart::FormData};

use crate::{
    conference::{
        about::{About, AboutUpdate, AboutUploads},
        coordinator::{Coordinator, CoordinatorInput},
        db::ConferenceDb,
        event::{Event, EventInput},
        guest::{Guest, GuestInput},
    },
    error::ApiError,
    uploads::{UploadCategory, UploadStore, UploadedFile},
};

use super::multipart::{MultipartForm, SPONSOR_LOGO_PREFIX};

/// A Json struct for plain status replies
#[derive(Serialize, Debug)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: &str) -> Self {
        Message {
            message: message.to_owned(),
        }
    }
}

/// Render a result as Json, using `context` as the message of an error body.
pub fn to_http_output<T: Serialize, E: Into<ApiError>>(
    result: Result<T, E>,
    status: StatusCode,
    context: &str,
) -> Result<impl warp::Reply, Infallible> {
    match result {
        Ok(data) => Ok(warp::reply::with_status(warp::reply::json(&data), status)),
        Err(e) => {
            let e: ApiError = e.into();
            log::warn!("{}: {}", context, e);
            Ok(warp::reply::with_status(
                warp::reply::json(&e.body(context)),
                e.status(),
            ))
        }
    }
}

pub fn to_http_deleted<E: Into<ApiError>>(
    result: Result<(), E>,
    what: &str,
) -> Result<impl warp::Reply, Infallible> {
    to_http_output(
        result.map(|_| Message::new(&format!("{} deleted", what))),
        StatusCode::OK,
        &format!("Error deleting {}", what.to_lowercase()),
    )
}

/// Store the `image` part of a form, if one was sent.
async fn store_image(
    uploads: &UploadStore,
    category: UploadCategory,
    form: &MultipartForm,
) -> Result<Option<String>, ApiError> {
    match form.file("image") {
        Some(file) => Ok(Some(uploads.store(category, file).await?)),
        None => Ok(None),
    }
}

/// Remove a freshly stored image when the record that referenced it failed to save.
async fn discard_on_error<T>(
    result: anyhow::Result<T>,
    uploads: &UploadStore,
    image: Option<String>,
) -> Result<T, ApiError> {
    if result.is_err() {
        uploads.discard(image.as_slice()).await;
    }
    Ok(result?)
}

fn event_input(form: &MultipartForm) -> Result<EventInput, ApiError> {
    let input = EventInput {
        name: form.required_text("name")?,
        description: form.optional_text("description"),
        date: form.optional_text("date"),
        venue: form.optional_text("venue"),
    };
    input.validate()?;
    Ok(input)
}

fn guest_input(form: &MultipartForm) -> Result<GuestInput, ApiError> {
    let input = GuestInput {
        name: form.required_text("name")?,
        designation: form.optional_text("designation"),
        description: form.optional_text("description"),
        contact: form.optional_text("contact"),
    };
    input.validate()?;
    Ok(input)
}

fn coordinator_input(form: &MultipartForm) -> Result<CoordinatorInput, ApiError> {
    let input = CoordinatorInput {
        name: form.required_text("name")?,
        designation: form.optional_text("designation"),
        contact: form.optional_text("contact"),
    };
    input.validate()?;
    Ok(input)
}

pub async fn create_event(
    form: FormData,
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
) -> Result<Event, ApiError> {
    let form = MultipartForm::read(form).await?;
    let input = event_input(&form)?;
    let image = store_image(&uploads, UploadCategory::Events, &form).await?;

    let result = db.add_event(&input, image.as_deref()).await;
    discard_on_error(result, &uploads, image).await
}

pub async fn update_event(
    id: i64,
    form: FormData,
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
) -> Result<Event, ApiError> {
    let form = MultipartForm::read(form).await?;
    let input = event_input(&form)?;
    let image = store_image(&uploads, UploadCategory::Events, &form).await?;

    let result = db.update_event(id, &input, image.as_deref()).await;
    discard_on_error(result, &uploads, image).await
}

pub async fn create_guest(
    form: FormData,
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
) -> Result<Guest, ApiError> {
    let form = MultipartForm::read(form).await?;
    let input = guest_input(&form)?;
    let image = store_image(&uploads, UploadCategory::Guests, &form).await?;

    let result = db.add_guest(&input, image.as_deref()).await;
    discard_on_error(result, &uploads, image).await
}

pub async fn update_guest(
    id: i64,
    form: FormData,
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
) -> Result<Guest, ApiError> {
    let form = MultipartForm::read(form).await?;
    let input = guest_input(&form)?;
    let image = store_image(&uploads, UploadCategory::Guests, &form).await?;

    let result = db.update_guest(id, &input, image.as_deref()).await;
    discard_on_error(result, &uploads, image).await
}

pub async fn create_coordinator(
    form: FormData,
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
) -> Result<Coordinator, ApiError> {
    let form = MultipartForm::read(form).await?;
    let input = coordinator_input(&form)?;
    let image = store_image(&uploads, UploadCategory::Coordinators, &form).await?;

    let result = db.add_coordinator(&input, image.as_deref()).await;
    discard_on_error(result, &uploads, image).await
}

pub async fn update_coordinator(
    id: i64,
    form: FormData,
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
) -> Result<Coordinator, ApiError> {
    let form = MultipartForm::read(form).await?;
    let input = coordinator_input(&form)?;
    let image = store_image(&uploads, UploadCategory::Coordinators, &form).await?;

    let result = db.update_coordinator(id, &input, image.as_deref()).await;
    discard_on_error(result, &uploads, image).await
}

/// Handles `PUT /api/about/update`.
///
/// Every text field is decoded and every logo is matched to a sponsor before
/// anything is written to disk.
pub async fn update_about(
    form: FormData,
    db: Arc<ConferenceDb>,
    uploads: Arc<UploadStore>,
) -> Result<About, ApiError> {
    let form = MultipartForm::read(form).await?;

    let update = AboutUpdate::decode(
        form.text("description"),
        form.text("schedule"),
        form.text("sponsors"),
    )?;

    let positional_logos = form.files("sponsorFiles");
    let keyed_logos = form.keyed_files(SPONSOR_LOGO_PREFIX);
    let keys: Vec<String> = keyed_logos.iter().map(|(key, _)| key.clone()).collect();
    let targets = update.logo_targets(positional_logos.len(), &keys)?;

    let poster = form.file("poster");
    let gallery = form.files("gallery");

    let mut files: Vec<&UploadedFile> = poster.into_iter().collect();
    files.extend(gallery.iter().copied());
    files.extend(positional_logos.iter().copied());
    files.extend(keyed_logos.iter().map(|(_, file)| *file));

    let paths = uploads.store_all(UploadCategory::About, &files).await?;

    let mut stored_paths = paths.iter().cloned();
    let poster_path = match poster {
        Some(_) => stored_paths.next(),
        None => None,
    };
    let gallery_paths: Vec<String> = stored_paths.by_ref().take(gallery.len()).collect();
    let stored = AboutUploads {
        poster: poster_path,
        gallery: gallery_paths,
        sponsor_logos: targets.into_iter().zip(stored_paths).collect(),
    };

    match db.update_about(update, stored).await {
        Ok(about) => {
            log::info!(
                "About page updated ({} new files, {} gallery images, {} sponsors)",
                paths.len(),
                about.gallery.len(),
                about.sponsors.len()
            );
            Ok(about)
        }
        Err(e) => {
            uploads.discard(&paths).await;
            Err(e.into())
        }
    }
}

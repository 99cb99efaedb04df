//! Package handlers: list/search, registration, status transitions,
//! photos, and sticker deep links.

use axum::Json;
use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use uuid::Uuid;

use mailroom_core::error::AppError;
use mailroom_core::types::pagination::{PageRequest, PageResponse};
use mailroom_database::repositories::package::{PackageFilters, PackageSummary};
use mailroom_entity::package::{CreatePackage, Package};
use mailroom_service::package::PackageDetail;
use mailroom_service::settings::SettingsService;

use crate::dto::request::{PackageListQuery, StatusUpdateForm};
use crate::dto::response::{FormPage, PackageLink};
use crate::dto::{parse_date_from, parse_date_to};
use crate::extractors::{Csrf, CurrentUser};
use crate::state::AppState;

/// GET /packages — search projection.
pub async fn list(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(query): Query<PackageListQuery>,
) -> Result<Json<PageResponse<PackageSummary>>, AppError> {
    let filters = filters_from(&query)?;
    let page = PageRequest::new(query.page.unwrap_or(1), query.limit.unwrap_or(25));
    Ok(Json(state.package_service.search(filters, page).await?))
}

/// GET /packages/new — registration page shell.
pub async fn new_page(_user: CurrentUser, csrf: Csrf) -> Json<FormPage> {
    Json(FormPage {
        csrf_token: csrf.token().to_string(),
    })
}

/// POST /packages/new — multipart form: package fields plus an optional
/// photo, validated from content bytes.
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    mut multipart: Multipart,
) -> Result<Json<Package>, AppError> {
    let mut tracking_no = None;
    let mut carrier = None;
    let mut recipient_id = None;
    let mut notes = None;
    let mut csrf_token = None;
    let mut photo: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "tracking_no" => tracking_no = Some(read_text(field).await?),
            "carrier" => carrier = Some(read_text(field).await?),
            "recipient_id" => {
                let raw = read_text(field).await?;
                recipient_id = Some(
                    Uuid::parse_str(raw.trim())
                        .map_err(|_| AppError::validation("Invalid recipient id"))?,
                );
            }
            "notes" => {
                let raw = read_text(field).await?;
                if !raw.trim().is_empty() {
                    notes = Some(raw);
                }
            }
            "csrf_token" => csrf_token = Some(read_text(field).await?),
            "photo" => {
                let filename = field
                    .file_name()
                    .unwrap_or("photo.jpg")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read upload: {e}")))?;
                if !bytes.is_empty() {
                    photo = Some((filename, bytes.to_vec()));
                }
            }
            _ => {}
        }
    }

    csrf.verify_form(&csrf_token.unwrap_or_default())?;

    let data = CreatePackage {
        tracking_no: tracking_no.ok_or_else(|| AppError::validation("Tracking number is required"))?,
        carrier: carrier.ok_or_else(|| AppError::validation("Carrier is required"))?,
        recipient_id: recipient_id.ok_or_else(|| AppError::validation("Recipient is required"))?,
        notes,
    };

    let package = state
        .package_service
        .register(data, photo, &user.user, user.ip())
        .await?;
    Ok(Json(package))
}

/// GET /packages/{id} — detail with timeline and attachments.
pub async fn detail(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<PackageDetail>, AppError> {
    state
        .package_service
        .detail(id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Package not found"))
}

/// POST /packages/{id}/status — lifecycle transition.
pub async fn update_status(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    Path(id): Path<Uuid>,
    axum::Form(form): axum::Form<StatusUpdateForm>,
) -> Result<Json<Package>, AppError> {
    csrf.verify_form(&form.csrf_token)?;
    let package = state
        .package_service
        .update_status(id, form.status, form.notes, &user.user, user.ip())
        .await?;
    Ok(Json(package))
}

/// POST /packages/{id}/photo — attach a photo to an existing package.
pub async fn attach_photo(
    State(state): State<AppState>,
    user: CurrentUser,
    csrf: Csrf,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<Json<mailroom_entity::attachment::Attachment>, AppError> {
    let mut csrf_token = None;
    let mut photo: Option<(String, Vec<u8>)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart body: {e}")))?
    {
        match field.name().unwrap_or_default() {
            "csrf_token" => csrf_token = Some(read_text(field).await?),
            "photo" => {
                let filename = field.file_name().unwrap_or("photo.jpg").to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::validation(format!("Failed to read upload: {e}")))?;
                photo = Some((filename, bytes.to_vec()));
            }
            _ => {}
        }
    }

    csrf.verify_form(&csrf_token.unwrap_or_default())?;
    let (filename, content) =
        photo.ok_or_else(|| AppError::validation("A photo file is required"))?;

    let attachment = state
        .package_service
        .attach_photo(id, filename, content, &user.user)
        .await?;
    Ok(Json(attachment))
}

/// GET /packages/{id}/qrcode/download — the deep link the printable
/// sticker encodes. Rasterization happens client-side.
pub async fn qrcode_download(
    state: State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    path: Path<Uuid>,
) -> Result<Json<PackageLink>, AppError> {
    package_link(state, user, headers, path).await
}

/// GET /packages/{id}/qrcode/print — same payload for the print view.
pub async fn qrcode_print(
    state: State<AppState>,
    user: CurrentUser,
    headers: HeaderMap,
    path: Path<Uuid>,
) -> Result<Json<PackageLink>, AppError> {
    package_link(state, user, headers, path).await
}

async fn package_link(
    State(state): State<AppState>,
    _user: CurrentUser,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<PackageLink>, AppError> {
    let package = state
        .package_service
        .get(id)
        .await?
        .ok_or_else(|| AppError::not_found("Package not found"))?;

    // Configured base wins; otherwise fall back to the requesting host.
    let base = match state.settings_service.qr_base_url().await? {
        Some(base) => base,
        None => {
            let host = headers
                .get("host")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("localhost");
            let scheme = if state.config.is_production() {
                "https"
            } else {
                "http"
            };
            format!("{scheme}://{host}")
        }
    };

    Ok(Json(PackageLink {
        package_id: package.id,
        tracking_no: package.tracking_no,
        url: SettingsService::package_link(&base, package.id),
    }))
}

fn filters_from(query: &PackageListQuery) -> Result<PackageFilters, AppError> {
    Ok(PackageFilters {
        query: query.q.clone().filter(|q| !q.trim().is_empty()),
        status: query.status,
        department: query.department.clone().filter(|d| !d.trim().is_empty()),
        date_from: parse_date_from(query.date_from.as_deref())?,
        date_to: parse_date_to(query.date_to.as_deref())?,
        recipient_id: None,
        created_by: None,
    })
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> Result<String, AppError> {
    field
        .text()
        .await
        .map_err(|e| AppError::validation(format!("Malformed multipart field: {e}")))
}

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::{Multipart, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::Json;
use chrono::Utc;
use profile_database::{DbError, ProfileStore};
use profile_service::parser::form::{FieldError, ProfileForm};
use profile_service::parser::profile::{Avatar, NewProfileRecord, User, UserProfile};
use profile_storage::avatar_key;
use tracing::{info, warn};

use crate::auth::{authenticate, AuthClaims};
use crate::error::{ApiError, PERMISSION_DENIED, PROFILE_EXISTS, USER_NOT_FOUND};
use crate::server::AppState;

const NOT_UTF8: &str = "Input should be a valid UTF-8 string";

fn persistence(e: DbError) -> ApiError {
    ApiError::PersistenceError(e.to_string())
}

fn multipart_error(e: impl std::fmt::Display) -> ApiError {
    ApiError::BadRequest(format!("Multipart error: {e}"))
}

/// A body cut off by the size limit is an oversized avatar, not broken framing.
fn read_error(e: MultipartError, max_avatar_bytes: usize) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        warn!(error = %e, "Request body over the limit");
        return ApiError::InvalidInput(vec![FieldError::value(
            "avatar",
            format!("Image size exceeds {max_avatar_bytes} bytes."),
        )]);
    }
    multipart_error(e)
}

fn authorization(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
}

/// Resolves the caller from `claims` and applies the self-or-admin rule
/// against `target_user_id`.
fn authorize<T: ProfileStore>(state: &AppState<T>, claims: &AuthClaims, target_user_id: i64) -> Result<User, ApiError> {
    let user = state
        .database
        .get_user_by_id(claims.user_id)
        .map_err(persistence)?
        .filter(|user| user.is_active)
        .ok_or_else(|| ApiError::Unauthorized(USER_NOT_FOUND.to_string()))?;

    if !user.can_manage(target_user_id) {
        warn!(user_id = user.id, target_user_id, "Permission denied");
        return Err(ApiError::Forbidden(PERMISSION_DENIED.to_string()));
    }

    Ok(user)
}

fn text_slot<'a>(form: &'a mut ProfileForm, name: &str) -> Option<&'a mut Option<String>> {
    match name {
        "first_name" => Some(&mut form.first_name),
        "last_name" => Some(&mut form.last_name),
        "gender" => Some(&mut form.gender),
        "date_of_birth" => Some(&mut form.date_of_birth),
        "info" => Some(&mut form.info),
        _ => None,
    }
}

async fn read_form(mut multipart: Multipart, max_avatar_bytes: usize) -> Result<ProfileForm, ApiError> {
    let mut form = ProfileForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| read_error(e, max_avatar_bytes))?
    {
        let name = field.name().unwrap_or("").to_string();

        if name == "avatar" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let data = field.bytes().await.map_err(|e| read_error(e, max_avatar_bytes))?;

            // browsers send an empty part when no file was picked
            if !data.is_empty() {
                form.avatar = Some(Avatar {
                    content_type,
                    data: data.to_vec(),
                });
            }
            continue;
        }

        if text_slot(&mut form, &name).is_none() {
            continue;
        }

        let data = field.bytes().await.map_err(|e| read_error(e, max_avatar_bytes))?;
        match String::from_utf8(data.to_vec()) {
            Ok(text) => {
                if let Some(slot) = text_slot(&mut form, &name) {
                    *slot = Some(text);
                }
            }
            Err(_) => form.reject(&name, NOT_UTF8),
        }
    }

    Ok(form)
}

/// `POST /users/{user_id}/profile/`
pub async fn create_profile<T: ProfileStore>(
    State(state): State<AppState<T>>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<UserProfile>), ApiError> {
    // authentication comes before the body is even looked at
    let claims = authenticate(authorization(&headers), state.tokens.as_ref())?;

    let form = read_form(multipart.map_err(multipart_error)?, state.max_avatar_bytes).await?;
    let new_profile = form
        .validate(Utc::now().date_naive(), state.max_avatar_bytes)
        .map_err(ApiError::InvalidInput)?;

    let current_user = authorize(&state, &claims, user_id)?;

    // Early answer only; the insert below is what actually guards uniqueness.
    if state.database.profile_exists_for_user(user_id).map_err(persistence)? {
        return Err(ApiError::Conflict(PROFILE_EXISTS.to_string()));
    }

    let target = state.database.get_user_by_id(user_id).map_err(persistence)?;
    if !target.is_some_and(|user| user.is_active) {
        return Err(ApiError::Unauthorized(USER_NOT_FOUND.to_string()));
    }

    let key = avatar_key(user_id);
    let avatar = new_profile.avatar;
    let record = NewProfileRecord {
        user_id,
        first_name: new_profile.first_name,
        last_name: new_profile.last_name,
        gender: new_profile.gender,
        date_of_birth: new_profile.date_of_birth,
        info: new_profile.info,
        avatar: key.clone(),
    };

    // The row is claimed before the object is written, so only the request
    // that owns the row ever writes to the shared key.
    let mut profile = state.database.create_profile(record).map_err(|e| match e {
        DbError::ProfileExists(_) => ApiError::Conflict(PROFILE_EXISTS.to_string()),
        e => persistence(e),
    })?;

    if let Err(e) = state.storage.upload(&key, avatar.data, &avatar.content_type).await {
        match state.database.delete_profile(user_id) {
            Ok(_) => {}
            Err(cleanup) => warn!(user_id, error = %cleanup, "Failed to release profile after upload error"),
        }
        return Err(ApiError::UploadError(e.to_string()));
    }

    info!(user_id, profile_id = profile.id, by = current_user.id, "Profile created");

    profile.avatar = state.storage.resolve_url(&profile.avatar);
    Ok((StatusCode::CREATED, Json(profile)))
}

/// `GET /users/{user_id}/profile/`
pub async fn get_profile<T: ProfileStore>(
    State(state): State<AppState<T>>,
    Path(user_id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<UserProfile>, ApiError> {
    let claims = authenticate(authorization(&headers), state.tokens.as_ref())?;
    authorize(&state, &claims, user_id)?;

    let mut profile = state
        .database
        .get_profile_by_user(user_id)
        .map_err(persistence)?
        .ok_or_else(|| ApiError::NotFound("Profile not found.".to_string()))?;

    profile.avatar = state.storage.resolve_url(&profile.avatar);
    Ok(Json(profile))
}

//! File metadata and upload endpoints

use futures_util::TryStreamExt;
use warp::filters::multipart::{FormData, Part};
use warp::filters::BoxedFilter;
use warp::http::StatusCode;
use warp::reply::Response;
use warp::{Buf, Filter, Reply};

use super::filters::{json_response, message_response, reject, with_auth, with_state, AuthContext, HandlerResult};
use crate::auth::Permission;
use crate::core::SharedAppState;
use crate::error::{Result, SiteWorkError};
use crate::models::FileQuery;
use crate::services::UploadedFile;

/// Room for multipart boundaries and the project_id field on top of the file itself
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;
const MAX_FIELD_BYTES: u64 = 1024;

pub fn routes(state: SharedAppState) -> BoxedFilter<(Response,)> {
    let form_limit = state.files.max_upload_bytes().saturating_add(MULTIPART_OVERHEAD_BYTES);

    let list = warp::path!("files")
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(warp::query::<FileQuery>())
        .and(with_state(state.clone()))
        .and_then(list_files);

    let upload = warp::path!("files" / "upload")
        .and(warp::post())
        .and(with_auth(state.clone()))
        .and(warp::multipart::form().max_length(form_limit))
        .and(with_state(state.clone()))
        .and_then(upload_file);

    let get = warp::path!("files" / String)
        .and(warp::get())
        .and(with_auth(state.clone()))
        .and(with_state(state.clone()))
        .and_then(get_file);

    let delete = warp::path!("files" / String)
        .and(warp::delete())
        .and(with_auth(state.clone()))
        .and(with_state(state))
        .and_then(delete_file);

    list.or(upload)
        .unify()
        .or(get)
        .unify()
        .or(delete)
        .unify()
        .boxed()
}

async fn list_files(auth: AuthContext, query: FileQuery, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ReadFiles)
        .await
        .map_err(reject)?;
    let files = state.files.list(&user, &query).await.map_err(reject)?;
    Ok(warp::reply::json(&files).into_response())
}

async fn get_file(id: String, auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::ReadFiles)
        .await
        .map_err(reject)?;
    let file = state.files.get(&user, &id).await.map_err(reject)?;
    Ok(warp::reply::json(&file).into_response())
}

async fn upload_file(auth: AuthContext, form: FormData, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::UploadFiles)
        .await
        .map_err(reject)?;

    let (file, project_id) = read_upload_form(form, state.files.max_upload_bytes())
        .await
        .map_err(reject)?;
    let record = state
        .files
        .upload(&user, file, project_id)
        .await
        .map_err(reject)?;
    Ok(json_response(&record, StatusCode::CREATED))
}

async fn delete_file(id: String, auth: AuthContext, state: SharedAppState) -> HandlerResult {
    let user = state
        .authorizer
        .require_permission(&auth.user_id, Permission::UploadFiles)
        .await
        .map_err(reject)?;
    state.files.delete(&user, &id).await.map_err(reject)?;
    Ok(message_response("File deleted", StatusCode::OK))
}

/// Pull the `file` part and optional `project_id` field out of a multipart form.
/// Each part is read to the end before the next one is requested.
async fn read_upload_form(form: FormData, max_file_bytes: u64) -> Result<(UploadedFile, Option<String>)> {
    futures_util::pin_mut!(form);

    let mut file = None;
    let mut project_id = None;
    while let Some(part) = form.try_next().await.map_err(invalid_form)? {
        let name = part.name().to_string();
        match name.as_str() {
            "file" => {
                let file_name = part.filename().unwrap_or("upload").to_string();
                let mime_type = part.content_type().map(str::to_string);
                let bytes = read_part(part, max_file_bytes).await?;
                file = Some(UploadedFile {
                    file_name,
                    mime_type,
                    bytes,
                });
            }
            "project_id" => {
                let bytes = read_part(part, MAX_FIELD_BYTES).await?;
                let value = String::from_utf8(bytes)
                    .map_err(|_| SiteWorkError::invalid_field("project_id", "project_id must be UTF-8"))?;
                project_id = Some(value.trim().to_string()).filter(|v| !v.is_empty());
            }
            other => {
                log::debug!("Ignoring unexpected multipart field '{}'", other);
                read_part(part, MAX_FIELD_BYTES).await?;
            }
        }
    }

    let file = file.ok_or_else(|| SiteWorkError::invalid_field("file", "A file is required"))?;
    Ok((file, project_id))
}

fn invalid_form(e: warp::Error) -> SiteWorkError {
    SiteWorkError::BadRequest(format!("Invalid multipart form: {}", e))
}

/// Read a part's body, failing as soon as it grows past `limit`
async fn read_part(part: Part, limit: u64) -> Result<Vec<u8>> {
    let stream = part.stream();
    futures_util::pin_mut!(stream);

    let mut bytes = Vec::new();
    while let Some(mut chunk) = stream.try_next().await.map_err(invalid_form)? {
        while chunk.has_remaining() {
            let slice = chunk.chunk();
            let len = slice.len();
            bytes.extend_from_slice(slice);
            chunk.advance(len);
        }
        if bytes.len() as u64 > limit {
            return Err(SiteWorkError::PayloadTooLarge(limit));
        }
    }
    Ok(bytes)
}

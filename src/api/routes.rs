use std::convert::Infallible;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures_util::{Stream, TryStreamExt};
use serde::Serialize;
use warp::{
    filters::BoxedFilter,
    http::StatusCode,
    reject::Rejection,
    reply::{self, Response},
    Filter, Reply,
};

use crate::{
    api::{openapi, recipes, taxonomy, users},
    constants::MAX_JSON_BODY_BYTES,
    database::{form::Form, schema::Taxonomy},
    error::{handle_rejection, ApiResult, Error, HtmlError},
    state::AppState,
};

pub fn json_response<T: Serialize>(value: &T, status: StatusCode) -> Response {
    reply::with_status(reply::json(value), status).into_response()
}

pub fn no_content() -> Response {
    StatusCode::NO_CONTENT.into_response()
}

/// Turns a handler outcome into a response. Handler errors never become
/// rejections so that they are not mixed with the routing ones.
pub fn respond(result: ApiResult<Response>) -> Result<Response, Rejection> {
    Ok(result.into_response())
}

fn too_large() -> Error {
    HtmlError::PayloadTooLarge.new(format!("Request body exceeds {MAX_JSON_BODY_BYTES} bytes."))
}

/// Raw request body, refused with 413 once it grows above the JSON limit.
/// A declared `content-length` is checked before anything is read; bodies
/// without one are counted while they stream in.
pub fn json_body() -> impl Filter<Extract = (Bytes,), Error = Rejection> + Clone {
    warp::header::optional::<u64>("content-length")
        .and_then(|length: Option<u64>| async move {
            match length {
                Some(length) if length > MAX_JSON_BODY_BYTES => {
                    Err(warp::reject::custom(too_large()))
                }
                _ => Ok(()),
            }
        })
        .untuple_one()
        .and(warp::body::stream())
        .and_then(collect_json_body)
}

async fn collect_json_body<S, B>(body: S) -> Result<Bytes, Rejection>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    read_limited(body, MAX_JSON_BODY_BYTES)
        .await
        .map_err(warp::reject::custom)
}

/// Buffers `body`, failing as soon as more than `limit` bytes have arrived.
pub async fn read_limited<S, B>(body: S, limit: u64) -> Result<Bytes, Error>
where
    S: Stream<Item = Result<B, warp::Error>>,
    B: Buf,
{
    futures_util::pin_mut!(body);
    let mut buffer = BytesMut::new();

    while let Some(chunk) = body.try_next().await.map_err(|e| {
        log::debug!("Failed to read request body: {e}");
        HtmlError::InvalidRequest.new("Request body could not be read.")
    })? {
        if (buffer.len() + chunk.remaining()) as u64 > limit {
            return Err(too_large());
        }
        buffer.put(chunk);
    }

    Ok(buffer.freeze())
}

pub fn parse_form(body: &[u8]) -> Result<Form, Error> {
    Form::from_slice(body).map_err(Error::from)
}

pub fn api(state: AppState) -> BoxedFilter<(Response,)> {
    let user = warp::path!("api" / "user" / ..).and(users::routes(state.clone()));

    let recipe = warp::path!("api" / "recipe" / ..).and(
        recipes::routes(state.clone())
            .or(taxonomy::routes(Taxonomy::Tag, state.clone()))
            .unify()
            .or(taxonomy::routes(Taxonomy::Ingredient, state))
            .unify(),
    );

    user.or(recipe)
        .unify()
        .or(openapi::routes())
        .unify()
        .boxed()
}

pub fn media(state: &AppState) -> BoxedFilter<(Response,)> {
    warp::path("media")
        .and(warp::get())
        .and(warp::fs::dir(state.media.root().to_path_buf()))
        .map(|file: warp::fs::File| file.into_response())
        .boxed()
}

/// The complete application: API, media files, error rendering and access
/// logging.
pub fn app(state: AppState) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let media = media(&state);

    api(state)
        .or(media)
        .unify()
        .recover(handle_rejection)
        .with(warp::log("recipe_api::http"))
}

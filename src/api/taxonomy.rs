use bytes::Bytes;
use warp::{
    http::{Method, StatusCode},
    reject::Rejection,
    reply::Response,
    Filter,
};

use crate::{
    api::{
        query::{self, QueryParams},
        routes::{json_body, json_response, no_content, parse_form, respond},
        serializers,
    },
    authentication::middleware::with_session,
    database::{
        schema::{Id, Taxonomy, User},
        store::TaxonomyStore,
    },
    error::{ApiResult, Error, HtmlError},
    state::{with_state, AppState},
};

/// Collection and item endpoints of one taxonomy kind, e.g. `/tags` and
/// `/tags/{id}`.
pub fn routes(
    kind: Taxonomy,
    state: AppState,
) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let collection_route = warp::path(kind.path_segment())
        .and(warp::path::end())
        .and(warp::method())
        .and(with_session(state.clone()))
        .and(warp::query::<QueryParams>())
        .and(with_state(state.clone()))
        .and_then(
            move |method: Method, user: User, params: QueryParams, state: AppState| {
                collection(kind, method, user, params, state)
            },
        );

    let item_route = warp::path(kind.path_segment())
        .and(warp::path::param::<Id>())
        .and(warp::path::end())
        .and(warp::method())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state))
        .and_then(
            move |id: Id, method: Method, user: User, body: Bytes, state: AppState| {
                item(kind, id, method, user, body, state)
            },
        );

    collection_route.or(item_route).unify()
}

async fn collection(
    kind: Taxonomy,
    method: Method,
    user: User,
    params: QueryParams,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = match method {
        Method::GET => list(kind, &user, &params, &state).await,
        other => Err(Error::method_not_allowed(&other)),
    };
    respond(result)
}

async fn list(
    kind: Taxonomy,
    user: &User,
    params: &QueryParams,
    state: &AppState,
) -> ApiResult<Response> {
    let assigned_only = query::assigned_only(params)?;
    let items = state.store.list_items(kind, user.id, assigned_only).await?;

    Ok(json_response(&items, StatusCode::OK))
}

async fn item(
    kind: Taxonomy,
    id: Id,
    method: Method,
    user: User,
    body: Bytes,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = match method {
        Method::GET => retrieve(kind, id, &user, &state).await,
        Method::PUT => update(kind, id, &user, &body, false, &state).await,
        Method::PATCH => update(kind, id, &user, &body, true, &state).await,
        Method::DELETE => destroy(kind, id, &user, &state).await,
        other => Err(Error::method_not_allowed(&other)),
    };
    respond(result)
}

async fn retrieve(kind: Taxonomy, id: Id, user: &User, state: &AppState) -> ApiResult<Response> {
    let item = state
        .store
        .get_item(kind, user.id, id)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(json_response(&item, StatusCode::OK))
}

async fn update(
    kind: Taxonomy,
    id: Id,
    user: &User,
    body: &[u8],
    partial: bool,
    state: &AppState,
) -> ApiResult<Response> {
    let Some(current) = state.store.get_item(kind, user.id, id).await? else {
        return Err(HtmlError::NotFound.default());
    };

    let name = serializers::item_name(&parse_form(body)?, partial)?;
    let item = match name {
        Some(name) => state
            .store
            .rename_item(kind, user.id, id, &name)
            .await?
            .ok_or_else(|| HtmlError::NotFound.default())?,
        None => current,
    };

    Ok(json_response(&item, StatusCode::OK))
}

async fn destroy(kind: Taxonomy, id: Id, user: &User, state: &AppState) -> ApiResult<Response> {
    if !state.store.delete_item(kind, user.id, id).await? {
        return Err(HtmlError::NotFound.default());
    }

    log::info!("Deleted {} {id} of user {}", kind.table(), user.id);
    Ok(no_content())
}

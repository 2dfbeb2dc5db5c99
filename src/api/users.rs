use bytes::Bytes;
use serde_json::json;
use warp::{
    http::{Method, StatusCode},
    reject::Rejection,
    reply::Response,
    Filter,
};

use crate::{
    api::{
        openapi::{CredentialsRequest, ProfileUpdateRequest, SignupRequest, TokenResponse},
        routes::{json_body, json_response, parse_form, respond},
        serializers,
    },
    authentication::middleware::with_session,
    database::schema::{Profile, User},
    error::{ApiResult, Error},
    services::users,
    state::{with_state, AppState},
};

/// `/create`, `/token` and `/me` below `/api/user`.
pub fn routes(state: AppState) -> impl Filter<Extract = (Response,), Error = Rejection> + Clone {
    let create = warp::path!("create")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_user);

    let token = warp::path!("token")
        .and(warp::post())
        .and(json_body())
        .and(with_state(state.clone()))
        .and_then(create_token);

    let me = warp::path!("me")
        .and(warp::method())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state))
        .and_then(manage_user);

    create.or(token).unify().or(me).unify()
}

async fn create_user(body: Bytes, state: AppState) -> Result<Response, Rejection> {
    respond(signup(&body, &state).await)
}

#[utoipa::path(
    post,
    path = "/api/user/create",
    tag = "user",
    operation_id = "create_user",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User created", body = Profile),
        (status = 400, description = "Invalid payload or email already in use"),
    )
)]
pub(crate) async fn signup(body: &[u8], state: &AppState) -> ApiResult<Response> {
    let payload = serializers::signup(&parse_form(body)?)?;
    let user =
        users::create_user(&*state.store, &payload.email, &payload.password, payload.extra).await?;

    Ok(json_response(
        &json!({ "email": user.email, "name": user.name }),
        StatusCode::CREATED,
    ))
}

async fn create_token(body: Bytes, state: AppState) -> Result<Response, Rejection> {
    respond(login(&body, &state).await)
}

#[utoipa::path(
    post,
    path = "/api/user/token",
    tag = "user",
    operation_id = "create_token",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Token for the user", body = TokenResponse),
        (status = 400, description = "Unable to authenticate with provided credentials"),
    )
)]
pub(crate) async fn login(body: &[u8], state: &AppState) -> ApiResult<Response> {
    let credentials = serializers::credentials(&parse_form(body)?)?;
    let token = users::authenticate(
        &*state.store,
        &state.tokens,
        &credentials.email,
        &credentials.password,
    )
    .await?;

    Ok(json_response(&json!({ "token": token }), StatusCode::OK))
}

async fn manage_user(
    method: Method,
    user: User,
    body: Bytes,
    state: AppState,
) -> Result<Response, Rejection> {
    let result = match method {
        Method::GET => profile(&user).await,
        Method::PATCH => update_me(&user, &body, &state).await,
        other => Err(Error::method_not_allowed(&other)),
    };
    respond(result)
}

#[utoipa::path(
    get,
    path = "/api/user/me",
    tag = "user",
    operation_id = "retrieve_me",
    responses(
        (status = 200, description = "Profile of the caller", body = Profile),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn profile(user: &User) -> ApiResult<Response> {
    Ok(json_response(&users::get_profile(user), StatusCode::OK))
}

#[utoipa::path(
    patch,
    path = "/api/user/me",
    tag = "user",
    operation_id = "update_me",
    request_body = ProfileUpdateRequest,
    responses(
        (status = 200, description = "Updated profile", body = Profile),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or invalid token"),
    ),
    security(("token_auth" = []))
)]
pub(crate) async fn update_me(user: &User, body: &[u8], state: &AppState) -> ApiResult<Response> {
    let update = serializers::profile_changes(&parse_form(body)?)?;
    let profile = users::update_profile(&*state.store, user, update).await?;

    Ok(json_response(&profile, StatusCode::OK))
}

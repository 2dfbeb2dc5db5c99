use warp::{reject::Rejection, Filter};

use crate::{
    constants::AUTH_SCHEMES,
    database::{schema::User, store::UserStore},
    error::{Error, HtmlError},
    state::{with_state, AppState},
};

/// Extracts the token from an `Authorization` header value. Returns `None`
/// when the header uses a scheme we do not handle.
pub fn parse_authorization(header: &str) -> Result<Option<&str>, Error> {
    let mut parts = header.split_whitespace();
    let Some(scheme) = parts.next() else {
        return Ok(None);
    };
    if !AUTH_SCHEMES.iter().any(|s| s.eq_ignore_ascii_case(scheme)) {
        return Ok(None);
    }

    match (parts.next(), parts.next()) {
        (None, _) => Err(HtmlError::Unauthorized.new("Invalid token header. No credentials provided.")),
        (Some(_), Some(_)) => Err(HtmlError::Unauthorized
            .new("Invalid token header. Token string should not contain spaces.")),
        (Some(token), None) => Ok(Some(token)),
    }
}

pub async fn authenticate_header(header: Option<&str>, state: &AppState) -> Result<User, Error> {
    let token = match header {
        Some(header) => parse_authorization(header)?,
        None => None,
    };
    let Some(token) = token else {
        return Err(HtmlError::Unauthorized.default());
    };

    let session = state.tokens.verify(token)?;
    let user = state.store.get_user_by_id(session.user_id).await?;

    match user {
        Some(user) if user.is_active => Ok(user),
        _ => {
            log::debug!("Rejected token for missing or inactive user {}", session.user_id);
            Err(HtmlError::Unauthorized.new("User inactive or deleted."))
        }
    }
}

/// Resolves the calling user from the `Authorization` header, rejecting with
/// 401 when absent or invalid.
pub fn with_session(
    state: AppState,
) -> impl Filter<Extract = (User,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: AppState| async move {
            authenticate_header(header.as_deref(), &state)
                .await
                .map_err(warp::reject::custom)
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_token_and_bearer_schemes() {
        assert_eq!(parse_authorization("Token abc").unwrap(), Some("abc"));
        assert_eq!(parse_authorization("Bearer abc").unwrap(), Some("abc"));
        assert_eq!(parse_authorization("token abc").unwrap(), Some("abc"));
    }

    #[test]
    fn unknown_scheme_is_ignored() {
        assert_eq!(parse_authorization("Basic abc").unwrap(), None);
        assert_eq!(parse_authorization("").unwrap(), None);
    }

    #[test]
    fn malformed_header_is_unauthorized() {
        let err = parse_authorization("Token").unwrap_err();
        assert_eq!(err.kind, HtmlError::Unauthorized);

        let err = parse_authorization("Token a b").unwrap_err();
        assert_eq!(err.kind, HtmlError::Unauthorized);
    }
}

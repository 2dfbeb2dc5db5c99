use crate::{
    authentication::{
        cryptography::{hash_password, verify_password},
        jwt::TokenSigner,
    },
    database::{
        error::QueryError,
        schema::{Profile, User},
        store::{NewUser, UserChanges, UserStore},
    },
    error::{Error, HtmlError},
};

#[derive(Debug, Clone)]
pub struct ExtraFields {
    pub name: String,
    pub is_active: bool,
    pub is_staff: bool,
}

impl Default for ExtraFields {
    fn default() -> Self {
        Self {
            name: String::new(),
            is_active: true,
            is_staff: false,
        }
    }
}

/// Validated self-service profile changes. The password is still plaintext.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub password: Option<String>,
}

/// Trims the address and lower-cases its domain part. The local part is left
/// as given.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

fn hash(password: &str) -> Result<String, Error> {
    hash_password(password).map_err(|e| {
        log::error!("Failed to hash password: {e}");
        HtmlError::InternalServerError.default()
    })
}

pub async fn create_user<S>(
    store: &S,
    email: &str,
    password: &str,
    extra: ExtraFields,
) -> Result<User, Error>
where
    S: UserStore + ?Sized,
{
    insert(store, email, password, extra, false).await
}

pub async fn create_superuser<S>(store: &S, email: &str, password: &str) -> Result<User, Error>
where
    S: UserStore + ?Sized,
{
    let extra = ExtraFields {
        is_staff: true,
        ..Default::default()
    };
    insert(store, email, password, extra, true).await
}

async fn insert<S>(
    store: &S,
    email: &str,
    password: &str,
    extra: ExtraFields,
    is_superuser: bool,
) -> Result<User, Error>
where
    S: UserStore + ?Sized,
{
    let email = normalize_email(email);
    if email.is_empty() {
        return Err(Error::field("email", "Users must have an email address."));
    }

    let user = NewUser {
        email,
        name: extra.name,
        password_hash: hash(password)?,
        is_active: extra.is_active,
        is_staff: extra.is_staff,
        is_superuser,
    };

    let user = store.insert_user(user).await.map_err(|e| match e {
        QueryError::AlreadyExists { entity } => {
            Error::field("email", format!("{entity} already exists."))
        }
        other => Error::from(other),
    })?;

    log::info!("Created user {}", user.id);
    Ok(user)
}

/// Checks the credentials and issues a session token. Every failure yields the
/// same generic error.
pub async fn authenticate<S>(
    store: &S,
    tokens: &TokenSigner,
    email: &str,
    password: &str,
) -> Result<String, Error>
where
    S: UserStore + ?Sized,
{
    if password.is_empty() {
        return Err(HtmlError::InvalidCredentials.default());
    }

    let user = store.get_user_by_email(&normalize_email(email)).await?;
    let Some(user) = user.filter(|user| user.is_active) else {
        log::debug!("Login failed: no active user for the given email");
        return Err(HtmlError::InvalidCredentials.default());
    };

    let verified = verify_password(password, &user.password).unwrap_or_else(|e| {
        log::error!("Stored password hash for user {} is unreadable: {e}", user.id);
        false
    });
    if !verified {
        log::debug!("Login failed for user {}", user.id);
        return Err(HtmlError::InvalidCredentials.default());
    }

    tokens.generate(&user)
}

pub fn get_profile(user: &User) -> Profile {
    Profile::from(user)
}

pub async fn update_profile<S>(store: &S, user: &User, update: ProfileUpdate) -> Result<Profile, Error>
where
    S: UserStore + ?Sized,
{
    let changes = UserChanges {
        name: update.name,
        password_hash: match update.password {
            Some(password) => Some(hash(&password)?),
            None => None,
        },
    };

    let updated = store
        .update_user(user.id, changes)
        .await?
        .ok_or_else(|| HtmlError::NotFound.default())?;

    Ok(Profile::from(&updated))
}

//! Payload validation. Each function turns a decoded body into a typed value
//! or a field keyed validation error.

use rust_decimal::Decimal;
use serde_json::Value;

use crate::{
    constants::{
        FIELD_BLANK, FIELD_REQUIRED, MAX_EMAIL_LENGTH, MAX_NAME_LENGTH, MIN_PASSWORD_LENGTH,
        PRICE_DECIMAL_PLACES, PRICE_MAX_DIGITS,
    },
    database::{
        error::TypeError,
        form::Form,
        schema::Taxonomy,
        store::{RecipeDraft, RecipePatch},
    },
    error::{Error, ValidationErrors},
    services::users::{ExtraFields, ProfileUpdate},
};

#[derive(Debug)]
pub struct Signup {
    pub email: String,
    pub password: String,
    pub extra: ExtraFields,
}

pub struct Credentials {
    pub email: String,
    pub password: String,
}

fn take<T>(errors: &mut ValidationErrors, field: &str, value: Result<Option<T>, TypeError>) -> Option<T> {
    value.unwrap_or_else(|e| {
        errors.add(field, e.info());
        None
    })
}

fn required<T>(errors: &mut ValidationErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, FIELD_REQUIRED);
    }
    value
}

/// Trimmed string of at most `max` characters that may not be blank unless
/// `allow_blank`.
fn text(
    errors: &mut ValidationErrors,
    field: &str,
    value: Option<String>,
    max: usize,
    allow_blank: bool,
) -> Option<String> {
    let value = value?.trim().to_string();
    if value.is_empty() && !allow_blank {
        errors.add(field, FIELD_BLANK);
        return None;
    }
    if value.chars().count() > max {
        errors.add(
            field,
            format!("Ensure this field has no more than {max} characters."),
        );
        return None;
    }
    Some(value)
}

fn password(errors: &mut ValidationErrors, value: Option<String>) -> Option<String> {
    let value = value?;
    if value.is_empty() {
        errors.add("password", FIELD_BLANK);
        return None;
    }
    if value.chars().count() < MIN_PASSWORD_LENGTH {
        errors.add(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters."),
        );
        return None;
    }
    Some(value)
}

pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };

    !local.is_empty()
        && !domain.is_empty()
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
        && !email.chars().any(char::is_whitespace)
}

pub fn signup(form: &Form) -> Result<Signup, Error> {
    let mut errors = ValidationErrors::default();

    let email = take(&mut errors, "email", form.get_str("email"));
    let email = required(&mut errors, "email", email);
    let email = text(&mut errors, "email", email, MAX_EMAIL_LENGTH, false);
    if let Some(email) = email.as_deref() {
        if !is_valid_email(email) {
            errors.add("email", "Enter a valid email address.");
        }
    }

    let raw_password = take(&mut errors, "password", form.get_str("password"));
    let raw_password = required(&mut errors, "password", raw_password);
    let password = password(&mut errors, raw_password);

    let name = take(&mut errors, "name", form.get_str("name"));
    let name = required(&mut errors, "name", name);
    let name = text(&mut errors, "name", name, MAX_NAME_LENGTH, false);

    errors.check()?;
    match (email, password, name) {
        (Some(email), Some(password), Some(name)) => Ok(Signup {
            email,
            password,
            extra: ExtraFields {
                name,
                ..Default::default()
            },
        }),
        _ => Err(ValidationErrors::default().into_error()),
    }
}

/// Login payload. A blank password is passed through so that it fails with
/// the same message as a wrong one.
pub fn credentials(form: &Form) -> Result<Credentials, Error> {
    let mut errors = ValidationErrors::default();

    let email = take(&mut errors, "email", form.get_str("email"));
    let email = required(&mut errors, "email", email);
    let password = take(&mut errors, "password", form.get_str("password"));
    let password = required(&mut errors, "password", password);

    errors.check()?;
    match (email, password) {
        (Some(email), Some(password)) => Ok(Credentials { email, password }),
        _ => Err(ValidationErrors::default().into_error()),
    }
}

/// Self-service profile changes. Only `name` and `password` are honoured.
pub fn profile_changes(form: &Form) -> Result<ProfileUpdate, Error> {
    let mut errors = ValidationErrors::default();

    let name = take(&mut errors, "name", form.get_str("name"));
    let name = text(&mut errors, "name", name, MAX_NAME_LENGTH, false);
    let raw_password = take(&mut errors, "password", form.get_str("password"));
    let password = password(&mut errors, raw_password);

    errors.check()?;
    Ok(ProfileUpdate { name, password })
}

/// Number of digits, whole digits and decimal places, counted the way the
/// literal was written.
fn precision(value: &Decimal) -> (u32, u32, u32) {
    let digits = value.mantissa().unsigned_abs().to_string().len() as u32;
    let scale = value.scale();

    if scale == 0 {
        (digits, digits, 0)
    } else if digits > scale {
        (digits, digits - scale, scale)
    } else {
        (scale, 0, scale)
    }
}

pub fn validate_price(value: &Decimal) -> Result<(), String> {
    let (total, whole, decimals) = precision(value);
    let max_whole = PRICE_MAX_DIGITS - PRICE_DECIMAL_PLACES;

    if total > PRICE_MAX_DIGITS {
        Err(format!(
            "Ensure that there are no more than {PRICE_MAX_DIGITS} digits in total."
        ))
    } else if decimals > PRICE_DECIMAL_PLACES {
        Err(format!(
            "Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."
        ))
    } else if whole > max_whole {
        Err(format!(
            "Ensure that there are no more than {max_whole} digits before the decimal point."
        ))
    } else {
        Ok(())
    }
}

/// Names from a `[{"name": ...}, ...]` list.
fn item_names(errors: &mut ValidationErrors, field: &str, items: &[Value]) -> Option<Vec<String>> {
    let mut names = Vec::with_capacity(items.len());
    let mut valid = true;

    for item in items {
        let Value::Object(data) = item else {
            errors.add(
                field,
                "Invalid data. Expected a dictionary, but got a different type.",
            );
            valid = false;
            continue;
        };

        let item = Form::from_data(data.to_owned());
        let mut item_errors = ValidationErrors::default();
        let name = take(&mut item_errors, "name", item.get_str("name"));
        let name = required(&mut item_errors, "name", name);
        let name = text(&mut item_errors, "name", name, MAX_NAME_LENGTH, false);

        match name {
            Some(name) if item_errors.is_empty() => names.push(name),
            _ => {
                valid = false;
                for message in item_errors.into_error().fields.into_values().flatten() {
                    errors.add(field, format!("name: {message}"));
                }
            }
        }
    }

    valid.then_some(names)
}

/// Recipe fields present in the payload. When `partial` is false the
/// required fields must all be present.
pub fn recipe_patch(form: &Form, partial: bool) -> Result<RecipePatch, Error> {
    let mut errors = ValidationErrors::default();

    let title = take(&mut errors, "title", form.get_str("title"));
    let title = if partial {
        title
    } else {
        required(&mut errors, "title", title)
    };
    let title = text(&mut errors, "title", title, MAX_NAME_LENGTH, false);

    let description = take(&mut errors, "description", form.get_str("description"));
    let description = description.map(|d| d.trim().to_string());

    let time_minutes = take(&mut errors, "time_minutes", form.get_number::<i32>("time_minutes"));
    let time_minutes = if partial {
        time_minutes
    } else {
        required(&mut errors, "time_minutes", time_minutes)
    };

    let price = take(&mut errors, "price", form.get_number::<Decimal>("price"));
    let price = if partial {
        price
    } else {
        required(&mut errors, "price", price)
    };
    let price = price.and_then(|price| match validate_price(&price) {
        Ok(()) => Some(price),
        Err(message) => {
            errors.add("price", message);
            None
        }
    });

    let link = take(&mut errors, "link", form.get_str("link"));
    let link = text(&mut errors, "link", link, MAX_NAME_LENGTH, true);

    let mut patch = RecipePatch {
        title,
        description,
        time_minutes,
        price,
        link,
        ..Default::default()
    };

    for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
        let field = kind.field();
        let items = take(&mut errors, field, form.get_list(field));
        let names = items.and_then(|items| item_names(&mut errors, field, items));
        match kind {
            Taxonomy::Tag => patch.tags = names,
            Taxonomy::Ingredient => patch.ingredients = names,
        }
    }

    errors.check()?;
    Ok(patch)
}

pub fn recipe_draft(form: &Form) -> Result<RecipeDraft, Error> {
    let patch = recipe_patch(form, false)?;

    match (patch.title, patch.time_minutes, patch.price) {
        (Some(title), Some(time_minutes), Some(price)) => Ok(RecipeDraft {
            title,
            description: patch.description.unwrap_or_default(),
            time_minutes,
            price,
            link: patch.link.unwrap_or_default(),
            tags: patch.tags.unwrap_or_default(),
            ingredients: patch.ingredients.unwrap_or_default(),
        }),
        _ => Err(ValidationErrors::default().into_error()),
    }
}

/// `{"name": ...}` body of a tag or ingredient update.
pub fn item_name(form: &Form, partial: bool) -> Result<Option<String>, Error> {
    let mut errors = ValidationErrors::default();

    let name = take(&mut errors, "name", form.get_str("name"));
    let name = if partial {
        name
    } else {
        required(&mut errors, "name", name)
    };
    let name = text(&mut errors, "name", name, MAX_NAME_LENGTH, false);

    errors.check()?;
    Ok(name)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn form(body: &str) -> Form {
        Form::from_slice(body.as_bytes()).unwrap()
    }

    #[test]
    fn signup_reports_every_bad_field() {
        let err = signup(&form(r#"{"email": "nope", "password": "pw"}"#)).unwrap_err();
        assert!(err.fields.contains_key("email"));
        assert!(err.fields.contains_key("password"));
        assert_eq!(err.fields["name"], vec![FIELD_REQUIRED.to_string()]);
    }

    #[test]
    fn signup_accepts_valid_payload() {
        let payload = signup(&form(
            r#"{"email": "test@example.com", "password": "testpass123", "name": "Test Name"}"#,
        ))
        .unwrap();
        assert_eq!(payload.email, "test@example.com");
        assert_eq!(payload.extra.name, "Test Name");
        assert!(payload.extra.is_active);
    }

    #[test]
    fn email_shape_is_checked() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("a@localhost"));
        assert!(!is_valid_email("a.x.com"));
        assert!(!is_valid_email("@x.com"));
        assert!(!is_valid_email("a@x..com"));
    }

    #[test]
    fn blank_login_password_passes_validation() {
        let credentials = credentials(&form(r#"{"email": "a@x.com", "password": ""}"#)).unwrap();
        assert!(credentials.password.is_empty());
    }

    #[test]
    fn profile_changes_ignore_other_keys() {
        let update = profile_changes(&form(r#"{"email": "b@x.com", "name": "B"}"#)).unwrap();
        assert_eq!(update.name.as_deref(), Some("B"));
        assert!(update.password.is_none());

        assert!(profile_changes(&form(r#"{"password": "abc"}"#)).is_err());
    }

    #[test]
    fn price_precision_is_enforced() {
        assert!(validate_price(&Decimal::from_str("2.50").unwrap()).is_ok());
        assert!(validate_price(&Decimal::from_str("999.99").unwrap()).is_ok());
        assert!(validate_price(&Decimal::from_str("1000").unwrap()).is_err());
        assert!(validate_price(&Decimal::from_str("1.234").unwrap()).is_err());
        assert!(validate_price(&Decimal::from_str("0.05").unwrap()).is_ok());
    }

    #[test]
    fn draft_requires_core_fields() {
        let err = recipe_draft(&form(r#"{"title": "Soup"}"#)).unwrap_err();
        assert!(err.fields.contains_key("time_minutes"));
        assert!(err.fields.contains_key("price"));
        assert!(!err.fields.contains_key("title"));
    }

    #[test]
    fn draft_collects_nested_names() {
        let draft = recipe_draft(&form(
            r#"{"title": "Soup", "time_minutes": 10, "price": "2.50",
                "tags": [{"name": "Vegan"}], "ingredients": [{"name": "Salt"}, {"name": "Water"}]}"#,
        ))
        .unwrap();

        assert_eq!(draft.tags, vec!["Vegan"]);
        assert_eq!(draft.ingredients, vec!["Salt", "Water"]);
        assert_eq!(draft.description, "");
    }

    #[test]
    fn nested_item_without_name_is_rejected() {
        let err = recipe_patch(&form(r#"{"tags": [{"label": "x"}]}"#), true).unwrap_err();
        assert!(err.fields.contains_key("tags"));
    }

    #[test]
    fn partial_patch_keeps_absent_keys_unset() {
        let patch = recipe_patch(&form(r#"{"tags": []}"#), true).unwrap();
        assert_eq!(patch.tags, Some(vec![]));
        assert!(patch.ingredients.is_none());
        assert!(patch.title.is_none());
    }

    #[test]
    fn item_name_required_unless_partial() {
        assert!(item_name(&form("{}"), false).is_err());
        assert_eq!(item_name(&form("{}"), true).unwrap(), None);
        assert_eq!(
            item_name(&form(r#"{"name": "Dessert"}"#), false).unwrap().as_deref(),
            Some("Dessert")
        );
    }
}

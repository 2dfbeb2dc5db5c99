pub const MAX_NAME_LENGTH: usize = 255;
pub const MAX_EMAIL_LENGTH: usize = 255;
pub const MIN_PASSWORD_LENGTH: usize = 5;

pub const PRICE_MAX_DIGITS: u32 = 5;
pub const PRICE_DECIMAL_PLACES: u32 = 2;

pub const MAX_JSON_BODY_BYTES: u64 = 64 * 1024;
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

pub const MEDIA_URL: &str = "/media/";
pub const RECIPE_IMAGE_DIR: &str = "uploads/recipe";
pub const IMAGE_FIELD: &str = "image";

pub const AUTH_SCHEMES: &[&str] = &["Token", "Bearer"];

pub const GENERIC_AUTH_FAILURE: &str = "Unable to authenticate with provided credentials.";
pub const NON_FIELD_ERRORS: &str = "non_field_errors";

pub const FIELD_REQUIRED: &str = "This field is required.";
pub const FIELD_BLANK: &str = "This field may not be blank.";
pub const FIELD_NULL: &str = "This field may not be null.";

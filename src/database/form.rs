use std::str::FromStr;

use serde_json::{Map, Value};

use super::error::TypeError;

pub type FormData = Map<String, Value>;

/// A decoded JSON object body with typed accessors. A missing key is `None`,
/// a present key with the wrong type is a `TypeError`.
#[derive(Debug, Default, Clone)]
pub struct Form {
    inner: FormData,
}

impl Form {
    pub fn from_data(data: FormData) -> Self {
        Self { inner: data }
    }

    /// Parses a request body. An empty body is treated as an empty object.
    pub fn from_slice(body: &[u8]) -> Result<Self, TypeError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_slice(body)
            .map_err(|e| TypeError::new(&format!("JSON parse error - {e}")))?;

        match value {
            Value::Object(data) => Ok(Self::from_data(data)),
            _ => Err(TypeError::new(
                "Invalid data. Expected a dictionary, but got a different type.",
            )),
        }
    }

    pub fn get_str(&self, key: &str) -> Result<Option<String>, TypeError> {
        match self.inner.get(key) {
            None => Ok(None),
            Some(Value::String(v)) => Ok(Some(v.to_owned())),
            Some(Value::Null) => Err(TypeError::new(crate::constants::FIELD_NULL)),
            Some(Value::Number(v)) => Ok(Some(v.to_string())),
            Some(_) => Err(TypeError::new("Not a valid string.")),
        }
    }

    /// Accepts both JSON numbers and numeric strings.
    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        let raw = match self.inner.get(key) {
            None => return Ok(None),
            Some(Value::Null) => return Err(TypeError::new(crate::constants::FIELD_NULL)),
            Some(Value::Number(v)) => v.to_string(),
            Some(Value::String(v)) => v.trim().to_owned(),
            Some(_) => return Err(TypeError::new("A valid number is required.")),
        };

        raw.parse()
            .map(Some)
            .map_err(|_e| TypeError::new("A valid number is required."))
    }

    pub fn get_list(&self, key: &str) -> Result<Option<&Vec<Value>>, TypeError> {
        match self.inner.get(key) {
            None => Ok(None),
            Some(Value::Array(v)) => Ok(Some(v)),
            Some(Value::Null) => Err(TypeError::new(crate::constants::FIELD_NULL)),
            Some(_) => Err(TypeError::new(
                "Expected a list of items but got a different type.",
            )),
        }
    }
}

use std::collections::HashMap;

use crate::{
    database::{
        schema::{Id, Taxonomy},
        store::RecipeFilter,
    },
    error::{Error, ValidationErrors},
};

pub type QueryParams = HashMap<String, String>;

/// Parses a comma separated list of ids. Blank entries are skipped.
pub fn parse_id_list(raw: &str) -> Result<Vec<Id>, String> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<Id>()
                .map_err(|_| format!("\"{part}\" is not a valid id."))
        })
        .collect()
}

/// Integer flag, `0` is false and anything else true.
pub fn parse_flag(raw: &str) -> Result<bool, String> {
    raw.trim()
        .parse::<i64>()
        .map(|value| value != 0)
        .map_err(|_| String::from("A valid integer is required."))
}

pub fn recipe_filter(params: &QueryParams) -> Result<RecipeFilter, Error> {
    let mut errors = ValidationErrors::default();
    let mut filter = RecipeFilter::default();

    for kind in [Taxonomy::Tag, Taxonomy::Ingredient] {
        let field = kind.field();
        let Some(raw) = params.get(field).filter(|raw| !raw.trim().is_empty()) else {
            continue;
        };

        match parse_id_list(raw) {
            Ok(ids) => match kind {
                Taxonomy::Tag => filter.tags = Some(ids),
                Taxonomy::Ingredient => filter.ingredients = Some(ids),
            },
            Err(message) => errors.add(field, message),
        }
    }

    errors.check()?;
    Ok(filter)
}

pub fn assigned_only(params: &QueryParams) -> Result<bool, Error> {
    match params.get("assigned_only") {
        Some(raw) => parse_flag(raw).map_err(|message| Error::field("assigned_only", message)),
        None => Ok(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> QueryParams {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn id_lists_skip_blanks() {
        assert_eq!(parse_id_list("1, 2,,3").unwrap(), vec![1, 2, 3]);
        assert!(parse_id_list("1,x").is_err());
    }

    #[test]
    fn empty_filter_params_are_ignored() {
        let filter = recipe_filter(&params(&[("tags", ""), ("ingredients", " ")])).unwrap();
        assert_eq!(filter, RecipeFilter::default());
    }

    #[test]
    fn both_filters_are_collected() {
        let filter = recipe_filter(&params(&[("tags", "1,2"), ("ingredients", "3")])).unwrap();
        assert_eq!(filter.tags, Some(vec![1, 2]));
        assert_eq!(filter.ingredients, Some(vec![3]));
    }

    #[test]
    fn non_integer_filter_is_a_validation_error() {
        let err = recipe_filter(&params(&[("tags", "vegan")])).unwrap_err();
        assert!(err.fields.contains_key("tags"));
    }

    #[test]
    fn assigned_only_is_an_integer_flag() {
        assert!(!assigned_only(&params(&[])).unwrap());
        assert!(!assigned_only(&params(&[("assigned_only", "0")])).unwrap());
        assert!(assigned_only(&params(&[("assigned_only", "1")])).unwrap());
        assert!(assigned_only(&params(&[("assigned_only", "yes")])).is_err());
    }
}

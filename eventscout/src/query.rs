//! Search query construction.
//!
//! Turns a field of interest and a city into the quoted query string sent to
//! the search engine:
//!
//! ```text
//! "AI conferences" events in "San Francisco"
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Build the search query for a field of interest in a city.
///
/// The inputs are quoted verbatim: no trimming, normalization or escaping.
///
/// # Errors
///
/// Returns [`SearchError::InvalidArgument`] if `field_of_interest` is empty,
/// or, when it is not, if `city_name` is empty.
pub fn build_query(field_of_interest: &str, city_name: &str) -> Result<String, SearchError> {
    if field_of_interest.is_empty() {
        return Err(SearchError::invalid_argument(
            "Field of interest cannot be empty.",
        ));
    }
    if city_name.is_empty() {
        return Err(SearchError::invalid_argument("City name cannot be empty."));
    }

    Ok(format!("\"{field_of_interest}\" events in \"{city_name}\""))
}

/// A city to search in, with an optional radius in kilometres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityWithRadius {
    /// Name of the city.
    pub city_name: String,
    /// Search radius around the city.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub radius: Option<f64>,
}

impl CityWithRadius {
    /// Create a city entry without a radius.
    #[must_use]
    pub fn new(city_name: impl Into<String>) -> Self {
        Self {
            city_name: city_name.into(),
            radius: None,
        }
    }

    /// Set the radius.
    #[must_use]
    pub const fn with_radius(mut self, radius: f64) -> Self {
        self.radius = Some(radius);
        self
    }
}

/// Parameters describing what to search for and where.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchInputParameters {
    /// Topic to look for, e.g. "AI conferences".
    pub field_of_interest: String,
    /// Cities to search in.
    #[serde(default)]
    pub locations: Vec<CityWithRadius>,
}

impl SearchInputParameters {
    /// Create parameters for a field of interest with no locations.
    #[must_use]
    pub fn new(field_of_interest: impl Into<String>) -> Self {
        Self {
            field_of_interest: field_of_interest.into(),
            locations: Vec::new(),
        }
    }

    /// Add a location.
    #[must_use]
    pub fn location(mut self, city: CityWithRadius) -> Self {
        self.locations.push(city);
        self
    }

    /// Build one query per location, in order.
    ///
    /// # Errors
    ///
    /// Returns the first [`SearchError::InvalidArgument`] produced by
    /// [`build_query`].
    pub fn queries(&self) -> Result<Vec<String>, SearchError> {
        self.locations
            .iter()
            .map(|city| build_query(&self.field_of_interest, &city.city_name))
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    mod build_query {
        use super::*;

        #[test]
        fn quotes_both_inputs() {
            let query = build_query("AI conferences", "San Francisco").unwrap();
            assert_eq!(query, "\"AI conferences\" events in \"San Francisco\"");
        }

        #[test]
        fn keeps_inner_spaces() {
            let query = build_query("Web Development Workshops", "New York City").unwrap();
            assert_eq!(
                query,
                "\"Web Development Workshops\" events in \"New York City\""
            );
        }

        #[test]
        fn does_not_trim_or_escape() {
            let query = build_query(" say \"hi\" ", "  ").unwrap();
            assert_eq!(query, "\" say \"hi\" \" events in \"  \"");
        }

        #[test]
        fn empty_field_is_rejected() {
            let err = build_query("", "London").unwrap_err();
            assert!(matches!(err, SearchError::InvalidArgument(_)));
            assert_eq!(err.to_string(), "Field of interest cannot be empty.");
        }

        #[test]
        fn empty_city_is_rejected() {
            let err = build_query("Tech Meetups", "").unwrap_err();
            assert!(matches!(err, SearchError::InvalidArgument(_)));
            assert_eq!(err.to_string(), "City name cannot be empty.");
        }

        #[test]
        fn field_is_checked_first() {
            let err = build_query("", "").unwrap_err();
            assert_eq!(err.to_string(), "Field of interest cannot be empty.");
        }
    }

    mod search_input_parameters {
        use super::*;

        #[test]
        fn one_query_per_location() {
            let params = SearchInputParameters::new("Jazz")
                .location(CityWithRadius::new("Berlin"))
                .location(CityWithRadius::new("Paris").with_radius(10.0));

            let queries = params.queries().unwrap();
            assert_eq!(
                queries,
                vec![
                    "\"Jazz\" events in \"Berlin\"".to_owned(),
                    "\"Jazz\" events in \"Paris\"".to_owned(),
                ]
            );
        }

        #[test]
        fn no_locations_yields_no_queries() {
            let params = SearchInputParameters::new("Jazz");
            assert!(params.queries().unwrap().is_empty());
        }

        #[test]
        fn invalid_location_fails() {
            let params = SearchInputParameters::new("Jazz")
                .location(CityWithRadius::new("Berlin"))
                .location(CityWithRadius::new(""));

            let err = params.queries().unwrap_err();
            assert_eq!(err.to_string(), "City name cannot be empty.");
        }

        #[test]
        fn deserializes_camel_case() {
            let params: SearchInputParameters = serde_json::from_str(
                r#"{"fieldOfInterest":"Rust","locations":[{"cityName":"Oslo","radius":5}]}"#,
            )
            .unwrap();

            assert_eq!(params.field_of_interest, "Rust");
            assert_eq!(params.locations[0].city_name, "Oslo");
            assert_eq!(params.locations[0].radius, Some(5.0));
        }
    }
}

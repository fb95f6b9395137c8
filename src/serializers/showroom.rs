//! Showroom input rules and read representation.

use crate::{
    models::showroom::{NewShowroom, Showroom},
    validation::{self, Field, ValidationErrors},
};
use serde::{Deserialize, Serialize};
use validator::ValidateUrl;

const NAME_MAX: usize = 100;
const LOCATION_MAX: usize = 100;
const WEBSITE_MAX: usize = 200;

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ShowroomInput {
    pub name: Field<String>,
    pub location: Field<String>,
    pub website: Field<String>,
}

impl ShowroomInput {
    pub fn merged_over(self, existing: &Showroom) -> Self {
        Self {
            name: self.name.or_else(|| Field::Present(existing.name.clone())),
            location: self
                .location
                .or_else(|| Field::Present(existing.location.clone())),
            website: self
                .website
                .or_else(|| Field::Present(existing.website.clone())),
        }
    }

    pub fn validate(self) -> Result<NewShowroom, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = validation::require_text(&mut errors, "name", self.name);
        validation::max_length(&mut errors, "name", &name, NAME_MAX);
        let location = validation::require_text(&mut errors, "location", self.location);
        validation::max_length(&mut errors, "location", &location, LOCATION_MAX);
        let website = validation::require_text(&mut errors, "website", self.website);
        if !website.is_empty() {
            validation::max_length(&mut errors, "website", &website, WEBSITE_MAX);
            if !is_web_url(&website) {
                errors.add("website", "Enter a valid URL.");
            }
        }

        errors.into_result()?;
        Ok(NewShowroom {
            name,
            location,
            website,
        })
    }
}

/// A well-formed absolute URL with an http(s) or ftp(s) scheme.
fn is_web_url(value: &str) -> bool {
    let scheme = value
        .split_once("://")
        .map(|(scheme, _)| scheme.to_ascii_lowercase());
    matches!(scheme.as_deref(), Some("http" | "https" | "ftp" | "ftps")) && value.validate_url()
}

/// Showroom as returned to clients. `showrooms` links to the detail
/// endpoint of every car it stocks.
#[derive(Debug, Clone, Serialize)]
pub struct ShowroomOut {
    pub id: i64,
    pub showrooms: Vec<String>,
    pub name: String,
    pub location: String,
    pub website: String,
}

impl ShowroomOut {
    pub fn new(showroom: Showroom, car_ids: &[i64]) -> Self {
        Self {
            id: showroom.id,
            showrooms: car_ids.iter().map(|id| car_detail_url(*id)).collect(),
            name: showroom.name,
            location: showroom.location,
            website: showroom.website,
        }
    }
}

pub fn car_detail_url(car_id: i64) -> String {
    format!("/{car_id}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(website: &str) -> ShowroomInput {
        ShowroomInput {
            name: Field::Present("Downtown".into()),
            location: Field::Present("Karachi".into()),
            website: Field::Present(website.into()),
        }
    }

    #[test]
    fn accepts_web_urls() {
        assert!(input("https://cars.example.com").validate().is_ok());
        assert!(input("http://cars.example.com:8080/lot?x=1").validate().is_ok());
        assert!(input("ftp://cars.example.com/brochure.pdf").validate().is_ok());
    }

    #[test]
    fn rejects_non_urls() {
        for bad in [
            "cars.example.com",
            "mailto:sales@cars.example.com",
            "javascript://alert(1)",
            "https://",
            "https://a b.com",
        ] {
            let errors = input(bad).validate().unwrap_err();
            assert_eq!(errors.messages("website"), ["Enter a valid URL."], "{bad}");
        }
    }

    #[test]
    fn all_fields_required() {
        let errors = ShowroomInput::default().validate().unwrap_err();
        for field in ["name", "location", "website"] {
            assert_eq!(errors.messages(field), [validation::REQUIRED]);
        }
    }

    #[test]
    fn cars_render_as_detail_links() {
        let showroom = Showroom {
            id: 1,
            name: "Downtown".into(),
            location: "Karachi".into(),
            website: "https://cars.example.com".into(),
        };
        let out = ShowroomOut::new(showroom, &[3, 8]);
        assert_eq!(out.showrooms, vec!["/3", "/8"]);
    }
}

//! Candidate builders shared by the search tests

use super::Candidate;
use crate::db::models::{Availability, PropertyType};
use sea_orm::prelude::Decimal;
use uuid::Uuid;

/// An available New Cairo apartment at `price` EGP
pub fn candidate(name: &str, price: i64) -> Candidate {
    Candidate {
        unit_id: Uuid::new_v4(),
        bedrooms: 3,
        bathrooms: Decimal::new(25, 1),
        size_sqm: Decimal::new(18_050, 2),
        price_egp: Decimal::from(price),
        unit_type: PropertyType::Apartment,
        availability: Availability::Available,
        project_name: Some(name.to_string()),
        project_name_ar: None,
        city: Some("New Cairo".to_string()),
        city_ar: Some("القاهرة الجديدة".to_string()),
        district: Some("Fifth Settlement".to_string()),
        lat: Some(Decimal::new(300_131_000, 7)),
        lng: Some(Decimal::new(314_913_000, 7)),
        developer_name: Some("Palm Hills".to_string()),
        project_description: Some("Gated compound with clubhouse".to_string()),
        featured: false,
    }
}

/// Same as `candidate` but located in `city` / `district`
pub fn candidate_in(name: &str, price: i64, city: &str, district: Option<&str>) -> Candidate {
    Candidate {
        city: Some(city.to_string()),
        city_ar: None,
        district: district.map(String::from),
        ..candidate(name, price)
    }
}

//! Museum catalog entries

use async_graphql::{InputObject, SimpleObject};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A catalogued exhibit, keyed by its inventory number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SimpleObject)]
pub struct MuseumObject {
    /// Inventory number
    pub object_id: String,
    pub category: String,
    pub sub_category: String,
    pub title: String,
    pub time_range: Option<String>,
    pub year: Option<String>,
    /// Ids of pictures showing the object
    pub pictures: Vec<i64>,
    pub art_type: Option<String>,
    pub creator: Option<String>,
    pub material: Option<String>,
    /// Free-form dimensions, e.g. "height x width x depth" in cm
    pub size: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub additional_information: Option<String>,
    pub interdisciplinary_context: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a museum object
#[derive(Debug, Clone, Default, Serialize, Deserialize, InputObject)]
pub struct CreateMuseumObjectInput {
    pub object_id: String,
    pub category: String,
    pub sub_category: String,
    pub title: String,
    pub time_range: Option<String>,
    pub year: Option<String>,
    #[graphql(default)]
    pub pictures: Vec<i64>,
    pub art_type: Option<String>,
    pub creator: Option<String>,
    pub material: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub additional_information: Option<String>,
    pub interdisciplinary_context: Option<String>,
}

impl CreateMuseumObjectInput {
    /// Build the stored object, stamping both timestamps with `now`
    pub fn into_object(self, now: DateTime<Utc>) -> MuseumObject {
        MuseumObject {
            object_id: self.object_id,
            category: self.category,
            sub_category: self.sub_category,
            title: self.title,
            time_range: self.time_range,
            year: self.year,
            pictures: self.pictures,
            art_type: self.art_type,
            creator: self.creator,
            material: self.material,
            size: self.size,
            location: self.location,
            description: self.description,
            additional_information: self.additional_information,
            interdisciplinary_context: self.interdisciplinary_context,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize, InputObject)]
pub struct UpdateMuseumObjectInput {
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub title: Option<String>,
    pub time_range: Option<String>,
    pub year: Option<String>,
    pub pictures: Option<Vec<i64>>,
    pub art_type: Option<String>,
    pub creator: Option<String>,
    pub material: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub additional_information: Option<String>,
    pub interdisciplinary_context: Option<String>,
}

impl MuseumObject {
    /// Apply a partial update in place
    pub fn apply(&mut self, update: UpdateMuseumObjectInput) {
        fn set<T>(slot: &mut T, value: Option<T>) {
            if let Some(value) = value {
                *slot = value;
            }
        }
        fn set_opt<T>(slot: &mut Option<T>, value: Option<T>) {
            if value.is_some() {
                *slot = value;
            }
        }

        set(&mut self.category, update.category);
        set(&mut self.sub_category, update.sub_category);
        set(&mut self.title, update.title);
        set(&mut self.pictures, update.pictures);
        set_opt(&mut self.time_range, update.time_range);
        set_opt(&mut self.year, update.year);
        set_opt(&mut self.art_type, update.art_type);
        set_opt(&mut self.creator, update.creator);
        set_opt(&mut self.material, update.material);
        set_opt(&mut self.size, update.size);
        set_opt(&mut self.location, update.location);
        set_opt(&mut self.description, update.description);
        set_opt(&mut self.additional_information, update.additional_information);
        set_opt(&mut self.interdisciplinary_context, update.interdisciplinary_context);
    }
}

/// Catalog search. Every provided field must occur (case-insensitively) in
/// the corresponding column; absent fields match everything.
#[derive(Debug, Clone, Default, Serialize, Deserialize, InputObject)]
pub struct MuseumObjectFilter {
    pub object_id: Option<String>,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub title: Option<String>,
    pub time_range: Option<String>,
    pub year: Option<String>,
    pub art_type: Option<String>,
    pub creator: Option<String>,
    pub material: Option<String>,
    pub size: Option<String>,
    pub location: Option<String>,
    pub description: Option<String>,
    pub additional_information: Option<String>,
    pub interdisciplinary_context: Option<String>,
}

impl MuseumObjectFilter {
    /// Column/needle pairs for the fields that are set and non-blank
    pub fn terms(&self) -> Vec<(&'static str, &str)> {
        [
            ("object_id", &self.object_id),
            ("category", &self.category),
            ("sub_category", &self.sub_category),
            ("title", &self.title),
            ("time_range", &self.time_range),
            ("year", &self.year),
            ("art_type", &self.art_type),
            ("creator", &self.creator),
            ("material", &self.material),
            ("size", &self.size),
            ("location", &self.location),
            ("description", &self.description),
            ("additional_information", &self.additional_information),
            ("interdisciplinary_context", &self.interdisciplinary_context),
        ]
        .into_iter()
        .filter_map(|(column, value)| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(|v| (column, v))
        })
        .collect()
    }

    /// Whether every term occurs in its field, ignoring case.
    ///
    /// Case folding uses Unicode lowercase so `"GEMÄLDE"` finds `"Gemälde"`.
    pub fn matches(&self, object: &MuseumObject) -> bool {
        self.terms().into_iter().all(|(column, needle)| {
            object
                .field(column)
                .is_some_and(|value| value.to_lowercase().contains(&needle.to_lowercase()))
        })
    }
}

impl MuseumObject {
    /// Text of a filterable field by column name
    pub fn field(&self, column: &str) -> Option<&str> {
        match column {
            "object_id" => Some(&self.object_id),
            "category" => Some(&self.category),
            "sub_category" => Some(&self.sub_category),
            "title" => Some(&self.title),
            "time_range" => self.time_range.as_deref(),
            "year" => self.year.as_deref(),
            "art_type" => self.art_type.as_deref(),
            "creator" => self.creator.as_deref(),
            "material" => self.material.as_deref(),
            "size" => self.size.as_deref(),
            "location" => self.location.as_deref(),
            "description" => self.description.as_deref(),
            "additional_information" => self.additional_information.as_deref(),
            "interdisciplinary_context" => self.interdisciplinary_context.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MuseumObject {
        CreateMuseumObjectInput {
            object_id: "INV-1".to_string(),
            category: "Painting".to_string(),
            sub_category: "Oil".to_string(),
            title: "Harbour at Dusk".to_string(),
            creator: Some("Unknown".to_string()),
            ..Default::default()
        }
        .into_object(Utc::now())
    }

    #[test]
    fn test_apply_partial_update() {
        let mut object = sample();
        object.apply(UpdateMuseumObjectInput {
            title: Some("Harbour at Dawn".to_string()),
            location: Some("Room 3".to_string()),
            ..Default::default()
        });

        assert_eq!(object.title, "Harbour at Dawn");
        assert_eq!(object.location.as_deref(), Some("Room 3"));
        assert_eq!(object.creator.as_deref(), Some("Unknown"));
        assert_eq!(object.category, "Painting");
    }

    #[test]
    fn test_filter_terms_skip_blank_values() {
        let filter = MuseumObjectFilter {
            category: Some("Painting".to_string()),
            title: Some("   ".to_string()),
            creator: Some(" Vermeer ".to_string()),
            ..Default::default()
        };

        assert_eq!(filter.terms(), vec![("category", "Painting"), ("creator", "Vermeer")]);
        assert!(MuseumObjectFilter::default().terms().is_empty());
    }

    #[test]
    fn test_filter_folds_non_ascii_case() {
        let mut object = sample();
        object.category = "Gemälde".to_string();
        object.sub_category = "Öl".to_string();

        let filter = |category: &str, sub_category: Option<&str>| MuseumObjectFilter {
            category: Some(category.to_string()),
            sub_category: sub_category.map(str::to_string),
            ..Default::default()
        };

        assert!(filter("GEMÄLDE", None).matches(&object));
        assert!(filter("mäl", Some("öl")).matches(&object));
        assert!(!filter("gemälde", Some("Acryl")).matches(&object));
        assert!(!MuseumObjectFilter {
            material: Some("Holz".to_string()),
            ..Default::default()
        }
        .matches(&object));
        assert!(MuseumObjectFilter::default().matches(&object));
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

/// Seating area a party can ask for, e.g. "Gazebo" or "Lesehan"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SeatingSpot {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Guests per day; None means unlimited
    pub capacity: Option<i32>,
    pub image: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request DTO for creating a seating spot
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSeatingSpot {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
    #[validate(length(max = 255))]
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

/// Request DTO for updating a seating spot; omitted fields keep their value
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct UpdateSeatingSpot {
    #[validate(length(min = 1, max = 255, message = "Name must be between 1 and 255 characters"))]
    pub name: Option<String>,
    pub description: Option<String>,
    #[validate(range(min = 1, message = "Capacity must be at least 1"))]
    pub capacity: Option<i32>,
    /// Drop the capacity limit
    #[serde(default)]
    pub clear_capacity: bool,
    #[validate(length(max = 255))]
    pub image: Option<String>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SpotQuery {
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_must_be_positive() {
        let spot = CreateSeatingSpot {
            name: "Gazebo".into(),
            description: None,
            capacity: Some(0),
            image: None,
            is_active: None,
        };
        assert!(spot.validate().unwrap_err().field_errors().contains_key("capacity"));

        let unlimited = CreateSeatingSpot { capacity: None, ..spot };
        assert!(unlimited.validate().is_ok());
    }

    #[test]
    fn test_update_defaults() {
        let update: UpdateSeatingSpot = serde_json::from_str(r#"{"name": "Lesehan"}"#).unwrap();
        assert!(!update.clear_capacity);
        assert!(update.capacity.is_none());
        assert!(update.validate().is_ok());
    }
}

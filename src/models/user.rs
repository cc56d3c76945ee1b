//! User model for storage.

use serde::{Deserialize, Serialize};

/// User record stored in Firestore (`users/{uid}`).
///
/// Field names match what the Study Buddy pages read, so the struct is
/// serialized in camelCase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Display name from the identity provider
    pub name: String,
    /// Email address
    pub email: String,
    /// Consecutive study days
    #[serde(default)]
    pub streak: i64,
    /// Accumulated points
    #[serde(default)]
    pub points: i64,
    /// Course identifiers, in enrollment order
    #[serde(default)]
    pub enrolled_courses: Vec<String>,
}

impl UserRecord {
    /// Record written on a user's first sign-in.
    pub fn new_default(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            streak: 0,
            points: 0,
            enrolled_courses: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_default_record_shape() {
        let record = UserRecord::new_default("Ada Lovelace", "ada@example.com");
        let json = serde_json::to_value(&record).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "name": "Ada Lovelace",
                "email": "ada@example.com",
                "streak": 0,
                "points": 0,
                "enrolledCourses": []
            })
        );
    }

    #[test]
    fn test_missing_counters_default_to_zero() {
        let record: UserRecord =
            serde_json::from_str(r#"{"name":"Ada","email":"ada@example.com"}"#).unwrap();
        assert_eq!(record.streak, 0);
        assert_eq!(record.points, 0);
        assert!(record.enrolled_courses.is_empty());
    }
}

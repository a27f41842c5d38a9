//! Experiment assignment types for routing requests to variants

use serde::{Deserialize, Serialize};

/// Result of assigning an entity to an experiment variant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    /// ID of the experiment
    pub test_id: String,
    /// ID of the entity that was assigned
    pub entity_id: String,
    /// ID of the assigned variant
    pub variant_id: String,
    /// Hash point in [0, 1) the variant was selected with
    pub point: f64,
}

impl Assignment {
    /// Create a new assignment
    pub fn new(
        test_id: impl Into<String>,
        entity_id: impl Into<String>,
        variant_id: impl Into<String>,
        point: f64,
    ) -> Self {
        Self {
            test_id: test_id.into(),
            entity_id: entity_id.into(),
            variant_id: variant_id.into(),
            point,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assignment() {
        let assignment = Assignment::new("checkout", "user-42", "model_b", 0.73);

        assert_eq!(assignment.test_id, "checkout");
        assert_eq!(assignment.entity_id, "user-42");
        assert_eq!(assignment.variant_id, "model_b");
        assert_eq!(assignment.point, 0.73);
    }

    #[test]
    fn test_assignment_serialization() {
        let assignment = Assignment::new("checkout", "user-42", "model_a", 0.5);
        let json = serde_json::to_string(&assignment).unwrap();

        assert!(json.contains("\"variant_id\":\"model_a\""));

        let parsed: Assignment = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, assignment);
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::category::Category;

/// One scheduled session. Empty strings and `None` are left out of the JSON
/// entirely; the dashboard treats a missing key and an empty value the same.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FitnessClass {
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub date: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub time: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default)]
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleSnapshot {
    pub last_updated: DateTime<Utc>,
    pub class_count: usize,
    pub classes: Vec<FitnessClass>,
}

impl ScheduleSnapshot {
    pub fn new(classes: Vec<FitnessClass>, last_updated: DateTime<Utc>) -> Self {
        Self {
            last_updated,
            class_count: classes.len(),
            classes,
        }
    }
}

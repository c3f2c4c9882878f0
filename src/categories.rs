//! Crime category allow-list
//!
//! Only categories on the allow-list are offered to viewers, and only the
//! ones the loaded table actually has a column for.

use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORIES: &[&str] = &[
    "RAPE",
    "DOWRY DEATHS",
    "ASSAULT ON WOMEN WITH INTENT TO OUTRAGE HER MODESTY",
    "INSULT TO MODESTY OF WOMEN",
    "CRUELTY BY HUSBAND OR HIS RELATIVES",
    "KIDNAPPING & ABDUCTION",
    "KIDNAPPING AND ABDUCTION OF WOMEN AND GIRLS",
    "DOMESTIC VIOLENCE",
    "MURDER",
    "HURT/GREVIOUS HURT",
    "TOTAL IPC CRIMES",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCatalog {
    allowed: Vec<String>,
}

impl Default for CategoryCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_CATEGORIES.iter().map(|c| c.to_string()))
    }
}

impl CategoryCatalog {
    /// Entries are trimmed; duplicates keep their first position.
    pub fn new(allowed: impl IntoIterator<Item = String>) -> Self {
        let mut out: Vec<String> = Vec::new();
        for category in allowed {
            let category = category.trim().to_string();
            if !category.is_empty() && !out.contains(&category) {
                out.push(category);
            }
        }
        Self { allowed: out }
    }

    pub fn allowed(&self) -> &[String] {
        &self.allowed
    }

    pub fn contains(&self, category: &str) -> bool {
        self.allowed.iter().any(|c| c == category)
    }

    /// Allow-list entries present among `columns`, in allow-list order.
    /// Column names are compared after trimming.
    pub fn resolve<S: AsRef<str>>(&self, columns: &[S]) -> Vec<String> {
        self.allowed
            .iter()
            .filter(|c| columns.iter().any(|col| col.as_ref().trim() == c.as_str()))
            .cloned()
            .collect()
    }
}

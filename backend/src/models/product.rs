//! Product catalog value objects.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Product category. The demand model, quantity ranges, and damage rates are
/// all keyed by this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Category {
    Seeds,
    Fertilizer,
    Pesticides,
    Tools,
    #[serde(rename = "Spare Parts")]
    SpareParts,
    Packaging,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Seeds,
        Category::Fertilizer,
        Category::Pesticides,
        Category::Tools,
        Category::SpareParts,
        Category::Packaging,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Seeds => "Seeds",
            Category::Fertilizer => "Fertilizer",
            Category::Pesticides => "Pesticides",
            Category::Tools => "Tools",
            Category::SpareParts => "Spare Parts",
            Category::Packaging => "Packaging",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A sellable product variant, as provisioned in the external system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub product_tmpl_id: i64,
    pub product_id: i64,
    /// SKU / internal reference
    pub default_code: String,
    pub name: String,
    pub category: Category,
    pub uom_id: i64,
    pub uom_name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_labels_are_distinct() {
        let mut labels: Vec<&str> = Category::ALL.iter().map(|c| c.label()).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), Category::ALL.len());
    }

    #[test]
    fn test_spare_parts_serde_rename() {
        let json = serde_json::to_string(&Category::SpareParts).unwrap();
        assert_eq!(json, "\"Spare Parts\"");
        let back: Category = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Category::SpareParts);
    }
}

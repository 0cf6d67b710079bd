//! Material categories and token classification.
//!
//! The category of an item is derived from the token itself: the code point of
//! the first character, modulo 4, plus one, selects a category code. This is a
//! placeholder for a real checksum or registry lookup; distinct tokens sharing
//! a first character modulo 4 always land in the same category.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::normalize::Token;

/// Name reported for tokens that map to no configured category.
pub const UNKNOWN_CATEGORY: &str = "Unknown";

/// Number of distinct codes the first-character derivation can produce.
const CODE_SPACE: u32 = 4;

/// Immutable material category.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// Identifying code matched against the derived code.
    pub code: u8,
    /// Deposit value in minor units (cents).
    pub value: u64,
}

impl Category {
    pub fn new(name: &str, code: u8, value: u64) -> Self {
        Self {
            name: name.to_string(),
            code,
            value,
        }
    }
}

/// Result of classifying a token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub category: String,
    pub value: u64,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            category: UNKNOWN_CATEGORY.to_string(),
            value: 0,
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.category == UNKNOWN_CATEGORY
    }
}

/// Fixed category set, known at startup and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CategoryTable {
    categories: Vec<Category>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            categories: vec![
                Category::new("PET", 1, 25),
                Category::new("HDPE", 2, 20),
                Category::new("ALU", 3, 30),
                Category::new("GLASS", 4, 15),
            ],
        }
    }
}

impl CategoryTable {
    /// Build a table, rejecting duplicate codes and blank names.
    pub fn new(categories: Vec<Category>) -> Result<Self> {
        let mut codes = HashSet::new();
        for category in &categories {
            if category.name.trim().is_empty() {
                return Err(anyhow!("category name must not be empty"));
            }
            if category.name == UNKNOWN_CATEGORY {
                return Err(anyhow!("category name {} is reserved", UNKNOWN_CATEGORY));
            }
            if !codes.insert(category.code) {
                return Err(anyhow!(
                    "duplicate category code {} ({})",
                    category.code,
                    category.name
                ));
            }
        }
        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn by_code(&self, code: u8) -> Option<&Category> {
        self.categories.iter().find(|c| c.code == code)
    }

    /// Classify a token. `None` resolves to `Unknown` with value 0.
    pub fn resolve(&self, token: Option<&Token>) -> Classification {
        let Some(first) = token.and_then(Token::first_char) else {
            return Classification::unknown();
        };
        match self.by_code(derive_code(first)) {
            Some(category) => Classification {
                category: category.name.clone(),
                value: category.value,
            },
            None => Classification::unknown(),
        }
    }
}

/// Category code for a token starting with `first`. Always in `1..=4`.
pub fn derive_code(first: char) -> u8 {
    ((first as u32 % CODE_SPACE) + 1) as u8
}

//! Fixed category catalog.
//!
//! Categories are not user-editable: every task belongs to one of the five
//! entries below, each carrying a display color and icon.

use std::fmt;
use std::str::FromStr;

use anyhow::anyhow;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Work,
    Personal,
    Health,
    Finance,
    Learning,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Work,
        Category::Personal,
        Category::Health,
        Category::Finance,
        Category::Learning,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Work => "Work",
            Category::Personal => "Personal",
            Category::Health => "Health",
            Category::Finance => "Finance",
            Category::Learning => "Learning",
        }
    }

    pub fn info(self) -> &'static CategoryInfo {
        &CATALOG[self as usize]
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Category {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| {
                anyhow!(
                    "unknown category: {wanted} (expected one of {})",
                    Category::ALL
                        .iter()
                        .map(|c| c.name())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            })
    }
}

/// Display metadata for one catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryInfo {
    pub id: u32,
    pub category: Category,
    pub color: &'static str,
    pub icon: &'static str,
}

impl CategoryInfo {
    /// Parses the `#RRGGBB` color into its components.
    pub fn rgb(&self) -> Option<(u8, u8, u8)> {
        let hex = self.color.strip_prefix('#')?;
        if hex.len() != 6 {
            return None;
        }
        let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
        let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
        let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
        Some((r, g, b))
    }
}

pub static CATALOG: [CategoryInfo; 5] = [
    CategoryInfo {
        id: 1,
        category: Category::Work,
        color: "#4F46E5",
        icon: "💼",
    },
    CategoryInfo {
        id: 2,
        category: Category::Personal,
        color: "#10B981",
        icon: "🏠",
    },
    CategoryInfo {
        id: 3,
        category: Category::Health,
        color: "#EF4444",
        icon: "💪",
    },
    CategoryInfo {
        id: 4,
        category: Category::Finance,
        color: "#F59E0B",
        icon: "💰",
    },
    CategoryInfo {
        id: 5,
        category: Category::Learning,
        color: "#8B5CF6",
        icon: "📚",
    },
];

pub fn catalog() -> &'static [CategoryInfo] {
    &CATALOG
}

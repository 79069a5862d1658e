use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Request class with its own independent quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Text,
    Code,
    Image,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 3] = [Category::Text, Category::Code, Category::Image];

    /// The key used in the persisted `counts` object.
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Text => "text",
            Category::Code => "code",
            Category::Image => "image",
        }
    }

    /// Human-readable label shown when a request is denied.
    pub fn label(self) -> &'static str {
        match self {
            Category::Text => "Text",
            Category::Code => "Code",
            Category::Image => "Image",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known category.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown category: {0} (expected one of text, code, image)")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(Category::Text),
            "code" => Ok(Category::Code),
            "image" => Ok(Category::Image),
            _ => Err(UnknownCategory(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("text".parse::<Category>().unwrap(), Category::Text);
        assert_eq!(" Code ".parse::<Category>().unwrap(), Category::Code);
        assert_eq!("IMAGE".parse::<Category>().unwrap(), Category::Image);
    }

    #[test]
    fn test_parse_rejects_unknown_key() {
        let err = "audio".parse::<Category>().unwrap_err();
        assert_eq!(err, UnknownCategory("audio".to_string()));
    }

    #[test]
    fn test_serde_uses_lowercase_keys() {
        assert_eq!(serde_json::to_string(&Category::Image).unwrap(), "\"image\"");
        for category in Category::ALL {
            assert_eq!(category.to_string(), category.as_str());
        }
    }
}

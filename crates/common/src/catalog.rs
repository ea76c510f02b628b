//! Roles and catalog categories.

use serde::{Deserialize, Serialize};

use crate::ParseError;

/// Capability tier of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Guest,
    #[default]
    User,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Guest, Role::User, Role::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Guest => "guest",
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::new("role", s))
    }
}

/// Fixed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Tops,
    Bottoms,
    Dresses,
    Outerwear,
    Shoes,
    Accessories,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Tops,
        Category::Bottoms,
        Category::Dresses,
        Category::Outerwear,
        Category::Shoes,
        Category::Accessories,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Tops => "tops",
            Category::Bottoms => "bottoms",
            Category::Dresses => "dresses",
            Category::Outerwear => "outerwear",
            Category::Shoes => "shoes",
            Category::Accessories => "accessories",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ParseError::new("category", s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_str() {
        for role in Role::ALL {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn only_admin_is_admin() {
        assert!(Role::Admin.is_admin());
        assert!(!Role::User.is_admin());
        assert!(!Role::Guest.is_admin());
    }

    #[test]
    fn category_serializes_lowercase() {
        let json = serde_json::to_string(&Category::Tops).unwrap();
        assert_eq!(json, "\"tops\"");
        assert_eq!("TOPS".parse::<Category>().unwrap(), Category::Tops);
    }

    #[test]
    fn unknown_category_is_rejected() {
        let err = "hats".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "unknown category: hats");
    }
}

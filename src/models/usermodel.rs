use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Worker,
    Contractor,
    Homeowner,
    Shop,
}

/// Presentation data the client needs for a role.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub struct RoleDescriptor {
    pub route: &'static str,
    pub label: &'static str,
    pub icon: &'static str,
}

impl UserRole {
    pub const ALL: [UserRole; 4] = [
        UserRole::Worker,
        UserRole::Contractor,
        UserRole::Homeowner,
        UserRole::Shop,
    ];

    pub fn to_str(&self) -> &str {
        match self {
            UserRole::Worker => "worker",
            UserRole::Contractor => "contractor",
            UserRole::Homeowner => "homeowner",
            UserRole::Shop => "shop",
        }
    }

    /// The one place a role is mapped to its destination, label and icon.
    pub fn descriptor(&self) -> RoleDescriptor {
        match self {
            UserRole::Worker => RoleDescriptor {
                route: "worker",
                label: "Worker",
                icon: "hammer",
            },
            UserRole::Contractor => RoleDescriptor {
                route: "contractor",
                label: "Contractor",
                icon: "briefcase",
            },
            UserRole::Homeowner => RoleDescriptor {
                route: "homeowner",
                label: "Homeowner",
                icon: "home",
            },
            UserRole::Shop => RoleDescriptor {
                route: "shop",
                label: "Shop Owner",
                icon: "storefront",
            },
        }
    }

    pub fn route(&self) -> &'static str {
        self.descriptor().route
    }
}

impl FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        UserRole::ALL
            .into_iter()
            .find(|role| role.to_str() == s)
            .ok_or_else(|| format!("Unknown role: {}", s))
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Profile {
    #[serde(default)]
    pub id: String,
    pub role: UserRole,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Trade of a worker (plumber, mason, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub average_rating: f64,
    #[serde(default)]
    pub rating_count: i64,
    #[serde(default)]
    pub created_at: i64,
}

impl Profile {
    /// Case-insensitive match of `needle` (already lowercased) against the
    /// searchable fields.
    pub fn matches_text(&self, needle: &str) -> bool {
        if needle.is_empty() {
            return true;
        }
        [
            Some(&self.name),
            self.category.as_ref(),
            self.shop_name.as_ref(),
            self.company_name.as_ref(),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(needle))
    }
}

#[cfg(test)]
impl Profile {
    /// Bare profile with a name and email derived from `id`.
    pub fn sample(id: &str, role: UserRole) -> Self {
        Profile {
            id: id.to_string(),
            role,
            name: id.to_uppercase(),
            email: format!("{}@example.com", id),
            photo_url: None,
            logo_url: None,
            phone: None,
            location: None,
            category: None,
            shop_name: None,
            company_name: None,
            bio: None,
            average_rating: 0.0,
            rating_count: 0,
            created_at: 0,
        }
    }
}

/// Partial profile write; `None` fields are left untouched by a save.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<UserRole>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    /// Set once, by the first save.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<i64>,
}

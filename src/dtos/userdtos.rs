use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::usermodel::*;

#[derive(Validate, Debug, Clone, Serialize, Deserialize)]
pub struct RegisterUserDto {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,

    #[validate(
        length(min = 1, message = "Email is required"),
        email(message = "Email is invalid")
    )]
    pub email: String,

    #[validate(
        length(min = 1, message = "Password is required"),
        length(min = 6, message = "Password must be at least 6 characters"),
        length(max = 64, message = "Password must not be more than 64 characters")
    )]
    pub password: String,

    #[validate(
        length(min = 1, message = "Confirm Password is required"),
        must_match(other = "password", message = "passwords do not match")
    )]
    #[serde(rename = "passwordConfirm")]
    pub password_confirm: String,

    pub role: UserRole,

    #[validate(length(min = 7, max = 20, message = "Phone number must be between 7-20 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 120))]
    pub location: Option<String>,
    #[validate(length(max = 60))]
    pub category: Option<String>,
    #[validate(length(max = 120))]
    pub shop_name: Option<String>,
    #[validate(length(max = 120))]
    pub company_name: Option<String>,
}

impl RegisterUserDto {
    /// First save of the new user's profile.
    pub fn to_profile(&self, email: &str) -> ProfileUpdate {
        ProfileUpdate {
            role: Some(self.role),
            name: Some(self.name.trim().to_string()),
            email: Some(email.to_string()),
            phone: self.phone.clone(),
            location: self.location.clone(),
            category: self.category.clone(),
            shop_name: self.shop_name.clone(),
            company_name: self.company_name.clone(),
            ..Default::default()
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct LoginUserDto {
    #[validate(length(min = 1, message = "Email is required"), email(message = "Email is invalid"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProfileDto {
    /// Accepted only when it restates the current role.
    pub role: Option<UserRole>,
    #[validate(length(min = 1, max = 100, message = "Name must be between 1-100 characters"))]
    pub name: Option<String>,
    #[validate(url(message = "Photo must be a URL"))]
    pub photo_url: Option<String>,
    #[validate(url(message = "Logo must be a URL"))]
    pub logo_url: Option<String>,
    #[validate(length(min = 7, max = 20, message = "Phone number must be between 7-20 characters"))]
    pub phone: Option<String>,
    #[validate(length(max = 120))]
    pub location: Option<String>,
    #[validate(length(max = 60))]
    pub category: Option<String>,
    #[validate(length(max = 120))]
    pub shop_name: Option<String>,
    #[validate(length(max = 120))]
    pub company_name: Option<String>,
    #[validate(length(max = 1000, message = "Bio must not be more than 1000 characters"))]
    pub bio: Option<String>,
}

impl From<UpdateProfileDto> for ProfileUpdate {
    fn from(dto: UpdateProfileDto) -> Self {
        ProfileUpdate {
            role: dto.role,
            name: dto.name,
            photo_url: dto.photo_url,
            logo_url: dto.logo_url,
            phone: dto.phone,
            location: dto.location,
            category: dto.category,
            shop_name: dto.shop_name,
            company_name: dto.company_name,
            bio: dto.bio,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ProfileSearchQuery {
    pub role: Option<UserRole>,
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthData {
    pub token: String,
    pub profile: Profile,
    pub destination: RoleDescriptor,
}

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::productmodel::{NewProduct, ProductUpdate};

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct CreateProductDto {
    #[validate(length(min = 1, max = 120, message = "Title must be between 1-120 characters"))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(length(max = 10, message = "At most 10 images"))]
    #[serde(default)]
    pub images: Vec<String>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    #[serde(default)]
    pub contact_for_price: bool,
}

impl From<CreateProductDto> for NewProduct {
    fn from(dto: CreateProductDto) -> Self {
        NewProduct {
            title: dto.title,
            description: dto.description,
            images: dto.images,
            price: dto.price,
            contact_for_price: dto.contact_for_price,
        }
    }
}

#[derive(Validate, Debug, Default, Clone, Serialize, Deserialize)]
pub struct UpdateProductDto {
    #[validate(length(min = 1, max = 120, message = "Title must be between 1-120 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(max = 10, message = "At most 10 images"))]
    pub images: Option<Vec<String>>,
    #[validate(range(min = 0.0, message = "Price cannot be negative"))]
    pub price: Option<f64>,
    pub contact_for_price: Option<bool>,
}

impl From<UpdateProductDto> for ProductUpdate {
    fn from(dto: UpdateProductDto) -> Self {
        ProductUpdate {
            title: dto.title,
            description: dto.description,
            images: dto.images,
            price: dto.price,
            contact_for_price: dto.contact_for_price,
        }
    }
}

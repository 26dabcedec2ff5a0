// service/product_service.rs
use std::sync::Arc;

use crate::{
    db::{productdb::ProductExt, DBClient},
    models::{productmodel::*, usermodel::*},
    service::error::ServiceError,
};

#[derive(Debug, Clone)]
pub struct ProductService {
    db_client: Arc<DBClient>,
}

fn validate_price(price: Option<f64>) -> Result<(), ServiceError> {
    match price {
        Some(price) if price < 0.0 || !price.is_finite() => {
            Err(ServiceError::Validation("Price must be a positive amount".to_string()))
        }
        _ => Ok(()),
    }
}

impl ProductService {
    pub fn new(db_client: Arc<DBClient>) -> Self {
        Self { db_client }
    }

    pub async fn create(&self, shop: &Profile, product: NewProduct) -> Result<Product, ServiceError> {
        if shop.role != UserRole::Shop {
            return Err(ServiceError::Unauthorized(shop.id.clone(), "listing products".to_string()));
        }
        if product.title.trim().is_empty() {
            return Err(ServiceError::Validation("Title is required".to_string()));
        }
        validate_price(product.price)?;
        if product.price.is_none() && !product.contact_for_price {
            return Err(ServiceError::Validation(
                "Set a price or mark the product as contact for price".to_string(),
            ));
        }

        Ok(self.db_client.create_product(&shop.id, product).await?)
    }

    pub async fn get(&self, product_id: &str) -> Result<Option<Product>, ServiceError> {
        Ok(self.db_client.get_product(product_id).await?)
    }

    pub async fn list_by_shop(&self, shop_id: &str) -> Result<Vec<Product>, ServiceError> {
        Ok(self.db_client.get_shop_products(shop_id).await?)
    }

    /// Merge update. Setting a price takes the product off contact for
    /// price; the merged product must still have one or the other.
    pub async fn update(&self, product_id: &str, shop_id: &str, update: ProductUpdate) -> Result<Product, ServiceError> {
        let current = self.require_owned(product_id, shop_id).await?;
        let mut update = update;
        if update.title.as_deref().map_or(false, |t| t.trim().is_empty()) {
            return Err(ServiceError::Validation("Title cannot be empty".to_string()));
        }
        validate_price(update.price)?;

        if update.price.is_some() && update.contact_for_price.is_none() {
            update.contact_for_price = Some(false);
        }
        let contact_for_price = update.contact_for_price.unwrap_or(current.contact_for_price);
        if !contact_for_price && update.price.or(current.price).is_none() {
            return Err(ServiceError::Validation(
                "Set a price or mark the product as contact for price".to_string(),
            ));
        }

        let product = self.db_client.update_product(product_id, &update).await?;
        tracing::info!("Shop {} updated product {}", shop_id, product_id);
        Ok(product)
    }

    pub async fn delete(&self, product_id: &str, shop_id: &str) -> Result<(), ServiceError> {
        self.require_owned(product_id, shop_id).await?;
        self.db_client.delete_product(product_id).await?;
        tracing::info!("Shop {} deleted product {}", shop_id, product_id);
        Ok(())
    }

    async fn require_owned(&self, product_id: &str, shop_id: &str) -> Result<Product, ServiceError> {
        let product = self
            .get(product_id)
            .await?
            .ok_or_else(|| ServiceError::ProductNotFound(product_id.to_string()))?;
        if product.shop_id != shop_id {
            return Err(ServiceError::Unauthorized(shop_id.to_string(), product_id.to_string()));
        }
        Ok(product)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiles() -> NewProduct {
        NewProduct {
            title: "Floor tiles".to_string(),
            description: "60x60 porcelain".to_string(),
            price: Some(7000.0),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_only_the_owning_shop_edits() {
        let products = ProductService::new(Arc::new(DBClient::in_memory()));
        let shop = Profile::sample("s1", UserRole::Shop);
        let product = products.create(&shop, tiles()).await.unwrap();

        let err = products
            .update(&product.id, "s2", ProductUpdate::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_, _)));
        assert!(matches!(
            products.delete(&product.id, "s2").await,
            Err(ServiceError::Unauthorized(_, _))
        ));

        let updated = products
            .update(
                &product.id,
                "s1",
                ProductUpdate {
                    contact_for_price: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, None);

        products.delete(&product.id, "s1").await.unwrap();
        assert!(matches!(
            products.delete(&product.id, "s1").await,
            Err(ServiceError::ProductNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_update_keeps_price_and_contact_exclusive() {
        let products = ProductService::new(Arc::new(DBClient::in_memory()));
        let shop = Profile::sample("s1", UserRole::Shop);
        let product = products
            .create(
                &shop,
                NewProduct {
                    price: None,
                    contact_for_price: true,
                    ..tiles()
                },
            )
            .await
            .unwrap();

        let priced = products
            .update(
                &product.id,
                "s1",
                ProductUpdate {
                    price: Some(10.0),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(priced.price, Some(10.0));
        assert!(!priced.contact_for_price);

        let on_request = products
            .update(
                &product.id,
                "s1",
                ProductUpdate {
                    price: Some(12.0),
                    contact_for_price: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(on_request.price, None);
        assert!(on_request.contact_for_price);

        let err = products
            .update(
                &product.id,
                "s1",
                ProductUpdate {
                    contact_for_price: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));

        let stored = products.get(&product.id).await.unwrap().unwrap();
        assert_eq!(stored, on_request);
    }

    #[tokio::test]
    async fn test_create_checks_role_and_price() {
        let products = ProductService::new(Arc::new(DBClient::in_memory()));

        assert!(matches!(
            products.create(&Profile::sample("w1", UserRole::Worker), tiles()).await,
            Err(ServiceError::Unauthorized(_, _))
        ));

        let shop = Profile::sample("s1", UserRole::Shop);
        assert!(matches!(
            products
                .create(&shop, NewProduct { price: None, ..tiles() })
                .await,
            Err(ServiceError::Validation(_))
        ));
        assert!(matches!(
            products
                .create(&shop, NewProduct { price: Some(-1.0), ..tiles() })
                .await,
            Err(ServiceError::Validation(_))
        ));
        assert!(products.list_by_shop("s1").await.unwrap().is_empty());
    }
}

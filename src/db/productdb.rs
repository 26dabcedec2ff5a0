// db/productdb.rs
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;

use super::document::{encode, Direction, Filter, Query, StoreError};
use super::DBClient;
use crate::models::productmodel::*;

pub const PRODUCTS: &str = "products";

#[async_trait]
pub trait ProductExt {
    async fn create_product(&self, shop_id: &str, product: NewProduct) -> Result<Product, StoreError>;

    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, StoreError>;

    async fn get_shop_products(&self, shop_id: &str) -> Result<Vec<Product>, StoreError>;

    async fn update_product(&self, product_id: &str, update: &ProductUpdate) -> Result<Product, StoreError>;

    async fn delete_product(&self, product_id: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl ProductExt for DBClient {
    async fn create_product(&self, shop_id: &str, product: NewProduct) -> Result<Product, StoreError> {
        let mut record = Product {
            id: String::new(),
            shop_id: shop_id.to_string(),
            title: product.title,
            description: product.description,
            images: product.images,
            price: product.price,
            contact_for_price: product.contact_for_price,
            created_at: Utc::now().timestamp_millis(),
        };
        if record.contact_for_price {
            record.price = None;
        }

        record.id = self.store.insert(PRODUCTS, encode(&record)?).await?;
        tracing::info!("Shop {} listed product {}", shop_id, record.id);
        Ok(record)
    }

    async fn get_product(&self, product_id: &str) -> Result<Option<Product>, StoreError> {
        self.store
            .get(PRODUCTS, product_id)
            .await?
            .map(|doc| doc.decode())
            .transpose()
    }

    async fn get_shop_products(&self, shop_id: &str) -> Result<Vec<Product>, StoreError> {
        let query = Query::collection(PRODUCTS)
            .filter(Filter::eq("shop_id", shop_id))
            .order_by("created_at", Direction::Descending);

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(|doc| doc.decode())
            .collect()
    }

    async fn update_product(&self, product_id: &str, update: &ProductUpdate) -> Result<Product, StoreError> {
        let mut data = encode(update)?;
        if update.contact_for_price == Some(true) {
            data.insert("price".to_string(), Value::Null);
        }
        self.store.update(PRODUCTS, product_id, data).await?;

        self.get_product(product_id)
            .await?
            .ok_or_else(|| StoreError::not_found(PRODUCTS, product_id))
    }

    async fn delete_product(&self, product_id: &str) -> Result<(), StoreError> {
        self.store.delete(PRODUCTS, product_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cement() -> NewProduct {
        NewProduct {
            title: "Cement 50kg".to_string(),
            description: "Portland cement".to_string(),
            images: vec!["https://cdn.example.com/cement.jpg".to_string()],
            price: Some(9500.0),
            contact_for_price: false,
        }
    }

    #[tokio::test]
    async fn test_product_lifecycle() {
        let db = DBClient::in_memory();
        let product = db.create_product("s1", cement()).await.unwrap();
        assert_eq!(db.get_shop_products("s1").await.unwrap(), vec![product.clone()]);

        let updated = db
            .update_product(
                &product.id,
                &ProductUpdate {
                    title: Some("Cement 25kg".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "Cement 25kg");
        assert_eq!(updated.price, Some(9500.0));
        assert_eq!(updated.description, "Portland cement");

        db.delete_product(&product.id).await.unwrap();
        assert!(db.get_product(&product.id).await.unwrap().is_none());
        assert!(db.get_shop_products("s1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_contact_for_price_clears_price() {
        let db = DBClient::in_memory();
        let product = db
            .create_product(
                "s1",
                NewProduct {
                    contact_for_price: true,
                    ..cement()
                },
            )
            .await
            .unwrap();
        assert_eq!(product.price, None);

        let other = db.create_product("s1", cement()).await.unwrap();
        let updated = db
            .update_product(
                &other.id,
                &ProductUpdate {
                    contact_for_price: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(updated.contact_for_price);
        assert_eq!(updated.price, None);
    }
}

use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::repo_types::{NewProduct, Product, ProductChanges};
use crate::error::StoreError;

#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Newest first.
    async fn list(&self) -> Result<Vec<Product>, StoreError>;
    async fn create(&self, product: NewProduct) -> Result<Product, StoreError>;
    async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Product, StoreError>;
    async fn delete(&self, id: Uuid) -> Result<(), StoreError>;
    /// Drops every product and inserts `products`; returns how many were inserted.
    async fn replace_all(&self, products: Vec<NewProduct>) -> Result<usize, StoreError>;
}

pub struct PgProductStore {
    db: PgPool,
}

impl PgProductStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, name, description, price, image, created_at, updated_at
            FROM products
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.db)
        .await?;
        Ok(rows)
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (id, name, description, price, image)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, description, price, image, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&product.name)
        .bind(&product.description)
        .bind(product.price)
        .bind(&product.image)
        .fetch_one(&self.db)
        .await?;
        Ok(row)
    }

    async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Product, StoreError> {
        let row = sqlx::query_as::<_, Product>(
            r#"
            UPDATE products
               SET name        = COALESCE($2, name),
                   description = COALESCE($3, description),
                   price       = COALESCE($4, price),
                   image       = COALESCE($5, image),
                   updated_at  = clock_timestamp()
             WHERE id = $1
            RETURNING id, name, description, price, image, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(changes.name)
        .bind(changes.description)
        .bind(changes.price)
        .bind(changes.image)
        .fetch_optional(&self.db)
        .await?;
        row.ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn replace_all(&self, products: Vec<NewProduct>) -> Result<usize, StoreError> {
        let mut tx = self.db.begin().await?;
        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;
        for p in &products {
            sqlx::query(
                r#"
                INSERT INTO products (id, name, description, price, image)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(&p.name)
            .bind(&p.description)
            .bind(p.price)
            .bind(&p.image)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(products.len())
    }
}

/// Products kept in insertion order.
#[derive(Default)]
pub struct MemoryProductStore {
    products: RwLock<Vec<Product>>,
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn list(&self) -> Result<Vec<Product>, StoreError> {
        // reversed first so that equal timestamps still come out newest-first
        let mut out: Vec<Product> = self.products.read().await.iter().rev().cloned().collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn create(&self, product: NewProduct) -> Result<Product, StoreError> {
        let now = OffsetDateTime::now_utc();
        let record = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            image: product.image,
            created_at: now,
            updated_at: now,
        };
        self.products.write().await.push(record.clone());
        Ok(record)
    }

    async fn update(&self, id: Uuid, changes: ProductChanges) -> Result<Product, StoreError> {
        let mut products = self.products.write().await;
        let p = products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::NotFound)?;
        if let Some(name) = changes.name {
            p.name = name;
        }
        if let Some(description) = changes.description {
            p.description = description;
        }
        if let Some(price) = changes.price {
            p.price = price;
        }
        if let Some(image) = changes.image {
            p.image = image;
        }
        p.updated_at = OffsetDateTime::now_utc();
        Ok(p.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let mut products = self.products.write().await;
        let before = products.len();
        products.retain(|p| p.id != id);
        if products.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn replace_all(&self, products: Vec<NewProduct>) -> Result<usize, StoreError> {
        self.products.write().await.clear();
        let n = products.len();
        for p in products {
            self.create(p).await?;
        }
        Ok(n)
    }
}

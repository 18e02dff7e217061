use anyhow::Context;
use uuid::Uuid;

use super::{
    dto::{CreateProductRequest, UpdateProductRequest},
    repo::ProductStore,
    repo_types::{NewProduct, ProductChanges},
};
use crate::error::AppError;

pub(crate) const PRODUCT_NOT_FOUND: &str = "product not found";

fn check_price(price: f64) -> Result<f64, AppError> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::Validation(
            "price must be a non-negative number".into(),
        ));
    }
    Ok(price)
}

fn check_name(name: String) -> Result<String, AppError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::Validation("name is required".into()));
    }
    Ok(name)
}

pub fn validate_new(req: CreateProductRequest) -> Result<NewProduct, AppError> {
    let name = check_name(req.name.unwrap_or_default())?;
    let price = req
        .price
        .ok_or_else(|| AppError::Validation("price is required".into()))
        .and_then(check_price)?;
    Ok(NewProduct {
        name,
        description: req.description.unwrap_or_default(),
        price,
        image: req.image.unwrap_or_default(),
    })
}

pub fn validate_changes(req: UpdateProductRequest) -> Result<ProductChanges, AppError> {
    Ok(ProductChanges {
        name: req.name.map(check_name).transpose()?,
        description: req.description,
        price: req.price.map(check_price).transpose()?,
        image: req.image,
    })
}

/// Unparseable ids cannot name a product, so they are reported as missing.
pub fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound(PRODUCT_NOT_FOUND.into()))
}

/// Replaces the catalog with a JSON array of `{name, description, price, image}`.
pub async fn seed_from_json(store: &dyn ProductStore, json: &str) -> anyhow::Result<usize> {
    let products: Vec<NewProduct> =
        serde_json::from_str(json).context("parse product seed file")?;
    for p in &products {
        anyhow::ensure!(!p.name.trim().is_empty(), "seed product without a name");
        anyhow::ensure!(
            p.price.is_finite() && p.price >= 0.0,
            "seed product {:?} has an invalid price",
            p.name
        );
    }
    let n = store
        .replace_all(products)
        .await
        .context("replace products")?;
    Ok(n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::repo::MemoryProductStore;

    #[test]
    fn validate_new_requires_name_and_price() {
        assert!(validate_new(CreateProductRequest::default()).is_err());
        assert!(validate_new(CreateProductRequest {
            name: Some("  ".into()),
            price: Some(1.0),
            ..Default::default()
        })
        .is_err());
        assert!(validate_new(CreateProductRequest {
            name: Some("Violin".into()),
            price: Some(-1.0),
            ..Default::default()
        })
        .is_err());

        let p = validate_new(CreateProductRequest {
            name: Some(" Violin ".into()),
            price: Some(120.0),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(p.name, "Violin");
        assert_eq!(p.description, "");
    }

    #[test]
    fn validate_changes_checks_only_supplied_fields() {
        let c = validate_changes(UpdateProductRequest::default()).unwrap();
        assert!(c.name.is_none() && c.price.is_none());
        assert!(validate_changes(UpdateProductRequest {
            price: Some(f64::NAN),
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn parse_id_maps_garbage_to_not_found() {
        let err = parse_id("not-a-uuid").unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(parse_id(&Uuid::new_v4().to_string()).is_ok());
    }

    #[tokio::test]
    async fn seed_from_json_replaces_catalog() {
        let store = MemoryProductStore::default();
        let json = r#"[
            {"name": "Piano", "description": "Upright", "price": 1500, "image": "piano.jpg"},
            {"name": "Flute", "price": 80.5}
        ]"#;
        assert_eq!(seed_from_json(&store, json).await.unwrap(), 2);
        assert_eq!(store.list().await.unwrap().len(), 2);

        assert!(seed_from_json(&store, r#"[{"name": "", "price": 1}]"#).await.is_err());
        assert!(seed_from_json(&store, "{}").await.is_err());
    }
}

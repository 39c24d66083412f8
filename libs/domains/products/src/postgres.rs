use async_trait::async_trait;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, TransactionTrait,
};
use uuid::Uuid;

use crate::{
    entity,
    error::{ProductError, ProductResult},
    models::{CreateProduct, Product, ProductFilter, UpdateProduct},
    repository::ProductRepository,
};

/// PostgreSQL-backed repository.
///
/// Every operation runs inside its own transaction. A transaction dropped
/// before `commit` (any `?` exit) is rolled back.
#[derive(Clone)]
pub struct PgProductRepository {
    db: DatabaseConnection,
}

impl PgProductRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

/// `%value%` for ILIKE with `\`, `%` and `_` matched literally
fn contains_pattern(value: &str) -> String {
    let mut pattern = String::with_capacity(value.len() + 2);
    pattern.push('%');
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

#[async_trait]
impl ProductRepository for PgProductRepository {
    async fn create(&self, input: CreateProduct) -> ProductResult<Product> {
        let txn = self.db.begin().await?;

        let active_model: entity::ActiveModel = Product::new(input).into();
        let model = active_model.insert(&txn).await?;

        txn.commit().await?;

        tracing::info!(product_id = %model.id, "Created product");
        Ok(model.into())
    }

    async fn get_by_id(&self, id: Uuid) -> ProductResult<Option<Product>> {
        let txn = self.db.begin().await?;
        let model = entity::Entity::find_by_id(id).one(&txn).await?;
        txn.commit().await?;

        Ok(model.map(Into::into))
    }

    async fn list(&self, filter: ProductFilter) -> ProductResult<Vec<Product>> {
        let mut query = entity::Entity::find();

        if let Some(name) = filter.name() {
            query = query.filter(
                Expr::col((entity::Entity, entity::Column::Name)).ilike(contains_pattern(name)),
            );
        }

        if let Some(category) = filter.category() {
            query = query.filter(
                Expr::col((entity::Entity, entity::Column::Category))
                    .ilike(contains_pattern(category)),
            );
        }

        let txn = self.db.begin().await?;
        let models = query
            .order_by_asc(entity::Column::CreatedAt)
            .order_by_asc(entity::Column::Id)
            .all(&txn)
            .await?;
        txn.commit().await?;

        tracing::debug!(count = models.len(), "Listed products");
        Ok(models.into_iter().map(Into::into).collect())
    }

    async fn update(&self, id: Uuid, input: UpdateProduct) -> ProductResult<Product> {
        let txn = self.db.begin().await?;

        let mut product: Product = entity::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or(ProductError::NotFound(id))?
            .into();

        product.apply_update(input);

        let active_model: entity::ActiveModel = product.into();
        let model = active_model.update(&txn).await?;

        txn.commit().await?;

        tracing::info!(product_id = %id, "Updated product");
        Ok(model.into())
    }

    async fn delete(&self, id: Uuid) -> ProductResult<bool> {
        let txn = self.db.begin().await?;
        let result = entity::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        if result.rows_affected > 0 {
            tracing::info!(product_id = %id, "Deleted product");
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

//! Product persistence operations on the `products` table.

use chrono::NaiveDate;
use netnode_core::{NodeId, Product, ProductId};
use sqlx::PgPool;
use uuid::Uuid;

pub async fn insert(pool: &PgPool, product: &Product) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO products (id, name, model, release_date, network_node_id)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(product.id.0)
    .bind(&product.name)
    .bind(&product.model)
    .bind(product.release_date)
    .bind(product.network_node.0)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update(pool: &PgPool, product: &Product) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE products SET name = $1, model = $2, release_date = $3, network_node_id = $4
         WHERE id = $5",
    )
    .bind(&product.name)
    .bind(&product.model)
    .bind(product.release_date)
    .bind(product.network_node.0)
    .bind(product.id.0)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: ProductId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM products WHERE id = $1")
        .bind(id.0)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn load_all(pool: &PgPool) -> Result<Vec<Product>, sqlx::Error> {
    let rows = sqlx::query_as::<_, ProductRow>(
        "SELECT id, name, model, release_date, network_node_id FROM products ORDER BY name, id",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(ProductRow::into_record).collect())
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    model: String,
    release_date: NaiveDate,
    network_node_id: Uuid,
}

impl ProductRow {
    fn into_record(self) -> Product {
        Product {
            id: ProductId(self.id),
            name: self.name,
            model: self.model,
            release_date: self.release_date,
            network_node: NodeId(self.network_node_id),
        }
    }
}

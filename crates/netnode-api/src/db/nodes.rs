//! Network node persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `network_nodes` table.

use chrono::{DateTime, Utc};
use netnode_core::{Debt, NetworkNode, NodeId, NodeType};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

const COLUMNS: &str = "id, name, node_type, email, country, city, street, house_number, \
                       supplier_id, debt, created_at";

/// Insert a new node.
pub async fn insert(pool: &PgPool, node: &NetworkNode) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO network_nodes (id, name, node_type, email, country, city, street,
         house_number, supplier_id, debt, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
    )
    .bind(node.id.0)
    .bind(&node.name)
    .bind(node.node_type.as_str())
    .bind(&node.email)
    .bind(&node.country)
    .bind(&node.city)
    .bind(&node.street)
    .bind(&node.house_number)
    .bind(node.supplier.map(|s| s.0))
    .bind(node.debt.amount())
    .bind(node.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist the writable fields of an existing node. Debt is not touched.
pub async fn update(pool: &PgPool, node: &NetworkNode) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE network_nodes SET name = $1, node_type = $2, email = $3, country = $4,
         city = $5, street = $6, house_number = $7, supplier_id = $8
         WHERE id = $9",
    )
    .bind(&node.name)
    .bind(node.node_type.as_str())
    .bind(&node.email)
    .bind(&node.country)
    .bind(&node.city)
    .bind(&node.street)
    .bind(&node.house_number)
    .bind(node.supplier.map(|s| s.0))
    .bind(node.id.0)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Zero the debt of one node.
pub async fn clear_debt(pool: &PgPool, id: NodeId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE network_nodes SET debt = 0 WHERE id = $1")
        .bind(id.0)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Zero the debt of every listed node. Returns the number of rows touched.
pub async fn clear_debt_many(pool: &PgPool, ids: &[NodeId]) -> Result<u64, sqlx::Error> {
    let ids: Vec<Uuid> = ids.iter().map(|id| id.0).collect();
    let result = sqlx::query("UPDATE network_nodes SET debt = 0 WHERE id = ANY($1)")
        .bind(&ids)
        .execute(pool)
        .await?;

    Ok(result.rows_affected())
}

/// Delete a node. Dependents and products follow the foreign-key rules.
pub async fn delete(pool: &PgPool, id: NodeId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("DELETE FROM network_nodes WHERE id = $1")
        .bind(id.0)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load every node, oldest first.
pub async fn load_all(pool: &PgPool) -> Result<Vec<NetworkNode>, sqlx::Error> {
    let rows = sqlx::query_as::<_, NodeRow>(&format!(
        "SELECT {COLUMNS} FROM network_nodes ORDER BY created_at"
    ))
    .fetch_all(pool)
    .await?;

    let mut nodes = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_record() {
            Some(node) => nodes.push(node),
            None => tracing::error!("skipping network node row that failed validation during load_all"),
        }
    }
    Ok(nodes)
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct NodeRow {
    id: Uuid,
    name: String,
    node_type: String,
    email: String,
    country: String,
    city: String,
    street: String,
    house_number: String,
    supplier_id: Option<Uuid>,
    debt: Decimal,
    created_at: DateTime<Utc>,
}

impl NodeRow {
    fn into_record(self) -> Option<NetworkNode> {
        let node_type: NodeType = match self.node_type.parse() {
            Ok(t) => t,
            Err(()) => {
                tracing::warn!(
                    id = %self.id,
                    node_type = %self.node_type,
                    "skipping network node row with unknown node_type"
                );
                return None;
            }
        };
        let debt = match Debt::new(self.debt) {
            Ok(debt) => debt,
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "skipping network node row with invalid debt");
                return None;
            }
        };
        Some(NetworkNode {
            id: NodeId(self.id),
            name: self.name,
            node_type,
            email: self.email,
            country: self.country,
            city: self.city,
            street: self.street,
            house_number: self.house_number,
            supplier: self.supplier_id.map(NodeId),
            debt,
            created_at: self.created_at,
        })
    }
}

//! # OpenAPI Specification Assembly
//!
//! Collects every utoipa-documented handler and DTO into one OpenAPI
//! document, served unauthenticated at `/api/schema/`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the bearer token security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "Account token. Accounts are managed with `netnode account`.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "netnode API",
        version = "0.1.0",
        description = "Electronics distribution network: factories, retail chains and individual entrepreneurs, their supplier hierarchy, debts and products.\n\nAll `/api/network-nodes/` and `/api/products/` endpoints require `Authorization: Bearer <token>`. Debt can only be changed through the clear_debt actions.",
        license(name = "MIT")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    paths(
        crate::routes::network_nodes::list_nodes,
        crate::routes::network_nodes::create_node,
        crate::routes::network_nodes::get_node,
        crate::routes::network_nodes::update_node,
        crate::routes::network_nodes::partial_update_node,
        crate::routes::network_nodes::delete_node,
        crate::routes::network_nodes::dependent_nodes,
        crate::routes::network_nodes::clear_debt,
        crate::routes::network_nodes::bulk_clear_debt,
        crate::routes::products::list_products,
        crate::routes::products::create_product,
        crate::routes::products::get_product,
        crate::routes::products::update_product,
        crate::routes::products::partial_update_product,
        crate::routes::products::delete_product,
    ),
    components(
        schemas(
            crate::error::ErrorBody,
            crate::error::ErrorDetail,
            crate::pagination::NodePage,
            crate::pagination::ProductPage,
            crate::routes::network_nodes::NodeDetail,
            crate::routes::network_nodes::ProductSummary,
            crate::routes::network_nodes::CreateNodeRequest,
            crate::routes::network_nodes::UpdateNodeRequest,
            crate::routes::network_nodes::BulkClearDebtRequest,
            crate::routes::network_nodes::ClearDebtResponse,
            crate::routes::network_nodes::BulkClearDebtResponse,
            crate::routes::products::ProductDetail,
            crate::routes::products::ProductRequest,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "network_nodes", description = "Distribution network nodes, hierarchy and debt"),
        (name = "products", description = "Products offered by network nodes"),
    )
)]
pub struct ApiDoc;

/// Build the schema router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/schema/", get(openapi_json))
}

/// GET /api/schema/ — Return the generated OpenAPI document.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

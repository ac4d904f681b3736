//! # Product API
//!
//! Routes:
//! - GET    /api/products/ — Paginated, filterable product list
//! - POST   /api/products/ — Create a product for an existing node
//! - GET    /api/products/:id/ — Product detail
//! - PUT    /api/products/:id/ — Full update
//! - PATCH  /api/products/:id/ — Partial update
//! - DELETE /api/products/:id/ — Delete

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use chrono::NaiveDate;
use netnode_core::{FieldErrors, NewProduct, NodeId, Product, ProductFields, ProductId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{
    extract_json, extract_query, extract_validated_json, parse_product_id, Validate,
};
use crate::filters::ProductListQuery;
use crate::pagination::{paginate, Page};
use crate::routes::network_nodes::invalid_pk;
use crate::state::AppState;

/// Read shape of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProductDetail {
    pub id: Uuid,
    pub name: String,
    pub model: String,
    pub release_date: NaiveDate,
    /// Owning node.
    pub network_node: Uuid,
}

impl From<Product> for ProductDetail {
    fn from(product: Product) -> Self {
        Self {
            id: product.id.0,
            name: product.name,
            model: product.model,
            release_date: product.release_date,
            network_node: product.network_node.0,
        }
    }
}

/// Product creation and update payload.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ProductRequest {
    pub name: Option<String>,
    pub model: Option<String>,
    /// `YYYY-MM-DD`.
    #[schema(example = "2024-01-15")]
    pub release_date: Option<String>,
    pub network_node: Option<Uuid>,
}

impl ProductRequest {
    fn into_fields(self) -> ProductFields {
        ProductFields {
            name: self.name,
            model: self.model,
            release_date: self.release_date,
            network_node: self.network_node.map(NodeId),
        }
    }
}

impl Validate for ProductRequest {
    type Valid = NewProduct;

    fn validate(self) -> Result<NewProduct, FieldErrors> {
        self.into_fields().into_new()
    }
}

fn product_not_found(id: ProductId) -> AppError {
    AppError::NotFound(format!("product {id} not found"))
}

/// Build the product router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/products/", get(list_products).post(create_product))
        .route(
            "/api/products/:id/",
            get(get_product)
                .put(update_product)
                .patch(partial_update_product)
                .delete(delete_product),
        )
}

/// GET /api/products/ — List products ordered by name.
#[utoipa::path(
    get,
    path = "/api/products/",
    params(ProductListQuery),
    responses(
        (status = 200, description = "One page of products", body = crate::pagination::ProductPage),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorBody),
        (status = 404, description = "Invalid page", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
async fn list_products(
    State(state): State<AppState>,
    _caller: Caller,
    query: Result<Query<ProductListQuery>, QueryRejection>,
) -> Result<Json<Page<ProductDetail>>, AppError> {
    let query = extract_query(query)?;
    let filter = query.filter()?;

    let mut products: Vec<Product> = state
        .products
        .list()
        .into_iter()
        .filter(|p| filter.matches(p))
        .collect();
    products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

    let page = paginate(products, &query.page_params(), state.config.page_size)?;
    Ok(Json(page.try_map(|p| Ok::<_, AppError>(ProductDetail::from(p)))?))
}

/// POST /api/products/ — Create a product.
#[utoipa::path(
    post,
    path = "/api/products/",
    request_body = ProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductDetail),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
async fn create_product(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductDetail>), AppError> {
    let new = extract_validated_json(body)?;

    // The gate keeps the owner from being deleted before the product lands.
    let _write = state.begin_write().await;
    if !state.nodes.contains(&new.network_node) {
        return Err(AppError::field("network_node", invalid_pk(new.network_node)));
    }
    let product = Product::create(ProductId::new(), new);

    if let Some(pool) = &state.db_pool {
        crate::db::products::insert(pool, &product)
            .await
            .map_err(|e| AppError::database("failed to persist product", e))?;
    }
    state.products.insert(product.id, product.clone());

    tracing::info!(
        product_id = %product.id,
        node_id = %product.network_node,
        user = %caller.username,
        "product created"
    );

    Ok((StatusCode::CREATED, Json(product.into())))
}

/// GET /api/products/:id/ — Product detail.
#[utoipa::path(
    get,
    path = "/api/products/{id}/",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 200, description = "Product found", body = ProductDetail),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
async fn get_product(
    State(state): State<AppState>,
    _caller: Caller,
    Path(raw_id): Path<String>,
) -> Result<Json<ProductDetail>, AppError> {
    let id = parse_product_id(&raw_id)?;
    let product = state.products.get(&id).ok_or_else(|| product_not_found(id))?;
    Ok(Json(product.into()))
}

/// PUT /api/products/:id/ — Replace every field.
#[utoipa::path(
    put,
    path = "/api/products/{id}/",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductDetail),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
async fn update_product(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Json<ProductDetail>, AppError> {
    apply_update(&state, &caller, &raw_id, body, false).await
}

/// PATCH /api/products/:id/ — Change a subset of fields.
#[utoipa::path(
    patch,
    path = "/api/products/{id}/",
    params(("id" = Uuid, Path, description = "Product ID")),
    request_body = ProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductDetail),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
async fn partial_update_product(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
    body: Result<Json<ProductRequest>, JsonRejection>,
) -> Result<Json<ProductDetail>, AppError> {
    apply_update(&state, &caller, &raw_id, body, true).await
}

async fn apply_update(
    state: &AppState,
    caller: &Caller,
    raw_id: &str,
    body: Result<Json<ProductRequest>, JsonRejection>,
    partial: bool,
) -> Result<Json<ProductDetail>, AppError> {
    let id = parse_product_id(raw_id)?;
    let changes = extract_json(body)?.into_fields().into_changes(partial)?;

    let _write = state.begin_write().await;
    let mut updated = state.products.get(&id).ok_or_else(|| product_not_found(id))?;
    if let Some(owner) = changes.network_node {
        if !state.nodes.contains(&owner) {
            return Err(AppError::field("network_node", invalid_pk(owner)));
        }
    }
    updated.apply(changes);

    if let Some(pool) = &state.db_pool {
        crate::db::products::update(pool, &updated)
            .await
            .map_err(|e| AppError::database("failed to persist product update", e))?;
    }
    state.products.insert(id, updated.clone());

    tracing::info!(product_id = %id, partial, user = %caller.username, "product updated");

    Ok(Json(updated.into()))
}

/// DELETE /api/products/:id/ — Delete a product.
#[utoipa::path(
    delete,
    path = "/api/products/{id}/",
    params(("id" = Uuid, Path, description = "Product ID")),
    responses(
        (status = 204, description = "Product deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "products"
)]
async fn delete_product(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_product_id(&raw_id)?;

    let _write = state.begin_write().await;
    if !state.products.contains(&id) {
        return Err(product_not_found(id));
    }

    if let Some(pool) = &state.db_pool {
        crate::db::products::delete(pool, id)
            .await
            .map_err(|e| AppError::database("failed to delete product", e))?;
    }
    state.products.remove(&id);

    tracing::info!(product_id = %id, user = %caller.username, "product deleted");

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use chrono::Utc;
    use http_body_util::BodyExt;
    use netnode_core::{Debt, NetworkNode, NodeFields};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_app(state: AppState) -> Router {
        router()
            .layer(axum::Extension(Caller {
                account_id: Uuid::new_v4(),
                username: "tester".to_string(),
            }))
            .with_state(state)
    }

    async fn body_json<T: serde::de::DeserializeOwned>(resp: axum::response::Response) -> T {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                builder = builder.header("content-type", "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        app.clone().oneshot(builder.body(body).unwrap()).await.unwrap()
    }

    fn seed_node(state: &AppState) -> NodeId {
        let new = NodeFields {
            name: Some("Plant".into()),
            node_type: Some("factory".into()),
            email: Some("plant@example.com".into()),
            country: Some("Russia".into()),
            city: Some("Moscow".into()),
            street: Some("Main".into()),
            house_number: Some("1".into()),
        }
        .into_new(None, Debt::zero())
        .unwrap();
        let node = NetworkNode::create(NodeId::new(), new, Utc::now());
        let id = node.id;
        state.nodes.insert(id, node);
        id
    }

    fn product_payload(name: &str, owner: NodeId) -> Value {
        json!({
            "name": name,
            "model": "X1",
            "release_date": "2024-01-15",
            "network_node": owner,
        })
    }

    #[tokio::test]
    async fn create_and_fetch() {
        let state = AppState::new();
        let owner = seed_node(&state);
        let app = test_app(state);

        let resp = send(&app, "POST", "/api/products/", Some(product_payload("Phone", owner))).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: ProductDetail = body_json(resp).await;
        assert_eq!(created.network_node, owner.0);
        assert_eq!(created.release_date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());

        let resp = send(&app, "GET", &format!("/api/products/{}/", created.id), None).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let fetched: ProductDetail = body_json(resp).await;
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn unknown_owner_is_field_error() {
        let app = test_app(AppState::new());
        let resp = send(
            &app,
            "POST",
            "/api/products/",
            Some(product_payload("Phone", NodeId::new())),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(resp).await;
        assert!(body["error"]["details"]["network_node"].is_array());
    }

    #[tokio::test]
    async fn bad_release_date_is_field_error() {
        let state = AppState::new();
        let owner = seed_node(&state);
        let app = test_app(state);
        let mut payload = product_payload("Phone", owner);
        payload["release_date"] = json!("15.01.2024");
        let resp = send(&app, "POST", "/api/products/", Some(payload)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = body_json(resp).await;
        assert!(body["error"]["details"]["release_date"].is_array());
    }

    #[tokio::test]
    async fn put_and_patch() {
        let state = AppState::new();
        let owner = seed_node(&state);
        let app = test_app(state);
        let resp = send(&app, "POST", "/api/products/", Some(product_payload("Phone", owner))).await;
        let created: ProductDetail = body_json(resp).await;
        let uri = format!("/api/products/{}/", created.id);

        let resp = send(&app, "PUT", &uri, Some(json!({ "name": "Tablet" }))).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send(&app, "PATCH", &uri, Some(json!({ "model": "X2" }))).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let patched: ProductDetail = body_json(resp).await;
        assert_eq!(patched.model, "X2");
        assert_eq!(patched.name, "Phone");
    }

    #[tokio::test]
    async fn list_filters_by_owner_and_search() {
        let state = AppState::new();
        let a = seed_node(&state);
        let b = seed_node(&state);
        let app = test_app(state);
        for (name, owner) in [("Phone", a), ("Tablet", a), ("Laptop", b)] {
            send(&app, "POST", "/api/products/", Some(product_payload(name, owner))).await;
        }

        let resp = send(&app, "GET", &format!("/api/products/?network_node={a}"), None).await;
        let page: Page<ProductDetail> = body_json(resp).await;
        assert_eq!(page.count, 2);
        assert_eq!(page.results[0].name, "Phone");

        let resp = send(&app, "GET", "/api/products/?search=LAP", None).await;
        let page: Page<ProductDetail> = body_json(resp).await;
        assert_eq!(page.count, 1);
        assert_eq!(page.results[0].name, "Laptop");
    }

    #[tokio::test]
    async fn delete_then_missing() {
        let state = AppState::new();
        let owner = seed_node(&state);
        let app = test_app(state);
        let resp = send(&app, "POST", "/api/products/", Some(product_payload("Phone", owner))).await;
        let created: ProductDetail = body_json(resp).await;
        let uri = format!("/api/products/{}/", created.id);

        assert_eq!(send(&app, "DELETE", &uri, None).await.status(), StatusCode::NO_CONTENT);
        assert_eq!(send(&app, "DELETE", &uri, None).await.status(), StatusCode::NOT_FOUND);
        assert_eq!(send(&app, "GET", "/api/products/nope/", None).await.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn failed_writes_leave_products_untouched() {
        let state = AppState::with_config(
            crate::state::AppConfig::default(),
            Some(crate::db::unreachable_pool()),
        );
        let owner = seed_node(&state);
        let app = test_app(state.clone());

        let resp = send(&app, "POST", "/api/products/", Some(product_payload("Phone", owner))).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.products.is_empty());

        let req: ProductRequest = serde_json::from_value(product_payload("Phone", owner)).unwrap();
        let product = Product::create(ProductId::new(), req.validate().unwrap());
        let id = product.id;
        state.products.insert(id, product);
        let uri = format!("/api/products/{id}/");

        let resp = send(&app, "PATCH", &uri, Some(json!({ "model": "X2" }))).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.products.get(&id).unwrap().model, "X1");

        let resp = send(&app, "DELETE", &uri, None).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(state.products.contains(&id));
    }
}

//! # Network Node API
//!
//! Routes:
//! - GET    /api/network-nodes/ — Paginated, filterable node list
//! - POST   /api/network-nodes/ — Create a node
//! - GET    /api/network-nodes/:id/ — Node detail
//! - PUT    /api/network-nodes/:id/ — Full update (debt rejected)
//! - PATCH  /api/network-nodes/:id/ — Partial update (debt rejected)
//! - DELETE /api/network-nodes/:id/ — Delete; products cascade, dependents are orphaned
//! - GET    /api/network-nodes/:id/dependent_nodes/ — Nodes supplied by this one
//! - POST   /api/network-nodes/:id/clear_debt/ — Zero one node's debt
//! - POST   /api/network-nodes/clear_debt/ — Zero debt on a list of nodes
//!
//! Every read returns the detail shape, which carries the derived
//! `hierarchy_level` and `dependent_nodes_count`. Both are computed from a
//! snapshot of the supplier links taken once per request.

use std::collections::{HashMap, HashSet};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, NaiveDate, Utc};
use netnode_core::debt::parse_debt;
use netnode_core::node::sort_newest_first;
use netnode_core::validation::{deserialize_present, NOT_NULL};
use netnode_core::{
    guard_debt_absent, Debt, FieldErrors, NetworkNode, NewNode, NodeAction, NodeFields, NodeId,
    Product, SupplierIndex,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::Caller;
use crate::error::AppError;
use crate::extractors::{
    extract_json_object, extract_query, extract_validated_json, parse_node_id, Validate,
};
use crate::filters::NodeListQuery;
use crate::pagination::{paginate, Page};
use crate::state::AppState;

/// Field error for a supplier assignment that would close a loop.
pub const CYCLE_MESSAGE: &str = "A node cannot be supplied by itself or by one of its dependents.";

// -- DTOs ---------------------------------------------------------------------

/// A product embedded in a node read.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ProductSummary {
    pub id: Uuid,
    pub name: String,
    pub model: String,
    pub release_date: NaiveDate,
}

impl From<&Product> for ProductSummary {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.0,
            name: product.name.clone(),
            model: product.model.clone(),
            release_date: product.release_date,
        }
    }
}

/// Read shape of a node.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NodeDetail {
    pub id: Uuid,
    pub name: String,
    /// `factory`, `retail` or `entrepreneur`.
    pub node_type: String,
    pub email: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub house_number: String,
    pub supplier: Option<Uuid>,
    /// Name of the supplier, `null` when there is none.
    pub supplier_name: Option<String>,
    /// Decimal with two places, e.g. `"1500.00"`.
    pub debt: String,
    pub created_at: DateTime<Utc>,
    /// Supplier hops to the root of the chain.
    pub hierarchy_level: u32,
    pub products: Vec<ProductSummary>,
    pub dependent_nodes_count: usize,
}

/// Node creation payload. Debt is optional and defaults to `0.00`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct CreateNodeRequest {
    pub name: Option<String>,
    #[schema(example = "factory")]
    pub node_type: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub supplier: Option<Uuid>,
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<String>, example = "1500.00")]
    pub debt: Option<Option<serde_json::Value>>,
}

impl Validate for CreateNodeRequest {
    type Valid = NewNode;

    fn validate(self) -> Result<NewNode, FieldErrors> {
        let mut errors = FieldErrors::new();
        let debt = match &self.debt {
            None => Some(Debt::zero()),
            Some(None) => {
                errors.add("debt", NOT_NULL);
                None
            }
            Some(Some(value)) => parse_debt(value, &mut errors),
        };
        let fields = NodeFields {
            name: self.name,
            node_type: self.node_type,
            email: self.email,
            country: self.country,
            city: self.city,
            street: self.street,
            house_number: self.house_number,
        };
        match fields.into_new(self.supplier.map(NodeId), debt.unwrap_or_default()) {
            Ok(new) => errors.finish(new),
            Err(field_errors) => {
                errors.merge(field_errors);
                Err(errors)
            }
        }
    }
}

/// Node update payload. There is no debt field; a `debt` key is rejected
/// before this type is ever deserialized.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UpdateNodeRequest {
    pub name: Option<String>,
    pub node_type: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    /// Another node's id, or `null` to detach from the supplier.
    #[serde(default, deserialize_with = "deserialize_present")]
    #[schema(value_type = Option<Uuid>)]
    pub supplier: Option<Option<Uuid>>,
}

/// Bulk clear-debt payload.
#[derive(Debug, Deserialize, ToSchema)]
pub struct BulkClearDebtRequest {
    pub ids: Vec<Uuid>,
}

impl Validate for BulkClearDebtRequest {
    type Valid = Vec<NodeId>;

    fn validate(self) -> Result<Vec<NodeId>, FieldErrors> {
        if self.ids.is_empty() {
            return Err(FieldErrors::single("ids", "This list may not be empty."));
        }
        let mut seen = HashSet::new();
        Ok(self
            .ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .map(NodeId)
            .collect())
    }
}

/// Acknowledgement of a single debt clear.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ClearDebtResponse {
    pub status: String,
    pub id: Uuid,
    pub debt: String,
}

/// Acknowledgement of a bulk debt clear.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BulkClearDebtResponse {
    pub status: String,
    /// Number of listed nodes that existed and were cleared.
    pub updated: usize,
}

// -- Detail assembly ----------------------------------------------------------

/// Everything needed to render node details, captured once per request.
struct DetailContext {
    index: SupplierIndex,
    names: HashMap<NodeId, String>,
    products: HashMap<NodeId, Vec<ProductSummary>>,
}

impl DetailContext {
    fn snapshot(state: &AppState) -> (Self, Vec<NetworkNode>) {
        let nodes = state.nodes.list();
        let context = Self::new(&nodes, state.products.list());
        (context, nodes)
    }

    fn new(nodes: &[NetworkNode], mut products: Vec<Product>) -> Self {
        products.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        let mut by_node: HashMap<NodeId, Vec<ProductSummary>> = HashMap::new();
        for product in &products {
            by_node
                .entry(product.network_node)
                .or_default()
                .push(ProductSummary::from(product));
        }
        Self {
            index: SupplierIndex::from_nodes(nodes),
            names: nodes.iter().map(|n| (n.id, n.name.clone())).collect(),
            products: by_node,
        }
    }

    fn detail(&self, node: NetworkNode) -> Result<NodeDetail, AppError> {
        let hierarchy_level = self.index.hierarchy_level(node.id).map_err(|err| {
            tracing::error!(node_id = %node.id, error = %err, "supplier graph is inconsistent");
            AppError::from(err)
        })?;
        Ok(NodeDetail {
            id: node.id.0,
            node_type: node.node_type.as_str().to_string(),
            supplier: node.supplier.map(|s| s.0),
            supplier_name: node.supplier.and_then(|s| self.names.get(&s).cloned()),
            debt: node.debt.to_string(),
            hierarchy_level,
            products: self.products.get(&node.id).cloned().unwrap_or_default(),
            dependent_nodes_count: self.index.dependents_count(node.id),
            name: node.name,
            email: node.email,
            country: node.country,
            city: node.city,
            street: node.street,
            house_number: node.house_number,
            created_at: node.created_at,
        })
    }
}

fn node_detail(state: &AppState, node: NetworkNode) -> Result<NodeDetail, AppError> {
    let (context, _) = DetailContext::snapshot(state);
    context.detail(node)
}

fn node_not_found(id: NodeId) -> AppError {
    AppError::NotFound(format!("network node {id} not found"))
}

/// Field message for a reference to a node that does not exist.
pub(crate) fn invalid_pk(id: NodeId) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

// -- Router -------------------------------------------------------------------

/// Build the network node router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/network-nodes/", get(list_nodes).post(create_node))
        .route("/api/network-nodes/clear_debt/", post(bulk_clear_debt))
        .route(
            "/api/network-nodes/:id/",
            get(get_node)
                .put(update_node)
                .patch(partial_update_node)
                .delete(delete_node),
        )
        .route(
            "/api/network-nodes/:id/dependent_nodes/",
            get(dependent_nodes),
        )
        .route("/api/network-nodes/:id/clear_debt/", post(clear_debt))
}

// -- Handlers -----------------------------------------------------------------

/// GET /api/network-nodes/ — List nodes, newest first.
#[utoipa::path(
    get,
    path = "/api/network-nodes/",
    params(NodeListQuery),
    responses(
        (status = 200, description = "One page of nodes", body = crate::pagination::NodePage),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorBody),
        (status = 404, description = "Invalid page", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn list_nodes(
    State(state): State<AppState>,
    _caller: Caller,
    query: Result<Query<NodeListQuery>, QueryRejection>,
) -> Result<Json<Page<NodeDetail>>, AppError> {
    let query = extract_query(query)?;
    let filter = query.filter()?;

    let (context, nodes) = DetailContext::snapshot(&state);
    let mut matching: Vec<NetworkNode> = nodes.into_iter().filter(|n| filter.matches(n)).collect();
    sort_newest_first(&mut matching);

    let page = paginate(matching, &query.page_params(), state.config.page_size)?;
    Ok(Json(page.try_map(|node| context.detail(node))?))
}

/// POST /api/network-nodes/ — Create a node.
#[utoipa::path(
    post,
    path = "/api/network-nodes/",
    request_body = CreateNodeRequest,
    responses(
        (status = 201, description = "Node created", body = NodeDetail),
        (status = 400, description = "Validation failed", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn create_node(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<CreateNodeRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<NodeDetail>), AppError> {
    let new = extract_validated_json(body)?;

    let _write = state.begin_write().await;
    if let Some(supplier) = new.supplier {
        if !state.nodes.contains(&supplier) {
            return Err(AppError::field("supplier", invalid_pk(supplier)));
        }
    }
    let node = NetworkNode::create(NodeId::new(), new, Utc::now());

    if let Some(pool) = &state.db_pool {
        crate::db::nodes::insert(pool, &node)
            .await
            .map_err(|e| AppError::database("failed to persist network node", e))?;
    }
    state.nodes.insert(node.id, node.clone());

    tracing::info!(
        node_id = %node.id,
        node_type = %node.node_type,
        user = %caller.username,
        "network node created"
    );

    Ok((StatusCode::CREATED, Json(node_detail(&state, node)?)))
}

/// GET /api/network-nodes/:id/ — Node detail.
#[utoipa::path(
    get,
    path = "/api/network-nodes/{id}/",
    params(("id" = Uuid, Path, description = "Node ID")),
    responses(
        (status = 200, description = "Node found", body = NodeDetail),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn get_node(
    State(state): State<AppState>,
    _caller: Caller,
    Path(raw_id): Path<String>,
) -> Result<Json<NodeDetail>, AppError> {
    let id = parse_node_id(&raw_id)?;
    let (context, nodes) = DetailContext::snapshot(&state);
    let node = nodes
        .into_iter()
        .find(|n| n.id == id)
        .ok_or_else(|| node_not_found(id))?;
    Ok(Json(context.detail(node)?))
}

/// PUT /api/network-nodes/:id/ — Replace every writable field except debt.
#[utoipa::path(
    put,
    path = "/api/network-nodes/{id}/",
    params(("id" = Uuid, Path, description = "Node ID")),
    request_body = UpdateNodeRequest,
    responses(
        (status = 200, description = "Node updated", body = NodeDetail),
        (status = 400, description = "Validation failed or debt present", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn update_node(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<NodeDetail>, AppError> {
    apply_update(&state, &caller, &raw_id, body, NodeAction::Update).await
}

/// PATCH /api/network-nodes/:id/ — Change a subset of fields except debt.
#[utoipa::path(
    patch,
    path = "/api/network-nodes/{id}/",
    params(("id" = Uuid, Path, description = "Node ID")),
    request_body = UpdateNodeRequest,
    responses(
        (status = 200, description = "Node updated", body = NodeDetail),
        (status = 400, description = "Validation failed or debt present", body = crate::error::ErrorBody),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn partial_update_node(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<NodeDetail>, AppError> {
    apply_update(&state, &caller, &raw_id, body, NodeAction::PartialUpdate).await
}

async fn apply_update(
    state: &AppState,
    caller: &Caller,
    raw_id: &str,
    body: Result<Json<serde_json::Value>, JsonRejection>,
    action: NodeAction,
) -> Result<Json<NodeDetail>, AppError> {
    let id = parse_node_id(raw_id)?;
    let payload = extract_json_object(body)?;

    if !action.accepts_debt() {
        guard_debt_absent(payload.keys().map(String::as_str))?;
    }
    let partial = action
        .is_partial()
        .ok_or_else(|| AppError::Internal(format!("{action} is not an update operation")))?;

    let request: UpdateNodeRequest = serde_json::from_value(serde_json::Value::Object(payload))
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let fields = NodeFields {
        name: request.name,
        node_type: request.node_type,
        email: request.email,
        country: request.country,
        city: request.city,
        street: request.street,
        house_number: request.house_number,
    };
    let mut changes = fields.into_changes(partial)?;
    changes.supplier = request.supplier.map(|s| s.map(NodeId));

    let _write = state.begin_write().await;
    let mut updated = state.nodes.get(&id).ok_or_else(|| node_not_found(id))?;
    if let Some(Some(supplier)) = changes.supplier {
        if !state.nodes.contains(&supplier) {
            return Err(AppError::field("supplier", invalid_pk(supplier)));
        }
        if SupplierIndex::from_nodes(&state.nodes.list()).would_create_cycle(id, supplier) {
            return Err(AppError::field("supplier", CYCLE_MESSAGE));
        }
    }
    updated.apply(changes);

    if let Some(pool) = &state.db_pool {
        crate::db::nodes::update(pool, &updated)
            .await
            .map_err(|e| AppError::database("failed to persist network node update", e))?;
    }
    state.nodes.insert(id, updated.clone());

    tracing::info!(node_id = %id, action = %action, user = %caller.username, "network node updated");

    Ok(Json(node_detail(state, updated)?))
}

/// DELETE /api/network-nodes/:id/ — Delete a node.
///
/// Products of the node are deleted with it. Nodes it supplied stay and lose
/// their supplier.
#[utoipa::path(
    delete,
    path = "/api/network-nodes/{id}/",
    params(("id" = Uuid, Path, description = "Node ID")),
    responses(
        (status = 204, description = "Node deleted"),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn delete_node(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_node_id(&raw_id)?;

    let _write = state.begin_write().await;
    if !state.nodes.contains(&id) {
        return Err(node_not_found(id));
    }

    if let Some(pool) = &state.db_pool {
        crate::db::nodes::delete(pool, id)
            .await
            .map_err(|e| AppError::database("failed to delete network node", e))?;
    }

    let orphaned = state.nodes.with_write(|nodes| {
        nodes.remove(&id);
        let mut orphaned = 0usize;
        for node in nodes.values_mut().filter(|n| n.supplier == Some(id)) {
            node.supplier = None;
            orphaned += 1;
        }
        orphaned
    });
    let products_removed = state.products.retain(|p| p.network_node != id);

    tracing::info!(
        node_id = %id,
        orphaned,
        products_removed,
        user = %caller.username,
        "network node deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/network-nodes/:id/dependent_nodes/ — Nodes whose supplier is this node.
#[utoipa::path(
    get,
    path = "/api/network-nodes/{id}/dependent_nodes/",
    params(("id" = Uuid, Path, description = "Node ID")),
    responses(
        (status = 200, description = "Dependent nodes, newest first", body = [NodeDetail]),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn dependent_nodes(
    State(state): State<AppState>,
    _caller: Caller,
    Path(raw_id): Path<String>,
) -> Result<Json<Vec<NodeDetail>>, AppError> {
    let id = parse_node_id(&raw_id)?;
    let (context, nodes) = DetailContext::snapshot(&state);
    if !context.index.contains(&id) {
        return Err(node_not_found(id));
    }

    let wanted: HashSet<NodeId> = context.index.dependents_of(id).into_iter().collect();
    let mut dependents: Vec<NetworkNode> = nodes
        .into_iter()
        .filter(|n| wanted.contains(&n.id))
        .collect();
    sort_newest_first(&mut dependents);

    let details = dependents
        .into_iter()
        .map(|node| context.detail(node))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(details))
}

/// POST /api/network-nodes/:id/clear_debt/ — Zero one node's debt.
#[utoipa::path(
    post,
    path = "/api/network-nodes/{id}/clear_debt/",
    params(("id" = Uuid, Path, description = "Node ID")),
    responses(
        (status = 200, description = "Debt cleared", body = ClearDebtResponse),
        (status = 404, description = "Not found", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn clear_debt(
    State(state): State<AppState>,
    caller: Caller,
    Path(raw_id): Path<String>,
) -> Result<Json<ClearDebtResponse>, AppError> {
    let id = parse_node_id(&raw_id)?;

    let _write = state.begin_write().await;
    if !state.nodes.contains(&id) {
        return Err(node_not_found(id));
    }

    if let Some(pool) = &state.db_pool {
        crate::db::nodes::clear_debt(pool, id)
            .await
            .map_err(|e| AppError::database("failed to persist debt clear", e))?;
    }

    let mut previous = Debt::zero();
    let node = state
        .nodes
        .update(&id, |node| previous = node.clear_debt())
        .ok_or_else(|| node_not_found(id))?;

    tracing::info!(node_id = %id, previous = %previous, user = %caller.username, "debt cleared");

    Ok(Json(ClearDebtResponse {
        status: "debt cleared".to_string(),
        id: id.0,
        debt: node.debt.to_string(),
    }))
}

/// POST /api/network-nodes/clear_debt/ — Zero debt on every listed node.
///
/// Ids that name no node are skipped; `updated` counts the rest.
#[utoipa::path(
    post,
    path = "/api/network-nodes/clear_debt/",
    request_body = BulkClearDebtRequest,
    responses(
        (status = 200, description = "Debt cleared", body = BulkClearDebtResponse),
        (status = 400, description = "Empty id list", body = crate::error::ErrorBody),
    ),
    security(("bearer_auth" = [])),
    tag = "network_nodes"
)]
async fn bulk_clear_debt(
    State(state): State<AppState>,
    caller: Caller,
    body: Result<Json<BulkClearDebtRequest>, JsonRejection>,
) -> Result<Json<BulkClearDebtResponse>, AppError> {
    let ids = extract_validated_json(body)?;

    let _write = state.begin_write().await;
    let cleared: Vec<NodeId> = ids
        .iter()
        .copied()
        .filter(|id| state.nodes.contains(id))
        .collect();

    if let Some(pool) = &state.db_pool {
        if !cleared.is_empty() {
            crate::db::nodes::clear_debt_many(pool, &cleared)
                .await
                .map_err(|e| AppError::database("failed to persist bulk debt clear", e))?;
        }
    }

    state.nodes.with_write(|nodes| {
        for id in &cleared {
            if let Some(node) = nodes.get_mut(id) {
                node.clear_debt();
            }
        }
    });

    tracing::info!(
        requested = ids.len(),
        updated = cleared.len(),
        user = %caller.username,
        "bulk debt clear"
    );

    Ok(Json(BulkClearDebtResponse {
        status: "debt cleared".to_string(),
        updated: cleared.len(),
    }))
}

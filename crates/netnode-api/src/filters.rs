//! List filters for nodes and products.
//!
//! Filters are AND-ed. Location filters are case-insensitive exact matches;
//! `search` is a case-insensitive substring match.

use netnode_core::{FieldErrors, NetworkNode, NodeId, NodeType, Product};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::pagination::PageParams;

/// Query parameters for `GET /api/network-nodes/`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct NodeListQuery {
    /// Country, case-insensitive exact match.
    pub country: Option<String>,
    /// City, case-insensitive exact match.
    pub city: Option<String>,
    /// One of `factory`, `retail`, `entrepreneur`.
    pub node_type: Option<String>,
    /// Substring of name, email, or city.
    pub search: Option<String>,
    /// 1-based page number, or `last`.
    pub page: Option<String>,
    /// Results per page (capped at 100).
    pub page_size: Option<String>,
}

/// Validated node filter.
#[derive(Debug, Clone, Default)]
pub struct NodeFilter {
    pub country: Option<String>,
    pub city: Option<String>,
    pub node_type: Option<NodeType>,
    pub search: Option<String>,
}

impl NodeListQuery {
    pub fn filter(&self) -> Result<NodeFilter, FieldErrors> {
        let mut errors = FieldErrors::new();
        let node_type = match non_empty(&self.node_type) {
            Some(raw) => NodeType::parse_field(&mut errors, "node_type", raw),
            None => None,
        };
        errors.finish(NodeFilter {
            country: non_empty(&self.country).map(String::from),
            city: non_empty(&self.city).map(String::from),
            node_type,
            search: non_empty(&self.search).map(String::from),
        })
    }

    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page.clone(),
            page_size: self.page_size.clone(),
        }
    }
}

impl NodeFilter {
    pub fn matches(&self, node: &NetworkNode) -> bool {
        self.country.as_deref().map_or(true, |c| node.in_country(c))
            && self.city.as_deref().map_or(true, |c| node.in_city(c))
            && self.node_type.map_or(true, |t| node.node_type == t)
            && self.search.as_deref().map_or(true, |s| node.matches_search(s))
    }
}

/// Query parameters for `GET /api/products/`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductListQuery {
    /// Owning node id.
    pub network_node: Option<String>,
    /// Substring of name or model.
    pub search: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

/// Validated product filter.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub network_node: Option<NodeId>,
    pub search: Option<String>,
}

impl ProductListQuery {
    pub fn filter(&self) -> Result<ProductFilter, FieldErrors> {
        let mut errors = FieldErrors::new();
        let network_node = match non_empty(&self.network_node) {
            Some(raw) => match raw.parse::<NodeId>() {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.add("network_node", "Enter a valid UUID.");
                    None
                }
            },
            None => None,
        };
        errors.finish(ProductFilter {
            network_node,
            search: non_empty(&self.search).map(String::from),
        })
    }

    pub fn page_params(&self) -> PageParams {
        PageParams {
            page: self.page.clone(),
            page_size: self.page_size.clone(),
        }
    }
}

impl ProductFilter {
    pub fn matches(&self, product: &Product) -> bool {
        self.network_node.map_or(true, |id| product.network_node == id)
            && self.search.as_deref().map_or(true, |s| product.matches_search(s))
    }
}

/// Empty query values are treated as absent.
fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

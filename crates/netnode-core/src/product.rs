//! Products carried by a network node.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::identity::{NodeId, ProductId};
use crate::validation::{self, FieldErrors};

/// Maximum length of a product name.
pub const PRODUCT_NAME_MAX_LEN: usize = 255;
/// Maximum length of a product model.
pub const PRODUCT_MODEL_MAX_LEN: usize = 255;

/// A product offered by exactly one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub model: String,
    pub release_date: NaiveDate,
    /// Owning node. Deleting the node deletes the product.
    pub network_node: NodeId,
}

/// Validated fields for a product that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProduct {
    pub name: String,
    pub model: String,
    pub release_date: NaiveDate,
    pub network_node: NodeId,
}

/// Validated changes for a product update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub model: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub network_node: Option<NodeId>,
}

/// Unvalidated product fields as they arrive in a payload.
#[derive(Debug, Clone, Default)]
pub struct ProductFields {
    pub name: Option<String>,
    pub model: Option<String>,
    pub release_date: Option<String>,
    pub network_node: Option<NodeId>,
}

impl ProductFields {
    pub fn into_new(self) -> Result<NewProduct, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = validation::check_text(&mut errors, "name", self.name, PRODUCT_NAME_MAX_LEN);
        let model = validation::check_text(&mut errors, "model", self.model, PRODUCT_MODEL_MAX_LEN);
        let release_date = match self.release_date {
            Some(d) => validation::check_date(&mut errors, "release_date", d),
            None => {
                errors.add("release_date", validation::REQUIRED);
                None
            }
        };
        if self.network_node.is_none() {
            errors.add("network_node", validation::REQUIRED);
        }

        match (name, model, release_date, self.network_node) {
            (Some(name), Some(model), Some(release_date), Some(network_node))
                if errors.is_empty() =>
            {
                Ok(NewProduct {
                    name,
                    model,
                    release_date,
                    network_node,
                })
            }
            _ => Err(errors),
        }
    }

    /// With `partial == false` every field is required.
    pub fn into_changes(self, partial: bool) -> Result<ProductChanges, FieldErrors> {
        let mut errors = FieldErrors::new();
        if !partial {
            for (field, present) in [
                ("name", self.name.is_some()),
                ("model", self.model.is_some()),
                ("release_date", self.release_date.is_some()),
                ("network_node", self.network_node.is_some()),
            ] {
                if !present {
                    errors.add(field, validation::REQUIRED);
                }
            }
        }
        let name = self
            .name
            .and_then(|v| validation::check_present_text(&mut errors, "name", v, PRODUCT_NAME_MAX_LEN));
        let model = self
            .model
            .and_then(|v| validation::check_present_text(&mut errors, "model", v, PRODUCT_MODEL_MAX_LEN));
        let release_date = self
            .release_date
            .and_then(|v| validation::check_date(&mut errors, "release_date", v));

        errors.finish(ProductChanges {
            name,
            model,
            release_date,
            network_node: self.network_node,
        })
    }
}

impl Product {
    pub fn create(id: ProductId, new: NewProduct) -> Self {
        Self {
            id,
            name: new.name,
            model: new.model,
            release_date: new.release_date,
            network_node: new.network_node,
        }
    }

    pub fn apply(&mut self, changes: ProductChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(model) = changes.model {
            self.model = model;
        }
        if let Some(release_date) = changes.release_date {
            self.release_date = release_date;
        }
        if let Some(network_node) = changes.network_node {
            self.network_node = network_node;
        }
    }

    /// Case-insensitive substring match over name and model.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term) || self.model.to_lowercase().contains(&term)
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(node: NodeId) -> ProductFields {
        ProductFields {
            name: Some("Phone X".into()),
            model: Some("PX-1".into()),
            release_date: Some("2023-01-01".into()),
            network_node: Some(node),
        }
    }

    #[test]
    fn display_shows_model() {
        let p = Product::create(ProductId::new(), fields(NodeId::new()).into_new().unwrap());
        assert_eq!(p.to_string(), "Phone X (PX-1)");
    }

    #[test]
    fn missing_owner_is_required() {
        let mut f = fields(NodeId::new());
        f.network_node = None;
        let errors = f.into_new().unwrap_err();
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec!["network_node"]);
    }

    #[test]
    fn bad_date_rejected() {
        let mut f = fields(NodeId::new());
        f.release_date = Some("2023/01/01".into());
        assert!(f.into_new().unwrap_err().get("release_date").is_some());
    }

    #[test]
    fn partial_update_changes_only_given_fields() {
        let node = NodeId::new();
        let mut p = Product::create(ProductId::new(), fields(node).into_new().unwrap());
        let changes = ProductFields {
            model: Some("PX-2".into()),
            ..ProductFields::default()
        }
        .into_changes(true)
        .unwrap();
        p.apply(changes);
        assert_eq!(p.model, "PX-2");
        assert_eq!(p.name, "Phone X");
        assert_eq!(p.network_node, node);
    }

    #[test]
    fn full_update_requires_every_field() {
        let errors = ProductFields {
            model: Some("PX-2".into()),
            ..ProductFields::default()
        }
        .into_changes(false)
        .unwrap_err();
        assert_eq!(
            errors.fields().collect::<Vec<_>>(),
            vec!["name", "network_node", "release_date"]
        );
    }

    #[test]
    fn search_matches_name_or_model() {
        let p = Product::create(ProductId::new(), fields(NodeId::new()).into_new().unwrap());
        assert!(p.matches_search("phone"));
        assert!(p.matches_search("px-"));
        assert!(!p.matches_search("tablet"));
    }
}

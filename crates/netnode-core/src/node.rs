//! # Network Nodes
//!
//! A node is one participant in the distribution chain. It may name a single
//! supplier node and owes that supplier a [`Debt`].

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::debt::Debt;
use crate::identity::NodeId;
use crate::validation::{self, FieldErrors};

/// Maximum length of a node name.
pub const NAME_MAX_LEN: usize = 255;
/// Maximum length of a country name.
pub const COUNTRY_MAX_LEN: usize = 100;
/// Maximum length of a city name.
pub const CITY_MAX_LEN: usize = 100;
/// Maximum length of a street name.
pub const STREET_MAX_LEN: usize = 255;
/// Maximum length of a house number.
pub const HOUSE_NUMBER_MAX_LEN: usize = 20;

/// Kind of participant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    /// Manufacturer; normally the root of a chain.
    Factory,
    /// Retail chain.
    Retail,
    /// Individual entrepreneur.
    Entrepreneur,
}

impl NodeType {
    /// Every variant, in declaration order.
    pub const ALL: [NodeType; 3] = [Self::Factory, Self::Retail, Self::Entrepreneur];

    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Factory => "factory",
            Self::Retail => "retail",
            Self::Entrepreneur => "entrepreneur",
        }
    }

    /// Human-readable label.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Factory => "Factory",
            Self::Retail => "Retail chain",
            Self::Entrepreneur => "Individual entrepreneur",
        }
    }

    /// Parse a payload value, recording a choice error on failure.
    pub fn parse_field(errors: &mut FieldErrors, field: &str, value: &str) -> Option<Self> {
        match value.parse() {
            Ok(t) => Some(t),
            Err(()) => {
                errors.add(
                    field,
                    format!("\"{value}\" is not a valid choice."),
                );
                None
            }
        }
    }
}

impl FromStr for NodeType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "factory" => Ok(Self::Factory),
            "retail" => Ok(Self::Retail),
            "entrepreneur" => Ok(Self::Entrepreneur),
            _ => Err(()),
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A participant in the distribution network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkNode {
    pub id: NodeId,
    pub name: String,
    pub node_type: NodeType,
    pub email: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub house_number: String,
    /// Upstream node, if any.
    pub supplier: Option<NodeId>,
    pub debt: Debt,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
}

/// Validated fields for a node that does not exist yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNode {
    pub name: String,
    pub node_type: NodeType,
    pub email: String,
    pub country: String,
    pub city: String,
    pub street: String,
    pub house_number: String,
    pub supplier: Option<NodeId>,
    pub debt: Debt,
}

/// Validated changes for the general update path.
///
/// Deliberately has no debt field. `supplier` is doubly optional:
/// `Some(None)` clears the supplier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeChanges {
    pub name: Option<String>,
    pub node_type: Option<NodeType>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
    pub supplier: Option<Option<NodeId>>,
}

/// Unvalidated node fields as they arrive in a payload.
#[derive(Debug, Clone, Default)]
pub struct NodeFields {
    pub name: Option<String>,
    pub node_type: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house_number: Option<String>,
}

impl NodeFields {
    /// Validate fields for creation: every text field is required.
    pub fn into_new(
        self,
        supplier: Option<NodeId>,
        debt: Debt,
    ) -> Result<NewNode, FieldErrors> {
        let mut errors = FieldErrors::new();
        let name = validation::check_text(&mut errors, "name", self.name, NAME_MAX_LEN);
        let node_type = match self.node_type {
            Some(t) => NodeType::parse_field(&mut errors, "node_type", &t),
            None => {
                errors.add("node_type", validation::REQUIRED);
                None
            }
        };
        let email = match self.email {
            Some(e) => validation::check_email(&mut errors, "email", e),
            None => {
                errors.add("email", validation::REQUIRED);
                None
            }
        };
        let country = validation::check_text(&mut errors, "country", self.country, COUNTRY_MAX_LEN);
        let city = validation::check_text(&mut errors, "city", self.city, CITY_MAX_LEN);
        let street = validation::check_text(&mut errors, "street", self.street, STREET_MAX_LEN);
        let house_number = validation::check_text(
            &mut errors,
            "house_number",
            self.house_number,
            HOUSE_NUMBER_MAX_LEN,
        );

        match (name, node_type, email, country, city, street, house_number) {
            (
                Some(name),
                Some(node_type),
                Some(email),
                Some(country),
                Some(city),
                Some(street),
                Some(house_number),
            ) if errors.is_empty() => Ok(NewNode {
                name,
                node_type,
                email,
                country,
                city,
                street,
                house_number,
                supplier,
                debt,
            }),
            _ => Err(errors),
        }
    }

    /// Validate fields for an update.
    ///
    /// With `partial == false` every text field is required, as for a full
    /// replacement; otherwise only the supplied fields are checked.
    pub fn into_changes(self, partial: bool) -> Result<NodeChanges, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mut text = |field: &str, value: Option<String>, max: usize| match value {
            Some(v) => validation::check_present_text(&mut errors, field, v, max),
            None => {
                if !partial {
                    errors.add(field, validation::REQUIRED);
                }
                None
            }
        };
        let name = text("name", self.name, NAME_MAX_LEN);
        let country = text("country", self.country, COUNTRY_MAX_LEN);
        let city = text("city", self.city, CITY_MAX_LEN);
        let street = text("street", self.street, STREET_MAX_LEN);
        let house_number = text("house_number", self.house_number, HOUSE_NUMBER_MAX_LEN);

        let node_type = match self.node_type {
            Some(t) => NodeType::parse_field(&mut errors, "node_type", &t),
            None => {
                if !partial {
                    errors.add("node_type", validation::REQUIRED);
                }
                None
            }
        };
        let email = match self.email {
            Some(e) => validation::check_email(&mut errors, "email", e),
            None => {
                if !partial {
                    errors.add("email", validation::REQUIRED);
                }
                None
            }
        };

        errors.finish(NodeChanges {
            name,
            node_type,
            email,
            country,
            city,
            street,
            house_number,
            supplier: None,
        })
    }
}

impl NetworkNode {
    /// Materialize a new node. Debt comes from the validated input, which
    /// defaults to zero.
    pub fn create(id: NodeId, new: NewNode, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: new.name,
            node_type: new.node_type,
            email: new.email,
            country: new.country,
            city: new.city,
            street: new.street,
            house_number: new.house_number,
            supplier: new.supplier,
            debt: new.debt,
            created_at,
        }
    }

    /// Apply general-update changes. Debt and creation time are untouched.
    pub fn apply(&mut self, changes: NodeChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(node_type) = changes.node_type {
            self.node_type = node_type;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
        if let Some(country) = changes.country {
            self.country = country;
        }
        if let Some(city) = changes.city {
            self.city = city;
        }
        if let Some(street) = changes.street {
            self.street = street;
        }
        if let Some(house_number) = changes.house_number {
            self.house_number = house_number;
        }
        if let Some(supplier) = changes.supplier {
            self.supplier = supplier;
        }
    }

    /// Zero the debt, returning what was owed.
    pub fn clear_debt(&mut self) -> Debt {
        std::mem::replace(&mut self.debt, Debt::zero())
    }

    /// Case-insensitive exact match on country.
    pub fn in_country(&self, country: &str) -> bool {
        eq_ignore_case(&self.country, country)
    }

    /// Case-insensitive exact match on city.
    pub fn in_city(&self, city: &str) -> bool {
        eq_ignore_case(&self.city, city)
    }

    /// Case-insensitive substring match over name, email and city.
    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [&self.name, &self.email, &self.city]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

impl fmt::Display for NetworkNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.node_type.display_name(), self.name)
    }
}

/// Unicode-aware case-insensitive equality.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Sort newest first, ties broken by id so listings are deterministic.
pub fn sort_newest_first(nodes: &mut [NetworkNode]) {
    nodes.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
}

//! # API Route Modules
//!
//! - `network_nodes` — node CRUD, dependent-node listing, debt clearing.
//! - `products` — product CRUD.
//!
//! Both routers require an authenticated caller and are assembled in
//! [`crate::app`].

pub mod network_nodes;
pub mod products;

//! Navigation gating.
//!
//! - `routes`: the route table and the rule each route enforces
//! - `guard`: `RouteGuard`, deciding between loading, redirect, denial and view
//! - `menu`: the sidebar entries and the filter that hides what a user cannot open

pub mod guard;
pub mod menu;
pub mod routes;

pub use guard::{resolve, Guarded, RouteGuard};
pub use menu::{filter_menu, sidebar, MenuEntry};
pub use routes::{OrdersListing, Route, HOME_ROUTE, LOGIN_ROUTE};

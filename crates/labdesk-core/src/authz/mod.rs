//! Authorization: permission tokens and the predicates over a session.
//!
//! - `Permission`: a capability token, with the wildcard as its own variant
//! - `has_role`, `has_any_role`, `has_permission`, `has_any_permission`:
//!   methods on `Session` (see `predicates`)
//! - `AccessRule`: the declarative requirement a route or menu entry carries

pub mod permission;
pub mod predicates;
pub mod rule;

pub use permission::Permission;
pub use rule::AccessRule;

//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, overlays and the guarded main area
//! - `views`: content of each route once the guard lets it through
//! - `input`: keyboard event handling
//! - `styles`: color scheme and text styling

pub mod input;
pub mod render;
pub mod styles;
pub mod views;

//! SVG preview of a resolved orientation
//!
//! This module takes a layout state plus the loaded images and produces an SVG
//! string with CSS classes for styling.

pub mod config;
pub mod svg;

pub use config::SvgConfig;
pub use svg::{render_layout, render_preview};

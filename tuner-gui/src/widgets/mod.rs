//! # Widgets Module
//!
//! Canvas widgets that turn core display lists into iced geometry.

pub mod plot;

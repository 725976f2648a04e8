//! # UI Module
//!
//! This module contains the layout of the tuner window.

pub mod main_display;
pub mod reference_strip;

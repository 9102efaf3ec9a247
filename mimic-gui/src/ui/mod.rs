//! # UI Module
//!
//! This module contains all UI components for the Mimic comparison application.

pub mod main_display;
pub mod overlay_chart;
pub mod waveform;

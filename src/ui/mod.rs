//! Widget markup and bootstrap script.
//!
//! Served as static strings so the relay ships no separate asset pipeline:
//! the demo page and the widget script are compiled into the binary.

mod widget;

pub use widget::{demo_page, widget_script};

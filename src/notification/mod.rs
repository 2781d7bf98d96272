//! WhatsApp message templating
//!
//! Site settings hold message templates with `{placeholder}` markers. A
//! booking is turned into a placeholder map, rendered, and wrapped in a
//! `wa.me` deep link.

pub mod template;
pub mod whatsapp;

pub use template::*;
pub use whatsapp::*;

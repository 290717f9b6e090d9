//! Domain services used by the HTTP layer.

pub mod accounts;
pub mod archive;
pub mod batch;
pub mod downloads;
pub mod font;
pub mod input;
pub mod integrity;

//! Document Model - typed representation of an imported DOCX
//!
//! Content lives in `blocks` (paragraphs and tables of every content part);
//! pages are a layout estimate that only reference blocks, and floating
//! objects are owned by the model itself. Every block and run carries a
//! stable [`NodeId`] and the positional address it was imported from.

mod asset;
mod audit;
mod block;
mod document;
mod error;
mod image;
mod node_id;
mod object;
mod paragraph;
mod part;
pub mod placeholder;
mod run;
pub mod style;
pub mod table;
pub mod units;
mod version;

pub use asset::*;
pub use audit::*;
pub use block::*;
pub use document::*;
pub use error::*;
pub use image::*;
pub use node_id::*;
pub use object::*;
pub use paragraph::*;
pub use part::*;
pub use run::*;
pub use style::*;
pub use table::*;
pub use version::*;

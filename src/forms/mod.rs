//! Schema-driven form renderer
//!
//! Turns connector configuration schemas into a tree of controls, keeps
//! field values in an injected `FieldRegistry`, and produces the nested
//! object submitted for a datasource.

pub mod controls;
pub mod dates;
pub mod error;
pub mod registry;
pub mod renderer;
pub mod resolver;
pub mod schema;
pub mod session;

pub use controls::{Control, InputKind, Widget};
pub use dates::{DatePattern, DisplayFormat};
pub use error::FormError;
pub use registry::{build_submission, FieldRegistry, FormState};
pub use renderer::{render, Layout, Leaf, UiState};
pub use resolver::{resolve_properties, resolve_schema, SchemaResolutionContext, DEFAULT_MAX_DEPTH};
pub use schema::{SchemaNode, SchemaNodeType};
pub use session::{root_from_json_schema, FormAction, FormSession};

mod error;
mod schema;
mod validation;

pub use error::{render_path, SchemaError};
pub use schema::{PayloadSchema, Schema, SchemaKind};
pub use validation::validate_value;

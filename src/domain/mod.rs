//! Domain layer types and pure transformations.

pub mod modifier;
pub mod normalize;
pub mod value;

pub use modifier::ConditionalModifier;
pub use normalize::{normalize_number_literals, normalize_number_token};
pub use value::{EvaluationContext, Value};

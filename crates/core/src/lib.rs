pub mod collection;
pub mod edit_context;
pub mod error;
pub mod ids;
pub mod payload;
pub mod scopes;
pub mod shapes;
pub mod stamp;

pub use collection::{CollectionKind, CollectionRef, Parent};
pub use edit_context::{EditContext, SectionEditState};
pub use error::CoreError;
pub use ids::*;
pub use payload::Payload;
pub use stamp::{Stamp, StampClock};

pub mod code;
pub mod envelope;
pub mod error;
pub mod projection;

pub use code::Code;
pub use envelope::{respond, Envelope, HandlerResult};
pub use error::{ApiError, ErrorTemplate};
pub use projection::Project;

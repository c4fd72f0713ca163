pub mod collab;
pub mod editing;
pub mod error;
pub mod session;
pub mod tags;

// Re-export key types for easier usage
pub use collab::{CollaborativeChannel, LocalChannel, RemoteEdit};
pub use editing::*;
pub use error::{AnnotationError, Result};
pub use session::{LoadStatus, Session};
pub use tags::*;

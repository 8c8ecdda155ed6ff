pub mod api;
pub mod group;
pub mod host;
pub mod sync;
pub mod version;

pub use api::*;
pub use group::*;
pub use host::*;
pub use sync::*;
pub use version::*;

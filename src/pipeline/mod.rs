pub mod builder;
pub mod defaults;
pub mod feedback;
pub(crate) mod provider_guard;
pub mod runtime;
pub mod traits;

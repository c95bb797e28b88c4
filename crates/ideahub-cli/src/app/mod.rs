pub mod bootstrap;
pub mod logging;

pub use bootstrap::AppBootstrap;

pub mod event;
pub mod settings;
pub mod vault;

pub use event::*;
pub use settings::*;
pub use vault::*;

pub mod control;
pub mod manager;

pub use control::{install_guidance, ServerControl};
pub use manager::{find_on_path, ServerManager};

pub mod main_handlers;
pub mod page;

pub use main_handlers::{index, not_found, user_profile};
pub use page::PageContext;

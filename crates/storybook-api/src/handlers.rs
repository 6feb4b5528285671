//! Request handlers.

pub mod health;
pub mod stories;
pub mod upload;

pub use health::health;
pub use stories::create_story;
pub use upload::upload_image;

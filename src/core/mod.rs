pub mod catalog;
pub mod hardware;
pub mod level;
pub mod model;
pub mod resolver;

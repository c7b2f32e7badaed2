pub mod cost;
pub mod window;

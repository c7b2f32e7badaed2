pub mod config_cmd;
pub mod cost_cmd;
pub mod output;
pub mod renderer;

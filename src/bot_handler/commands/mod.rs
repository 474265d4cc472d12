pub mod help;
pub mod menu;
pub mod start;

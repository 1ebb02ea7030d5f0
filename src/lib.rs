pub mod app;
pub mod async_task;
pub mod cli;
pub mod config;
pub mod document;
pub mod error;
pub mod event;
pub mod extract;
pub mod fetch;
pub mod frame;
pub mod links;
pub mod main_lib;
pub mod page;
pub mod screenshot;
pub mod test_runner;
pub mod theme;
pub mod tree;
pub mod ui;

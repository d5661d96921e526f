// Service module exports

pub mod catalog;
pub mod command;
pub mod database;
pub mod history;
pub mod notification;
pub mod output;
pub mod process;
pub mod runner;
pub mod settings;
pub mod template;
pub mod transcript;

// Module exports for models

pub mod field;
pub mod form;
pub mod run;
pub mod script;
pub mod settings;
pub mod template;

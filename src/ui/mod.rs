/// UI module exports
pub mod components;
pub mod popup;
pub mod settings_form;

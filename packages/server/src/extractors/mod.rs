pub mod content_form;

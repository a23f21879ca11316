pub mod content_record;

mod common;
mod content;
mod gallery;

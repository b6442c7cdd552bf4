pub mod keymap;
pub mod machine;
pub mod popup;

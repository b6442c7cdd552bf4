pub mod dropdown;
pub mod guide;
pub mod popup;
pub mod story;

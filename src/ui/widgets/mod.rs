pub mod file_list;
pub mod help_panel;
pub mod progress_bar;
pub mod status_bar;

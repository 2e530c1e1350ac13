pub mod alert;
pub mod answer_view;
pub mod color;
pub mod confirm_delete;
pub mod editor;
pub mod form;
pub mod help;
pub mod input_box;
pub mod popup;
pub mod status_bar;
pub mod task_list;

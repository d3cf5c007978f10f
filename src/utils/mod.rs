mod format;

pub use format::{format_bytes, format_task_line};

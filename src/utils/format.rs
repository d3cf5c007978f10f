use crate::core::{UploadStatus, UploadTask};

/// 格式化字节数
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const UNIT_SIZE: f64 = 1024.0;

    let mut size = bytes as f64;
    let mut unit_index = 0;

    while size >= UNIT_SIZE && unit_index < UNITS.len() - 1 {
        size /= UNIT_SIZE;
        unit_index += 1;
    }

    format!("{:.2} {}", size, UNITS[unit_index])
}

/// One line per task for the CLI listing.
pub fn format_task_line(task: &UploadTask) -> String {
    let status = match task.status {
        UploadStatus::Pending => "pending",
        UploadStatus::Uploading => "uploading",
        UploadStatus::Success => "done",
        UploadStatus::Error => "failed",
    };

    let mut line = format!(
        "{:<9} {:>3}%  {:<32} {:>10}  -> {}",
        status,
        task.progress,
        task.file_name,
        format_bytes(task.size),
        task.target_container_id
    );
    if let Some(error) = &task.error {
        line.push_str(&format!("  ({})", error));
    }

    line
}

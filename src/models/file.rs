use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for an uploaded file. The bytes live in the blob directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub user_id: String,
    pub project_id: Option<String>,
    /// Client-supplied file name, sanitized
    pub name: String,
    /// Name of the blob on disk
    pub stored_name: String,
    pub url: String,
    pub size: u64,
    pub mime_type: String,
    pub created_at: DateTime<Utc>,
}

/// Query string of `GET /api/files`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileQuery {
    pub project_id: Option<String>,
}

/// Reduce a client file name to a safe basename
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') { c } else { '_' })
        .collect();
    let cleaned = cleaned.trim().trim_start_matches('.').to_string();

    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned.chars().take(255).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_strips_paths() {
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\plans\\site plan.pdf"), "site plan.pdf");
        assert_eq!(sanitize_file_name(".hidden"), "hidden");
        assert_eq!(sanitize_file_name("report<1>.xlsx"), "report_1_.xlsx");
        assert_eq!(sanitize_file_name(""), "file");
    }
}

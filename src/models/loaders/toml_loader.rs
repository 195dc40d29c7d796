use crate::error::{AppError, AppResult};
use crate::models::job::AttendanceJob;
use std::path::{Path, PathBuf};
use tokio::fs;

/// 从 TOML 文件加载考勤任务
pub async fn load_job(toml_file_path: &Path) -> AppResult<AttendanceJob> {
    let display = toml_file_path.display().to_string();
    let content = fs::read_to_string(toml_file_path)
        .await
        .map_err(|e| AppError::file(&display, format!("无法读取TOML文件: {}", e)))?;

    let mut job: AttendanceJob = toml::from_str(&content)
        .map_err(|e| AppError::file(&display, format!("无法解析TOML文件: {}", e)))?;
    job.validate()?;

    job.file_path = Some(toml_file_path.to_string_lossy().to_string());

    Ok(job)
}

/// 从文件夹中加载所有任务，单个文件失败只记录警告
pub async fn load_all_jobs(folder_path: &str) -> AppResult<Vec<AttendanceJob>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        return Err(AppError::file(folder_path, "文件夹不存在"));
    }

    let mut toml_files = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .map_err(|e| AppError::file(folder_path, format!("无法读取文件夹: {}", e)))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml_files.push(path);
        }
    }
    // 按文件名排序，保证执行顺序稳定
    toml_files.sort();

    let mut jobs = Vec::new();
    for path in toml_files {
        tracing::info!(
            "正在加载: {}",
            path.file_name().unwrap_or_default().to_string_lossy()
        );

        match load_job(&path).await {
            Ok(job) => jobs.push(job),
            Err(e) => tracing::warn!("加载文件失败 {}: {}", path.display(), e),
        }
    }

    Ok(jobs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AttendanceAction;

    const JOB: &str = r#"
user_id = "u-1"
email = "ana@example.com"
action = "exit"
phone_number = "51999888777"

[credentials]
external_user_id = 77668171
password = "secret"
company_id = 7040

[location]
latitude = -6.7711
longitude = -79.8431
radius_meters = 5.0
address = "Av. Balta 123"
"#;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("asistencia_{}_{}", name, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn test_load_all_jobs_skips_invalid_files() {
        let dir = temp_dir("jobs");
        std::fs::write(dir.join("a.toml"), JOB).unwrap();
        std::fs::write(dir.join("b.toml"), "user_id = 1").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let jobs = load_all_jobs(dir.to_str().unwrap()).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].action, AttendanceAction::Exit);
        assert_eq!(jobs[0].credentials.company_id, 7040);
        assert!(jobs[0].active);
        assert!(jobs[0].file_path.as_deref().unwrap().ends_with("a.toml"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test]
    async fn test_missing_folder_is_an_error() {
        let result = load_all_jobs("/definitely/not/here").await;
        assert!(matches!(result, Err(AppError::File { .. })));
    }
}

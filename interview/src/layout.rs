use crate::session::SessionId;
use anyhow::Context;
use std::fs;
use std::path::Path;
use std::path::PathBuf;

/// Where session snapshots, committed entities and reports live on disk.
#[derive(Debug, Clone)]
pub struct DataLayout {
    root: PathBuf,
}

impl DataLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn ensure_root(&self) -> anyhow::Result<()> {
        fs::create_dir_all(&self.root)
            .with_context(|| format!("failed to create {}", self.root.display()))
    }

    pub fn sessions_dir(&self) -> PathBuf {
        self.root.join("sessions")
    }

    pub fn session_file(&self, id: SessionId) -> PathBuf {
        self.sessions_dir()
            .join(format!("{}.json", sanitize(&id.to_string())))
    }

    pub fn entities_dir(&self) -> PathBuf {
        self.root.join("entities")
    }

    pub fn entities_file(&self, id: SessionId) -> PathBuf {
        self.entities_dir()
            .join(format!("{}.json", sanitize(&id.to_string())))
    }

    pub fn report_file(&self, id: SessionId) -> PathBuf {
        self.root
            .join("reports")
            .join(format!("{}.md", sanitize(&id.to_string())))
    }
}

/// Writes through a sibling `.tmp` file and renames it into place, so
/// readers see either the old contents or the new ones.
pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let tmp_path = tmp_path(path);
    fs::write(&tmp_path, data).with_context(|| format!("failed to write {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("failed to persist {}", path.display()))?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let mut file_name = path
        .file_name()
        .map(|s| s.to_os_string())
        .unwrap_or_default();
    file_name.push(".tmp");
    tmp.set_file_name(file_name);
    tmp
}

fn sanitize(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn files_are_grouped_by_concern() {
        let layout = DataLayout::new(PathBuf::from("/tmp/boardroom"));
        let id = SessionId::new();
        assert_eq!(
            layout.session_file(id),
            PathBuf::from(format!("/tmp/boardroom/sessions/{id}.json"))
        );
        assert!(layout.entities_file(id).starts_with("/tmp/boardroom/entities"));
        assert!(layout.report_file(id).ends_with(format!("{id}.md")));
    }

    #[test]
    fn path_components_are_sanitized() {
        assert_eq!(sanitize("ABC/123 x"), "ABC_123_x");
    }

    #[test]
    fn atomic_write_leaves_no_tmp_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nested").join("snapshot.json");
        write_atomic(&path, b"{}").expect("write");
        assert_eq!(fs::read_to_string(&path).expect("read"), "{}");
        assert!(!tmp_path(&path).exists());
    }
}

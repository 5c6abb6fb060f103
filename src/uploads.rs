use std::{
    fmt,
    path::{Path, PathBuf},
    time::{SystemTime, UNIX_EPOCH},
};

use rand::Rng;

/// Url prefix under which stored files are served
pub const PUBLIC_PREFIX: &str = "/uploads";

/// Directory an upload is filed under
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum UploadCategory {
    About,
    Events,
    Guests,
    Coordinators,
}

impl UploadCategory {
    pub fn dir_name(&self) -> &'static str {
        match self {
            UploadCategory::About => "about",
            UploadCategory::Events => "events",
            UploadCategory::Guests => "guests",
            UploadCategory::Coordinators => "coordinators",
        }
    }
}

impl fmt::Display for UploadCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.dir_name())
    }
}

/// A file received in a multipart request, held in memory
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct UploadedFile {
    /// Multipart field name
    pub field: String,
    pub filename: Option<String>,
    pub data: Vec<u8>,
}

/// Writes uploads to disk under per-category directories.
///
/// Replaced files are never removed from disk.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        UploadStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generates `<unix millis>-<random>` plus the original extension.
    fn generate_name(original: Option<&str>) -> String {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000_000);

        let ext = original
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| format!(".{}", ext))
            .unwrap_or_default();

        format!("{}-{}{}", millis, suffix, ext)
    }

    /// Store a file and return its public path.
    pub async fn store(
        &self,
        category: UploadCategory,
        file: &UploadedFile,
    ) -> anyhow::Result<String> {
        let dir = self.root.join(category.dir_name());
        tokio::fs::create_dir_all(&dir).await?;

        let name = Self::generate_name(file.filename.as_deref());
        tokio::fs::write(dir.join(&name), &file.data).await?;
        log::debug!("Stored upload {} as {}/{}", file.field, category, name);

        Ok(format!("{}/{}/{}", PUBLIC_PREFIX, category, name))
    }

    /// Store several files, removing the ones already written if any write fails.
    pub async fn store_all(
        &self,
        category: UploadCategory,
        files: &[&UploadedFile],
    ) -> anyhow::Result<Vec<String>> {
        let mut stored = Vec::with_capacity(files.len());
        for file in files {
            match self.store(category, file).await {
                Ok(path) => stored.push(path),
                Err(e) => {
                    self.discard(&stored).await;
                    return Err(e);
                }
            }
        }
        Ok(stored)
    }

    /// Map a public path back to its location on disk.
    pub fn local_path(&self, public: &str) -> Option<PathBuf> {
        let relative = public.strip_prefix(PUBLIC_PREFIX)?.trim_start_matches('/');
        let relative = Path::new(relative);
        if relative
            .components()
            .any(|c| !matches!(c, std::path::Component::Normal(_)))
        {
            return None;
        }
        Some(self.root.join(relative))
    }

    /// Best-effort removal of files written by a request that failed afterwards.
    pub async fn discard(&self, public_paths: &[String]) {
        for public in public_paths {
            if let Some(path) = self.local_path(public) {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    log::warn!("Failed to remove upload {}: {}", path.display(), e);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(field: &str, filename: Option<&str>, data: &[u8]) -> UploadedFile {
        UploadedFile {
            field: field.to_owned(),
            filename: filename.map(str::to_owned),
            data: data.to_vec(),
        }
    }

    #[test]
    fn test_generated_names() {
        let name = UploadStore::generate_name(Some("poster.final.PNG"));
        assert!(name.ends_with(".PNG"));
        let (millis, rest) = name.split_once('-').unwrap();
        assert!(millis.parse::<u128>().is_ok());
        assert!(rest.trim_end_matches(".PNG").parse::<u32>().unwrap() < 1_000_000_000);

        let bare = UploadStore::generate_name(Some("README"));
        assert!(!bare.contains('.'));
        assert!(!UploadStore::generate_name(None).contains('.'));
    }

    #[tokio::test]
    async fn test_store_and_discard() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let public = store
            .store(UploadCategory::About, &file("poster", Some("poster.png"), b"png"))
            .await
            .unwrap();
        assert!(public.starts_with("/uploads/about/"));
        assert!(public.ends_with(".png"));

        let local = store.local_path(&public).unwrap();
        assert_eq!(std::fs::read(&local).unwrap(), b"png");

        store.discard(&[public]).await;
        assert!(!local.exists());
    }

    #[tokio::test]
    async fn test_store_all_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let a = file("gallery", Some("a.jpg"), b"a");
        let b = file("gallery", Some("b.jpg"), b"b");
        let paths = store.store_all(UploadCategory::Guests, &[&a, &b]).await.unwrap();

        assert_eq!(paths.len(), 2);
        assert_eq!(std::fs::read(store.local_path(&paths[0]).unwrap()).unwrap(), b"a");
        assert_eq!(std::fs::read(store.local_path(&paths[1]).unwrap()).unwrap(), b"b");
    }

    #[test]
    fn test_local_path_rejects_traversal() {
        let store = UploadStore::new("/srv/uploads");
        assert_eq!(
            store.local_path("/uploads/about/1-2.png"),
            Some(PathBuf::from("/srv/uploads/about/1-2.png"))
        );
        assert_eq!(store.local_path("/uploads/../etc/passwd"), None);
        assert_eq!(store.local_path("/static/about/1-2.png"), None);
    }
}

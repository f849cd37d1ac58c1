// src/common/storage.rs

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::common::error::AppError;

/// Armazenamento de arquivos em disco, relativo ao `MEDIA_ROOT`.
///
/// O caminho salvo no banco é sempre relativo
/// (ex: `receipts/20250101_120000_3f2a9c1b_nota.pdf`). Não há deduplicação:
/// dois uploads do mesmo arquivo geram dois objetos, e nenhum sobrescreve outro.
#[derive(Clone, Debug)]
pub struct FileStorage {
    root: PathBuf,
}

impl FileStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Grava `data` em `<dir>/<timestamp>_<id>_<nome>` e devolve o caminho relativo.
    /// Um caminho já ocupado nunca é reaproveitado.
    pub async fn save(&self, dir: &str, original_name: &str, data: &[u8]) -> Result<String, AppError> {
        let relative = stored_path(dir, original_name, &upload_stamp());
        let absolute = self.root.join(&relative);

        if let Some(parent) = absolute.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&absolute)
            .await?;
        file.write_all(data).await?;
        file.flush().await?;

        tracing::debug!(path = %relative, bytes = data.len(), "arquivo salvo");
        Ok(relative)
    }

    /// Remoção best-effort: arquivo ausente ou erro de IO só gera log.
    pub async fn remove(&self, relative: &str) {
        let absolute = self.root.join(relative);
        match tokio::fs::remove_file(&absolute).await {
            Ok(()) => tracing::debug!(path = %relative, "arquivo removido"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %relative, "arquivo já não existia")
            }
            Err(e) => tracing::warn!(path = %relative, error = %e, "falha ao remover arquivo"),
        }
    }
}

// Segundo do upload + 8 hex aleatórios
fn upload_stamp() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}_{}", Utc::now().format("%Y%m%d_%H%M%S"), &id[..8])
}

/// Caminho relativo de um upload. Só o último componente do nome original
/// é aproveitado, então `../../etc/passwd` vira `passwd`.
pub fn stored_path(dir: &str, original_name: &str, stamp: &str) -> String {
    let base = Path::new(original_name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty())
        .unwrap_or("upload");
    // Nomes vindos de navegadores Windows podem usar '\'
    let base = base.rsplit('\\').next().unwrap_or(base);

    format!("{}/{}_{}", dir.trim_end_matches('/'), stamp, base)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_path_prefixes_timestamp() {
        assert_eq!(
            stored_path("receipts", "paid.pdf", "20250101_120000"),
            "receipts/20250101_120000_paid.pdf"
        );
        assert_eq!(
            stored_path("project_files/abc/", "briefing.docx", "20250101_120000"),
            "project_files/abc/20250101_120000_briefing.docx"
        );
    }

    #[test]
    fn stored_path_strips_directories() {
        assert_eq!(
            stored_path("receipts", "../../etc/passwd", "t"),
            "receipts/t_passwd"
        );
        assert_eq!(
            stored_path("receipts", "C:\\Users\\ana\\nota.pdf", "t"),
            "receipts/t_nota.pdf"
        );
        assert_eq!(stored_path("receipts", "", "t"), "receipts/t_upload");
    }

    #[tokio::test]
    async fn save_then_remove_round_trip_and_missing_file_is_ignored() {
        let root = std::env::temp_dir().join(format!("dealflow-storage-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&root);

        let relative = storage.save("receipts", "paid.pdf", b"receipt").await.unwrap();
        assert!(relative.starts_with("receipts/"));
        assert!(relative.ends_with("_paid.pdf"));
        assert_eq!(tokio::fs::read(root.join(&relative)).await.unwrap(), b"receipt");

        storage.remove(&relative).await;
        assert!(!root.join(&relative).exists());

        // Segunda remoção não pode entrar em pânico
        storage.remove(&relative).await;

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[tokio::test]
    async fn same_name_in_same_second_keeps_both_files() {
        let root = std::env::temp_dir().join(format!("dealflow-storage-{}", uuid::Uuid::new_v4()));
        let storage = FileStorage::new(&root);

        let first = storage.save("receipts", "receipt.pdf", b"deal A").await.unwrap();
        let second = storage.save("receipts", "receipt.pdf", b"deal B").await.unwrap();

        assert_ne!(first, second);
        assert_eq!(tokio::fs::read(root.join(&first)).await.unwrap(), b"deal A");
        assert_eq!(tokio::fs::read(root.join(&second)).await.unwrap(), b"deal B");

        // Remover o segundo não pode levar o primeiro junto
        storage.remove(&second).await;
        assert!(root.join(&first).exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }

    #[test]
    fn upload_stamp_is_unique_per_call() {
        let a = upload_stamp();
        let b = upload_stamp();
        assert_ne!(a, b);
        assert_eq!(a.len(), "20250101_120000_".len() + 8);
    }
}

use std::path::{Path, PathBuf};

use anyhow::bail;
use tokio::fs::{create_dir_all, remove_file, File};
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader, BufWriter};
use uuid::Uuid;

/// Document bytes live on local disk under the configured directory, one
/// file per upload keyed by the document uuid.
pub async fn prepare_storage(dir: &str) -> anyhow::Result<()> {
    create_dir_all(PathBuf::from(dir)).await?;
    Ok(())
}

pub fn document_path(dir: &str, uuid: Uuid) -> PathBuf {
    Path::new(dir).join(format!("{}.bin", uuid))
}

pub async fn write_document(dir: &str, uuid: Uuid, bytes: &[u8]) -> anyhow::Result<()> {
    let path = document_path(dir, uuid);
    if let Some(parent) = path.parent() {
        create_dir_all(parent).await?;
    }
    if path.exists() {
        bail!("Document file already exists!")
    }
    let mut writer = BufWriter::new(File::create(&path).await?);
    writer.write_all(bytes).await?;
    writer.flush().await?;
    Ok(())
}

pub async fn read_document(dir: &str, uuid: Uuid) -> anyhow::Result<Vec<u8>> {
    let path = document_path(dir, uuid);
    if !path.exists() {
        bail!("Tried to read nonexistent document!")
    }
    let mut bytes = Vec::new();
    BufReader::new(File::open(&path).await?)
        .read_to_end(&mut bytes)
        .await?;
    Ok(bytes)
}

/// Drop the bytes for a document that never got (or lost) its metadata row.
/// Missing files are fine; the goal is only to not leave orphans behind.
pub async fn remove_document(dir: &str, uuid: Uuid) -> anyhow::Result<()> {
    let path = document_path(dir, uuid);
    if path.exists() {
        remove_file(&path).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> String {
        std::env::temp_dir()
            .join(format!("pie-docs-{}", Uuid::new_v4()))
            .to_string_lossy()
            .into_owned()
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = scratch_dir();
        let uuid = Uuid::new_v4();
        write_document(&dir, uuid, b"informe fonoaudiologico").await.unwrap();
        let bytes = read_document(&dir, uuid).await.unwrap();
        assert_eq!(bytes, b"informe fonoaudiologico");
    }

    #[tokio::test]
    async fn existing_documents_are_never_overwritten() {
        let dir = scratch_dir();
        let uuid = Uuid::new_v4();
        write_document(&dir, uuid, b"v1").await.unwrap();
        assert!(write_document(&dir, uuid, b"v2").await.is_err());
        assert_eq!(read_document(&dir, uuid).await.unwrap(), b"v1");
    }

    #[tokio::test]
    async fn removed_document_leaves_no_file_behind() {
        let dir = scratch_dir();
        let uuid = Uuid::new_v4();
        write_document(&dir, uuid, b"huerfano").await.unwrap();
        remove_document(&dir, uuid).await.unwrap();
        assert!(read_document(&dir, uuid).await.is_err());
        // Removing a document that is already gone is a no-op.
        remove_document(&dir, uuid).await.unwrap();
    }
}

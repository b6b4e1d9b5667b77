use anyhow::Result;
use bucketfs::client::FilesystemClient;
use bucketfs::composition::Pipeline;
use bucketfs::config::{BackendConfig, Config};
use bucketfs::fs::{Depth, FsError, StorageTier};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn local_config(root: &Path, prefix: &str) -> Config {
    Config {
        backend: BackendConfig {
            kind: "local".to_string(),
            root: Some(root.to_path_buf()),
            prefix: prefix.to_string(),
            allow_overwrite_on_move: false,
        },
        ..Config::default()
    }
}

fn setup_local(prefix: &str) -> Result<(TempDir, Arc<dyn FilesystemClient>)> {
    let dir = tempfile::tempdir()?;
    let client = Pipeline::assemble(&local_config(dir.path(), prefix))?.client();
    Ok((dir, client))
}

#[tokio::test]
async fn test_upload_lands_on_disk() -> Result<()> {
    let (dir, client) = setup_local("")?;

    client.upload(b"hello disk", "/docs/hello.txt").await?;

    let on_disk = std::fs::read(dir.path().join("docs/hello.txt"))?;
    assert_eq!(on_disk, b"hello disk");

    let entry = client.attrs("/docs/hello.txt").await?.expect("file entry");
    assert_eq!(entry.size, 10);
    assert_eq!(entry.tier, Some(StorageTier::standard()));

    let mut sink = Vec::new();
    client.download_range(&mut sink, "/docs/hello.txt", 6, 4).await?;
    assert_eq!(sink, b"disk");
    Ok(())
}

#[tokio::test]
async fn test_prefix_maps_to_subdirectory() -> Result<()> {
    let (dir, client) = setup_local("mounts/alpha")?;

    client.upload(b"x", "/f").await?;
    assert!(dir.path().join("mounts/alpha/f").is_file());
    assert_eq!(client.ls("/", Depth::Unlimited).await?.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_directories_are_markers() -> Result<()> {
    let (dir, client) = setup_local("")?;

    client.mkdir("/empty").await?;
    client.upload(b"1", "/full/one").await?;
    assert!(dir.path().join("empty").is_dir());

    let listing = client.ls("/", Depth::Levels(1)).await?;
    let names: Vec<_> = listing.iter().map(|e| (e.path.as_str(), e.is_dir)).collect();
    assert_eq!(names, vec![("/", true), ("/empty", true), ("/full", true)]);

    assert!(matches!(client.rmdir("/full").await, Err(FsError::NotEmpty(_))));
    client.delete("/full/one").await?;
    // The directory survives its last file on a local store.
    assert!(client.attrs("/full").await?.is_some_and(|e| e.is_dir));
    client.rmdir("/full").await?;
    client.rmdir("/empty").await?;
    assert_eq!(client.ls("/", Depth::Unlimited).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_range_write_and_flush() -> Result<()> {
    let (dir, client) = setup_local("")?;
    client.upload(b"0123456789", "/blob").await?;

    client.upload_range(b"abc", "/blob", 5).await?;
    assert_eq!(std::fs::read(dir.path().join("blob"))?, b"0123456789");

    client.flush("/blob").await?;
    assert_eq!(std::fs::read(dir.path().join("blob"))?, b"01234abc89");
    Ok(())
}

#[tokio::test]
async fn test_move_directory() -> Result<()> {
    let (dir, client) = setup_local("")?;
    client.upload(b"a", "/src/a").await?;
    client.upload(b"b", "/src/sub/b").await?;

    client.mv("/src", "/dst").await?;

    assert!(!dir.path().join("src").exists());
    assert_eq!(std::fs::read(dir.path().join("dst/sub/b"))?, b"b");
    let listing = client.ls("/dst", Depth::Unlimited).await?;
    let paths: Vec<_> = listing.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(paths, vec!["/dst", "/dst/a", "/dst/sub", "/dst/sub/b"]);
    Ok(())
}

#[tokio::test]
async fn test_availability() -> Result<()> {
    let (_dir, client) = setup_local("")?;
    assert!(client.is_available().await?);

    let missing = Pipeline::assemble(&local_config(Path::new("/nonexistent/bucketfs-root"), ""))?;
    assert!(matches!(missing.client().is_available().await, Err(FsError::Configuration(_))));
    Ok(())
}

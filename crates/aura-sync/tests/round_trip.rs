//! Tree synchronization against an in-memory object store.

use std::collections::BTreeMap;
use std::path::Path;

use aura_core::{DeploymentId, KeyPrefix, Namespace};
use aura_store::ObjectStoreClient;
use aura_sync::{SyncError, SyncReport, TreeSync};
use bytes::Bytes;

fn id(s: &str) -> DeploymentId {
    DeploymentId::parse(s).unwrap()
}

fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (rel, content) in files {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }
}

/// Relative path → content for every file below `root`.
fn snapshot(root: &Path) -> BTreeMap<String, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .map(|e| e.unwrap())
        .filter(|e| e.file_type().is_file())
        .map(|e| {
            let rel = e
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/");
            (rel, std::fs::read(e.path()).unwrap())
        })
        .collect()
}

#[tokio::test]
async fn upload_maps_files_to_keys() {
    let dir = tempfile::tempdir().unwrap();
    write_tree(
        dir.path(),
        &[("index.html", "<h1>hi</h1>"), ("app.js", "console.log(1)")],
    );

    let client = ObjectStoreClient::in_memory();
    let sync = TreeSync::new(client.clone(), 4);
    let report = sync
        .upload_tree(dir.path(), Namespace::Dist, &id("abc123"))
        .await
        .unwrap();
    assert_eq!(report, SyncReport { files: 2, bytes: 25 });

    let mut keys = client.list_keys("dist/abc123/").await.unwrap();
    keys.sort();
    assert_eq!(keys, vec!["dist/abc123/app.js", "dist/abc123/index.html"]);
    assert_eq!(
        &client.get("dist/abc123/index.html").await.unwrap()[..],
        b"<h1>hi</h1>"
    );
    assert_eq!(
        &client.get("dist/abc123/app.js").await.unwrap()[..],
        b"console.log(1)"
    );
}

#[tokio::test]
async fn download_reproduces_uploaded_tree() {
    let src = tempfile::tempdir().unwrap();
    write_tree(
        src.path(),
        &[
            ("index.html", "<h1>home</h1>"),
            ("assets/app.js", "console.log(1)"),
            ("assets/css/site.css", "body{}"),
            ("deep/a/b/c/d.txt", "deep"),
            ("empty.txt", ""),
        ],
    );
    std::fs::create_dir_all(src.path().join("no-files-here")).unwrap();

    let sync = TreeSync::new(ObjectStoreClient::in_memory(), 2);
    sync.upload_tree(src.path(), Namespace::Source, &id("r1"))
        .await
        .unwrap();

    let dest = tempfile::tempdir().unwrap();
    let out = dest.path().join("checkout");
    let report = sync
        .download_tree(&KeyPrefix::new(Namespace::Source, id("r1")), &out)
        .await
        .unwrap();

    assert_eq!(report.files, 5);
    assert_eq!(snapshot(src.path()), snapshot(&out));
}

#[tokio::test]
async fn deployments_do_not_see_each_other() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    write_tree(a.path(), &[("index.html", "a"), ("a-only.js", "a")]);
    write_tree(b.path(), &[("index.html", "b")]);

    let client = ObjectStoreClient::in_memory();
    let sync = TreeSync::new(client.clone(), 8);
    let (a_id, b_id) = (id("abc"), id("abc1"));
    let (ra, rb) = tokio::join!(
        sync.upload_tree(a.path(), Namespace::Dist, &a_id),
        sync.upload_tree(b.path(), Namespace::Dist, &b_id),
    );
    ra.unwrap();
    rb.unwrap();

    let keys = client.list_keys("dist/abc/").await.unwrap();
    assert_eq!(keys.len(), 2);
    assert!(keys.iter().all(|k| k.starts_with("dist/abc/")));

    let out = tempfile::tempdir().unwrap();
    sync.download_tree(&KeyPrefix::new(Namespace::Dist, id("abc1")), out.path())
        .await
        .unwrap();
    assert_eq!(
        snapshot(out.path()),
        BTreeMap::from([("index.html".to_string(), b"b".to_vec())])
    );
}

#[tokio::test]
async fn reupload_overwrites_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let client = ObjectStoreClient::in_memory();
    let sync = TreeSync::new(client.clone(), 4);

    write_tree(dir.path(), &[("index.html", "old")]);
    sync.upload_tree(dir.path(), Namespace::Dist, &id("same"))
        .await
        .unwrap();
    write_tree(dir.path(), &[("index.html", "new")]);
    sync.upload_tree(dir.path(), Namespace::Dist, &id("same"))
        .await
        .unwrap();

    assert_eq!(
        client.list_keys("dist/same/").await.unwrap(),
        vec!["dist/same/index.html"]
    );
    assert_eq!(&client.get("dist/same/index.html").await.unwrap()[..], b"new");
}

#[tokio::test]
async fn empty_prefix_is_a_no_op() {
    let sync = TreeSync::new(ObjectStoreClient::in_memory(), 4);
    let dest = tempfile::tempdir().unwrap();
    let out = dest.path().join("never-created");

    let report = sync
        .download_tree(&KeyPrefix::new(Namespace::Dist, id("ghost")), &out)
        .await
        .unwrap();
    assert_eq!(report, SyncReport::default());
    assert!(!out.exists());
}

#[tokio::test]
async fn empty_tree_uploads_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let client = ObjectStoreClient::in_memory();
    let sync = TreeSync::new(client.clone(), 4);

    let report = sync
        .upload_tree(dir.path(), Namespace::Dist, &id("empty"))
        .await
        .unwrap();
    assert_eq!(report, SyncReport::default());
    assert!(client.list_keys("dist/empty/").await.unwrap().is_empty());
}

#[tokio::test]
async fn missing_root_fails_upload() {
    let dir = tempfile::tempdir().unwrap();
    let sync = TreeSync::new(ObjectStoreClient::in_memory(), 4);
    let err = sync
        .upload_tree(&dir.path().join("dist"), Namespace::Dist, &id("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Walk { .. }));
}

#[tokio::test]
async fn one_failed_write_fails_the_download_but_keeps_the_rest() {
    let client = ObjectStoreClient::in_memory();
    // `a` as a file and `a/b` below it cannot both exist locally.
    client.put("dist/clash/a", Bytes::from_static(b"file")).await.unwrap();
    client.put("dist/clash/a/b", Bytes::from_static(b"nested")).await.unwrap();
    client.put("dist/clash/ok.txt", Bytes::from_static(b"ok")).await.unwrap();

    let sync = TreeSync::new(client, 1);
    let out = tempfile::tempdir().unwrap();
    let err = sync
        .download_tree(&KeyPrefix::new(Namespace::Dist, id("clash")), out.path())
        .await
        .unwrap_err();

    match err {
        SyncError::Transfer { failed, total, .. } => {
            assert_eq!(failed, 1);
            assert_eq!(total, 3);
        }
        other => panic!("unexpected error: {other}"),
    }
    // Successful transfers stay on disk.
    assert_eq!(std::fs::read(out.path().join("ok.txt")).unwrap(), b"ok");
}

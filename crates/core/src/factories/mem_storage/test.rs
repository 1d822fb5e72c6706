use super::*;

async fn save(s: &MemStorage, module: &str, version: &str) {
    s.save(
        module,
        version,
        Bytes::from(format!("module {module}")),
        zip_from_bytes(Bytes::from(format!("zip {module}@{version}"))),
        Bytes::from(format!("info {version}")),
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn save_then_read_all_artifacts() {
    let s = MemStorage::default();
    save(&s, "a/b", "v1.0.0").await;

    assert!(s.exists("a/b", "v1.0.0").await.unwrap());
    assert_eq!(&b"info v1.0.0"[..], &s.info("a/b", "v1.0.0").await.unwrap());
    assert_eq!(&b"module a/b"[..], &s.go_mod("a/b", "v1.0.0").await.unwrap());
    let zip = collect_zip(s.zip("a/b", "v1.0.0").await.unwrap())
        .await
        .unwrap();
    assert_eq!(&b"zip a/b@v1.0.0"[..], &zip);
}

#[tokio::test]
async fn missing_entries_are_not_found() {
    let s = MemStorage::default();
    save(&s, "a/b", "v1.0.0").await;

    assert!(!s.exists("a/b", "v2.0.0").await.unwrap());
    assert!(!s.exists("x/y", "v1.0.0").await.unwrap());
    assert!(s.info("a/b", "v2.0.0").await.unwrap_err().is_not_found());
    assert!(s.go_mod("x/y", "v1.0.0").await.unwrap_err().is_not_found());
    assert!(s.zip("x/y", "v1.0.0").await.is_err());
    assert!(s.list("x/y").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn list_and_delete() {
    let s = MemStorage::default();
    save(&s, "a/b", "v1.0.1").await;
    save(&s, "a/b", "v1.0.0").await;

    assert_eq!(vec!["v1.0.0", "v1.0.1"], s.list("a/b").await.unwrap());

    s.delete("a/b", "v1.0.0").await.unwrap();
    assert_eq!(vec!["v1.0.1"], s.list("a/b").await.unwrap());
    assert!(s.delete("a/b", "v1.0.0").await.unwrap_err().is_not_found());

    // removing the last version forgets the module
    s.delete("a/b", "v1.0.1").await.unwrap();
    assert!(s.list("a/b").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn catalog_pages_through_everything() {
    let s = MemStorage::default();
    save(&s, "b/mod", "v1.0.0").await;
    save(&s, "a/mod", "v1.0.0").await;
    save(&s, "a/mod", "v1.1.0").await;
    save(&s, "c/mod", "v0.1.0").await;
    save(&s, "c/mod", "v0.2.0").await;

    let mut token = String::new();
    let mut seen = Vec::new();
    let mut pages = 0;
    loop {
        let page = s.catalog(&token, 2).await.unwrap();
        assert!(page.modules.len() <= 2);
        pages += 1;
        seen.extend(
            page.modules
                .into_iter()
                .map(|e| format!("{}@{}", e.module, e.version)),
        );
        if page.next.is_empty() {
            break;
        }
        token = page.next;
    }

    assert_eq!(3, pages);
    assert_eq!(
        vec![
            "a/mod@v1.0.0",
            "a/mod@v1.1.0",
            "b/mod@v1.0.0",
            "c/mod@v0.1.0",
            "c/mod@v0.2.0",
        ],
        seen,
    );
}

#[tokio::test]
async fn catalog_rejects_bad_input() {
    let s = MemStorage::default();
    assert_eq!(
        ErrorKind::BadRequest,
        s.catalog("", 0).await.unwrap_err().kind,
    );
    assert_eq!(
        ErrorKind::BadRequest,
        s.catalog("!!not-base64!!", 10).await.unwrap_err().kind,
    );
}

#[tokio::test]
async fn catalog_of_empty_storage() {
    let s = MemStorage::default();
    assert_eq!(CatalogPage::default(), s.catalog("", 10).await.unwrap());
}

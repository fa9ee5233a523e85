//! ConfigStore against a real temporary directory tree.

mod common;

use std::io::ErrorKind;

use common::{server_block, store_fixture, write_file};
use nginx_console::site::{self, ConfigurationUnit, LocationRule, StorageClass};
use nginx_console::store::StoreError;

#[tokio::test]
async fn test_list_spans_both_classes() {
    let fx = store_fixture();
    write_file(&fx.paths.available, "b.test.conf", &server_block("b.test", "80"));
    write_file(&fx.paths.available, "a.test.conf", &server_block("a.test", "8080"));
    write_file(&fx.paths.immediate, "c.test.conf", &server_block("c.test", "443"));
    // Ignored: wrong extension, unparsable, a directory.
    write_file(&fx.paths.available, "notes.txt", &server_block("notes", "80"));
    write_file(&fx.paths.available, "broken.conf", "server { listen 80; }");
    std::fs::create_dir(fx.paths.available.join("dir.conf")).unwrap();

    std::os::unix::fs::symlink(
        fx.paths.available.join("a.test.conf"),
        fx.paths.enabled.join("a.test.conf"),
    )
    .unwrap();

    let units = fx.store.list().await.unwrap();
    let summary: Vec<_> = units
        .iter()
        .map(|u| (u.server_name.as_str(), u.enabled, u.storage_class))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a.test", true, StorageClass::Available),
            ("b.test", false, StorageClass::Available),
            ("c.test", true, StorageClass::Immediate),
        ]
    );
    assert_eq!(units[0].listen, "8080");
    assert_eq!(fx.control.reloads(), 0);
}

#[tokio::test]
async fn test_list_missing_directories_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let fx = store_fixture();
    let store = nginx_console::ConfigStore::new(
        nginx_console::store::SitePaths::under(dir.path().join("absent")),
        fx.control.clone(),
        fx.issuer.clone(),
    );
    assert!(store.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_find_returns_first_match() {
    let fx = store_fixture();
    write_file(&fx.paths.available, "a.test.conf", &server_block("a.test", "80"));
    write_file(&fx.paths.immediate, "a.test.conf", &server_block("a.test", "81"));

    let found = fx.store.find("a.test").await.unwrap().unwrap();
    assert_eq!(found.listen, "80");
    assert!(fx.store.find("missing.test").await.unwrap().is_none());
}

#[tokio::test]
async fn test_enable_then_disable() {
    let fx = store_fixture();
    write_file(&fx.paths.available, "a.test.conf", &server_block("a.test", "80"));

    fx.store.enable("a.test").await.unwrap();
    let link = fx.paths.link_path("a.test");
    assert!(std::fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(std::fs::read_link(&link).unwrap(), fx.paths.available.join("a.test.conf"));
    assert!(fx.store.find("a.test").await.unwrap().unwrap().enabled);
    assert_eq!(fx.control.reloads(), 1);

    fx.store.disable("a.test").await.unwrap();
    assert!(!link.exists());
    assert!(!fx.store.find("a.test").await.unwrap().unwrap().enabled);
    assert_eq!(fx.control.reloads(), 2);
}

#[tokio::test]
async fn test_enable_twice_surfaces_already_exists() {
    let fx = store_fixture();
    write_file(&fx.paths.available, "a.test.conf", &server_block("a.test", "80"));

    fx.store.enable("a.test").await.unwrap();
    let err = fx.store.enable("a.test").await.unwrap_err();
    assert_eq!(err.io_kind(), Some(ErrorKind::AlreadyExists));
    assert_eq!(fx.control.reloads(), 1);
}

#[tokio::test]
async fn test_enable_without_source_is_not_found() {
    let fx = store_fixture();
    let err = fx.store.enable("ghost.test").await.unwrap_err();
    assert_eq!(err.io_kind(), Some(ErrorKind::NotFound));
    assert!(!fx.paths.link_path("ghost.test").exists());
    assert_eq!(fx.control.reloads(), 0);
}

#[tokio::test]
async fn test_disable_without_link_is_not_found() {
    let fx = store_fixture();
    write_file(&fx.paths.available, "a.test.conf", &server_block("a.test", "80"));

    let err = fx.store.disable("a.test").await.unwrap_err();
    assert_eq!(err.io_kind(), Some(ErrorKind::NotFound));
    assert_eq!(fx.control.reloads(), 0);
}

#[tokio::test]
async fn test_create_writes_rendered_unit() {
    let fx = store_fixture();
    let unit = ConfigurationUnit::new("new.test", "80")
        .with_root("/var/www/new")
        .with_location(LocationRule::proxied("/api", "http://127.0.0.1:3000"));

    fx.store.create(&unit, StorageClass::Immediate).await.unwrap();

    let path = fx.paths.site_path(StorageClass::Immediate, "new.test");
    let text = std::fs::read_to_string(&path).unwrap();
    assert_eq!(text, site::render(&unit));
    assert_eq!(fx.control.reloads(), 1);

    let listed = fx.store.find("new.test").await.unwrap().unwrap();
    assert_eq!(listed.storage_class, StorageClass::Immediate);
    assert!(listed.enabled);
    assert_eq!(listed.root, "/var/www/new");
    assert_eq!(listed.locations, unit.locations);
    assert_eq!(listed.locations[0].proxy_port, Some(3000));
}

#[tokio::test]
async fn test_update_overwrites_named_file() {
    let fx = store_fixture();
    write_file(&fx.paths.available, "a.test.conf", &server_block("a.test", "80"));

    let unit = ConfigurationUnit::new("a.test", "8081");
    fx.store.update("a.test", &unit, StorageClass::Available).await.unwrap();

    assert_eq!(fx.store.find("a.test").await.unwrap().unwrap().listen, "8081");
    assert_eq!(fx.control.reloads(), 1);
}

#[tokio::test]
async fn test_delete_removes_file_and_link() {
    let fx = store_fixture();
    write_file(&fx.paths.available, "a.test.conf", &server_block("a.test", "80"));
    fx.store.enable("a.test").await.unwrap();

    fx.store.delete("a.test", StorageClass::Available).await.unwrap();
    assert!(!fx.paths.site_path(StorageClass::Available, "a.test").exists());
    assert!(std::fs::symlink_metadata(fx.paths.link_path("a.test")).is_err());
    assert_eq!(fx.control.reloads(), 2);
}

#[tokio::test]
async fn test_delete_tolerates_missing_link() {
    let fx = store_fixture();
    write_file(&fx.paths.immediate, "c.test.conf", &server_block("c.test", "80"));

    fx.store.delete("c.test", StorageClass::Immediate).await.unwrap();
    assert!(fx.store.list().await.unwrap().is_empty());
    assert_eq!(fx.control.reloads(), 1);
}

#[tokio::test]
async fn test_delete_missing_file_is_not_found() {
    let fx = store_fixture();
    let err = fx.store.delete("ghost.test", StorageClass::Available).await.unwrap_err();
    assert_eq!(err.io_kind(), Some(ErrorKind::NotFound));
    assert_eq!(fx.control.reloads(), 0);
}

#[tokio::test]
async fn test_generate_tls_issues_then_reloads() {
    let fx = store_fixture();
    fx.store.generate_tls("a.test", "ops@a.test").await.unwrap();

    assert_eq!(fx.issuer.calls(), vec![("a.test".to_string(), "ops@a.test".to_string())]);
    assert_eq!(fx.control.reloads(), 1);
}

#[tokio::test]
async fn test_failed_issuance_skips_reload() {
    let fx = store_fixture();
    fx.issuer.fail_next(true);

    let err = fx.store.generate_tls("a.test", "ops@a.test").await.unwrap_err();
    assert!(matches!(err, StoreError::Certificate(_)));
    assert_eq!(fx.control.reloads(), 0);
}

#[tokio::test]
async fn test_reload_failure_keeps_written_file() {
    let fx = store_fixture();
    fx.control.fail_next(true);

    let unit = ConfigurationUnit::new("new.test", "80");
    let err = fx.store.create(&unit, StorageClass::Available).await.unwrap_err();
    assert!(matches!(err, StoreError::Reload(_)));
    assert!(fx.paths.site_path(StorageClass::Available, "new.test").exists());
}

#[tokio::test]
async fn test_invalid_names_never_touch_disk() {
    let fx = store_fixture();
    let unit = ConfigurationUnit::new("../escape", "80");

    assert!(matches!(
        fx.store.create(&unit, StorageClass::Available).await,
        Err(StoreError::InvalidName(_))
    ));
    assert!(matches!(fx.store.enable("a/b").await, Err(StoreError::InvalidName(_))));
    assert!(matches!(
        fx.store.delete("", StorageClass::Immediate).await,
        Err(StoreError::InvalidName(_))
    ));
    assert!(!fx.dir.path().join("escape.conf").exists());
    assert_eq!(fx.control.reloads(), 0);
}

#[tokio::test]
async fn test_units_missing_listen_are_not_written() {
    let fx = store_fixture();

    let unit = ConfigurationUnit::new("a.test", "");
    let err = fx.store.create(&unit, StorageClass::Available).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidUnit("listen")));
    assert!(!fx.paths.site_path(StorageClass::Available, "a.test").exists());

    write_file(&fx.paths.immediate, "c.test.conf", &server_block("c.test", "80"));
    let mut blank = ConfigurationUnit::new("c.test", "80");
    blank.server_name = String::new();
    let err = fx
        .store
        .update("c.test", &blank, StorageClass::Immediate)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidUnit("server_name")));
    assert_eq!(fx.store.find("c.test").await.unwrap().unwrap().listen, "80");
    assert_eq!(fx.control.reloads(), 0);
}

// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use std::path::PathBuf;
use storage::{FileSystemStorage, KeyValueStorage, MemoryStorage};

fn setup_empty_test_folder(folder_name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push("ride_storage_tests");
    path.push(folder_name);
    if let Ok(true) = std::fs::exists(&path) {
        std::fs::remove_dir_all(&path)
            .unwrap_or_else(|e| panic!("Failed to clean test folder {path:?}. Reason: {e}"));
    }
    path
}

#[tokio::test]
#[test_log::test]
async fn missing_key_is_none() {
    let storage = FileSystemStorage::new(&setup_empty_test_folder("missing_key_is_none"));
    assert_eq!(storage.get("cache_motors_u1").await.unwrap(), None);
}

#[tokio::test]
#[test_log::test]
async fn store_and_load_value() {
    let folder = setup_empty_test_folder("store_and_load_value");
    let storage = FileSystemStorage::new(&folder);
    storage
        .set("cache_motors_u1", r#"[{"id":"m-1"}]"#)
        .await
        .unwrap();
    assert_eq!(
        storage.get("cache_motors_u1").await.unwrap().as_deref(),
        Some(r#"[{"id":"m-1"}]"#)
    );

    let mut file = folder.clone();
    file.push("cache_motors_u1.json");
    assert!(std::fs::exists(&file).unwrap());
}

#[tokio::test]
#[test_log::test]
async fn overwrite_replaces_value() {
    let storage = FileSystemStorage::new(&setup_empty_test_folder("overwrite_replaces_value"));
    storage.set("token", "first-and-longer").await.unwrap();
    storage.set("token", "second").await.unwrap();
    assert_eq!(storage.get("token").await.unwrap().as_deref(), Some("second"));
}

#[tokio::test]
#[test_log::test]
async fn keys_with_separators_stay_inside_root() {
    let folder = setup_empty_test_folder("keys_with_separators_stay_inside_root");
    let storage = FileSystemStorage::new(&folder);
    storage.set("../user/1", "value").await.unwrap();
    assert_eq!(storage.get("../user/1").await.unwrap().as_deref(), Some("value"));

    let mut file = folder.clone();
    file.push("___user_1.json");
    assert!(std::fs::exists(&file).unwrap());
}

#[tokio::test]
#[test_log::test]
async fn remove_key() {
    let storage = FileSystemStorage::new(&setup_empty_test_folder("remove_key"));
    storage.set("cache_reports_u1", "[]").await.unwrap();
    storage.remove("cache_reports_u1").await.unwrap();
    assert_eq!(storage.get("cache_reports_u1").await.unwrap(), None);
    // Removing twice is fine.
    storage.remove("cache_reports_u1").await.unwrap();
}

#[tokio::test]
async fn memory_storage_clones_share_content() {
    let storage = MemoryStorage::with_entries(&[("auth_token", "abc")]);
    let clone = storage.clone();
    clone.set("cache_profile_u1", "{}").await.unwrap();
    assert_eq!(storage.get("auth_token").await.unwrap().as_deref(), Some("abc"));
    assert_eq!(storage.value("cache_profile_u1").as_deref(), Some("{}"));
    storage.remove("auth_token").await.unwrap();
    assert_eq!(clone.get("auth_token").await.unwrap(), None);
}

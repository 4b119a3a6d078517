use miqcache::db::DB;
use tempfile::TempDir;

/// Crée une DB temporaire pour les tests
fn create_test_db() -> (TempDir, DB) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db = DB::init(&temp_dir.path().join("test.db")).unwrap();
    (temp_dir, db)
}

#[test]
fn test_db_init() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("test.db");
    assert!(DB::init(&db_path).is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_upsert_and_get() {
    let (_temp_dir, db) = create_test_db();

    db.upsert("https://a/azan.mp3", "abc.mp3", 1234).unwrap();

    let entry = db.get("https://a/azan.mp3").unwrap().unwrap();
    assert_eq!(entry.url, "https://a/azan.mp3");
    assert_eq!(entry.file, "abc.mp3");
    assert_eq!(entry.size, 1234);
    assert_eq!(entry.hits, 0);
    assert!(entry.last_used.is_none());
}

#[test]
fn test_get_missing_is_none() {
    let (_temp_dir, db) = create_test_db();
    assert!(db.get("https://nowhere").unwrap().is_none());
}

#[test]
fn test_upsert_overwrites_without_duplicate() {
    let (_temp_dir, db) = create_test_db();

    db.upsert("u", "f.mp3", 10).unwrap();
    db.update_hit("u").unwrap();
    db.upsert("u", "f.mp3", 20).unwrap();

    assert_eq!(db.count().unwrap(), 1);
    let entry = db.get("u").unwrap().unwrap();
    assert_eq!(entry.size, 20);
    // les statistiques survivent au re-stockage
    assert_eq!(entry.hits, 1);
}

#[test]
fn test_update_hit() {
    let (_temp_dir, db) = create_test_db();
    db.upsert("u", "f", 1).unwrap();

    db.update_hit("u").unwrap();
    db.update_hit("u").unwrap();

    let entry = db.get("u").unwrap().unwrap();
    assert_eq!(entry.hits, 2);
    assert!(entry.last_used.is_some());
}

#[test]
fn test_delete_and_purge() {
    let (_temp_dir, db) = create_test_db();
    db.upsert("a", "a.mp3", 1).unwrap();
    db.upsert("b", "b.mp3", 1).unwrap();
    db.upsert("c", "c.mp3", 1).unwrap();

    assert!(db.delete("a").unwrap());
    assert!(!db.delete("a").unwrap());
    assert_eq!(db.count().unwrap(), 2);

    db.purge().unwrap();
    assert_eq!(db.count().unwrap(), 0);
    assert!(db.get_all().unwrap().is_empty());
}

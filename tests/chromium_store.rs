use recookie::cookie::{Cookie, WriteCandidate};
use recookie::error::RecookieError;
use recookie::store::{ChromiumStore, CookieStore};
use recookie::sync::{sync, SyncRequest};
use rusqlite::Connection;
use std::path::Path;
use tempfile::tempdir;

fn create_modern_cookie_db(path: &Path) {
    let conn = Connection::open(path).expect("open cookie db");
    conn.execute("CREATE TABLE meta (key TEXT, value TEXT)", [])
        .expect("create meta");
    conn.execute("INSERT INTO meta (key, value) VALUES ('version', '24')", [])
        .expect("insert meta");
    conn.execute(
        "CREATE TABLE cookies (
            creation_utc INTEGER,
            host_key TEXT,
            top_frame_site_key TEXT,
            name TEXT,
            value TEXT,
            encrypted_value BLOB,
            path TEXT,
            expires_utc INTEGER,
            is_secure INTEGER,
            is_httponly INTEGER,
            last_access_utc INTEGER,
            has_expires INTEGER,
            is_persistent INTEGER,
            priority INTEGER,
            samesite INTEGER,
            source_scheme INTEGER,
            source_port INTEGER,
            last_update_utc INTEGER
        )",
        [],
    )
    .expect("create cookies");
}

fn create_legacy_cookie_db(path: &Path) {
    let conn = Connection::open(path).expect("open cookie db");
    conn.execute("CREATE TABLE meta (key TEXT, value TEXT)", [])
        .expect("create meta");
    conn.execute("INSERT INTO meta (key, value) VALUES ('version', '9')", [])
        .expect("insert meta");
    conn.execute(
        "CREATE TABLE cookies (
            host_key TEXT,
            name TEXT,
            value TEXT,
            encrypted_value BLOB,
            path TEXT,
            expires_utc INTEGER,
            secure INTEGER,
            httponly INTEGER
        )",
        [],
    )
    .expect("create cookies");
}

fn insert_cookie(path: &Path, domain: &str, name: &str, value: &str) {
    let conn = Connection::open(path).expect("open cookie db");
    conn.execute(
        "INSERT INTO cookies (host_key, name, value, encrypted_value, path, expires_utc, is_secure, is_httponly)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        (domain, name, value, Vec::<u8>::new(), "/", 13350000000000000i64, 1i64, 1i64),
    )
    .expect("insert cookie");
}

#[tokio::test]
async fn lists_cookies_from_modern_schema() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("Cookies");
    create_modern_cookie_db(&db_path);
    insert_cookie(&db_path, "app.example.com", "session", "abc");
    insert_cookie(&db_path, "other.example.com", "tracker", "xyz");

    let store = ChromiumStore::open(&db_path).expect("open store");
    let cookies = store.list_all().await.expect("list cookies");

    assert_eq!(cookies.len(), 2);
    let session = cookies
        .iter()
        .find(|cookie| cookie.name == "session")
        .expect("session cookie");
    assert_eq!(session.domain, "app.example.com");
    assert_eq!(session.value, "abc");
    assert!(session.secure);
    assert!(session.http_only);
    assert!(session.host_only);
    assert!(!session.session);
}

#[tokio::test]
async fn writes_cookie_into_modern_schema() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("Cookies");
    create_modern_cookie_db(&db_path);

    let store = ChromiumStore::open(&db_path).expect("open store");
    let origin = Cookie {
        name: "session".to_string(),
        value: "abc".to_string(),
        domain: "app.example.com".to_string(),
        path: "/".to_string(),
        secure: true,
        http_only: true,
        host_only: true,
        session: false,
        expires: Some(13350000000000000),
    };
    let candidate = WriteCandidate::for_target(&origin, "localhost");
    assert!(store.write(&candidate).await.expect("write"));

    let cookies = store.list_all().await.expect("list cookies");
    let written = cookies
        .iter()
        .find(|cookie| cookie.domain == "localhost")
        .expect("written cookie");
    assert_eq!(written.name, "session");
    assert_eq!(written.value, "abc");
    assert!(!written.secure);
    assert!(written.http_only);
    assert_eq!(written.expires, Some(13350000000000000));
}

#[tokio::test]
async fn writes_cookie_into_legacy_schema() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("Cookies");
    create_legacy_cookie_db(&db_path);

    let store = ChromiumStore::open(&db_path).expect("open store");
    let origin = Cookie {
        name: "csrf".to_string(),
        value: "tok".to_string(),
        domain: "app.example.com".to_string(),
        path: "/api".to_string(),
        secure: false,
        http_only: false,
        host_only: true,
        session: true,
        expires: None,
    };
    let candidate = WriteCandidate::for_target(&origin, "staging.example.com");
    assert!(store.write(&candidate).await.expect("write"));

    let cookies = store.list_all().await.expect("list cookies");
    let written = cookies
        .iter()
        .find(|cookie| cookie.domain == "staging.example.com")
        .expect("written cookie");
    assert!(written.secure);
    assert!(written.session);
    assert_eq!(written.path, "/api");
}

#[tokio::test]
async fn rewrite_replaces_existing_row() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("Cookies");
    create_modern_cookie_db(&db_path);

    let store = ChromiumStore::open(&db_path).expect("open store");
    let origin = Cookie {
        name: "session".to_string(),
        value: "first".to_string(),
        domain: "a.com".to_string(),
        path: "/".to_string(),
        secure: true,
        http_only: false,
        host_only: false,
        session: true,
        expires: None,
    };
    let mut candidate = WriteCandidate::for_target(&origin, "b.com");
    assert!(store.write(&candidate).await.expect("first write"));
    candidate.value = "second".to_string();
    assert!(store.write(&candidate).await.expect("second write"));

    let cookies = store.list_all().await.expect("list cookies");
    let matching: Vec<_> = cookies
        .iter()
        .filter(|cookie| cookie.domain == "b.com" && cookie.name == "session")
        .collect();
    assert_eq!(matching.len(), 1);
    assert_eq!(matching[0].value, "second");
}

#[tokio::test]
async fn invalid_candidate_is_declined_with_host_error() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("Cookies");
    create_modern_cookie_db(&db_path);

    let store = ChromiumStore::open(&db_path).expect("open store");
    let candidate = WriteCandidate {
        url: "https://b.com".to_string(),
        name: String::new(),
        value: "v".to_string(),
        domain: "b.com".to_string(),
        path: "/".to_string(),
        secure: true,
        http_only: false,
        expires: None,
    };

    assert!(!store.write(&candidate).await.expect("declined"));
    let message = store.last_error().expect("host error");
    assert!(message.contains("name"));
}

#[tokio::test]
async fn sync_through_chromium_store_copies_matching_cookies() {
    let dir = tempdir().expect("tempdir");
    let db_path = dir.path().join("Cookies");
    create_modern_cookie_db(&db_path);
    insert_cookie(&db_path, "app.example.com", "session", "abc");
    insert_cookie(&db_path, "app.example.com", "csrf", "tok");
    insert_cookie(&db_path, "app.example.com", "ignored", "zzz");

    let store = ChromiumStore::open(&db_path).expect("open store");
    let request = SyncRequest::new(["session", "csrf"], "app.example.com", "localhost");
    let report = sync(&store, &request).await.expect("sync");

    assert_eq!(report.matched, 2);
    assert_eq!(report.written, 2);
    assert!(report.is_clean());

    let cookies = store.list_all().await.expect("list cookies");
    let local: Vec<_> = cookies
        .iter()
        .filter(|cookie| cookie.domain == "localhost")
        .collect();
    assert_eq!(local.len(), 2);
    assert!(local.iter().all(|cookie| !cookie.secure));
    assert!(!local.iter().any(|cookie| cookie.name == "ignored"));
}

#[test]
fn open_missing_database_fails() {
    let dir = tempdir().expect("tempdir");
    let err = ChromiumStore::open(&dir.path().join("missing")).expect_err("missing db");
    assert!(matches!(err, RecookieError::FileNotFound(_)));
}

// The Linux v10 key is fully deterministic (fixed password, one PBKDF2
// iteration), so encrypted-value handling can be exercised end to end.
#[cfg(target_os = "linux")]
mod encrypted_values {
    use super::*;
    use aes::Aes128;
    use cbc::cipher::{block_padding::Pkcs7, BlockEncryptMut, KeyIvInit};
    use pbkdf2::pbkdf2_hmac;
    use sha1::Sha1;

    fn v10_key() -> [u8; 16] {
        let mut key = [0u8; 16];
        pbkdf2_hmac::<Sha1>(b"peanuts", b"saltysalt", 1, &mut key);
        key
    }

    fn encrypt_v10(plaintext: &[u8]) -> Vec<u8> {
        let key = v10_key();
        let iv = [b' '; 16];
        let encryptor = cbc::Encryptor::<Aes128>::new_from_slices(&key, &iv).expect("encryptor");
        let msg_len = plaintext.len();
        let mut buffer = plaintext.to_vec();
        buffer.resize(msg_len + 16, 0);
        let ciphertext = encryptor
            .encrypt_padded_mut::<Pkcs7>(&mut buffer, msg_len)
            .expect("encrypt")
            .to_vec();
        let mut blob = b"v10".to_vec();
        blob.extend_from_slice(&ciphertext);
        blob
    }

    fn insert_encrypted_cookie(path: &Path, domain: &str, name: &str, blob: Vec<u8>) {
        let conn = Connection::open(path).expect("open cookie db");
        conn.execute(
            "INSERT INTO cookies (host_key, name, value, encrypted_value, path, expires_utc, is_secure, is_httponly)
             VALUES (?1, ?2, '', ?3, '/', 0, 1, 0)",
            (domain, name, blob),
        )
        .expect("insert encrypted cookie");
    }

    #[tokio::test]
    async fn lists_decrypted_v10_values() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("Cookies");
        create_modern_cookie_db(&db_path);

        // Schema version 24 prefixes the plaintext with a 32-byte domain hash.
        let mut plaintext = vec![0u8; 32];
        plaintext.extend_from_slice(b"decrypted-secret");
        insert_encrypted_cookie(&db_path, "app.example.com", "session", encrypt_v10(&plaintext));

        let store = ChromiumStore::open(&db_path).expect("open store");
        let cookies = store.list_all().await.expect("list cookies");

        let session = cookies
            .iter()
            .find(|cookie| cookie.name == "session")
            .expect("session cookie");
        assert_eq!(session.value, "decrypted-secret");
    }

    #[tokio::test]
    async fn legacy_schema_keeps_whole_v10_plaintext() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("Cookies");
        create_legacy_cookie_db(&db_path);

        let conn = Connection::open(&db_path).expect("open cookie db");
        conn.execute(
            "INSERT INTO cookies (host_key, name, value, encrypted_value, path, expires_utc, secure, httponly)
             VALUES ('a.com', 'session', '', ?1, '/', 0, 1, 0)",
            (encrypt_v10(b"short"),),
        )
        .expect("insert encrypted cookie");
        drop(conn);

        let store = ChromiumStore::open(&db_path).expect("open store");
        let cookies = store.list_all().await.expect("list cookies");
        assert_eq!(cookies[0].value, "short");
    }

    #[tokio::test]
    async fn skips_undecryptable_v10_rows() {
        let dir = tempdir().expect("tempdir");
        let db_path = dir.path().join("Cookies");
        create_modern_cookie_db(&db_path);
        insert_cookie(&db_path, "app.example.com", "csrf", "tok");
        insert_encrypted_cookie(
            &db_path,
            "app.example.com",
            "broken",
            b"v10not-a-valid-block".to_vec(),
        );

        let store = ChromiumStore::open(&db_path).expect("open store");
        let cookies = store.list_all().await.expect("listing still succeeds");

        assert_eq!(cookies.len(), 1);
        assert_eq!(cookies[0].name, "csrf");
    }
}

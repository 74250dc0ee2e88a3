use super::*;
use uuid::Uuid;

fn store() -> MokaCacheStore {
    MokaCacheStore::new(&CacheConfig::default())
}

#[test]
fn round_trips_a_value() {
    let store = store();
    let tenant = Uuid::new_v4();
    let key = [7u8; 32];
    assert!(store.get(Keyspace::Embedding, &key).is_none());

    store.set(Keyspace::Embedding, key, tenant, b"hello".to_vec());
    assert_eq!(store.get(Keyspace::Embedding, &key), Some(b"hello".to_vec()));
}

#[test]
fn keyspaces_are_isolated() {
    let store = store();
    let tenant = Uuid::new_v4();
    let key = [1u8; 32];
    store.set(Keyspace::Embedding, key, tenant, b"embedding".to_vec());
    assert!(store.get(Keyspace::Search, &key).is_none());
}

#[test]
fn evict_removes_a_single_key() {
    let store = store();
    let tenant = Uuid::new_v4();
    store.set(Keyspace::Search, [3u8; 32], tenant, b"cached".to_vec());
    store.set(Keyspace::Search, [4u8; 32], tenant, b"also cached".to_vec());

    store.evict(Keyspace::Search, &[3u8; 32]);

    assert!(store.get(Keyspace::Search, &[3u8; 32]).is_none());
    assert_eq!(store.get(Keyspace::Search, &[4u8; 32]), Some(b"also cached".to_vec()));
}

#[test]
fn invalidate_tenant_removes_only_that_tenants_entries() {
    let store = store();
    let tenant_a = Uuid::new_v4();
    let tenant_b = Uuid::new_v4();
    store.set(Keyspace::Embedding, [1u8; 32], tenant_a, b"a".to_vec());
    store.set(Keyspace::Embedding, [2u8; 32], tenant_b, b"b".to_vec());

    store.invalidate_tenant(tenant_a);

    assert!(store.get(Keyspace::Embedding, &[1u8; 32]).is_none());
    assert_eq!(store.get(Keyspace::Embedding, &[2u8; 32]), Some(b"b".to_vec()));
}

#[test]
fn disabled_cache_never_stores_anything() {
    let mut config = CacheConfig::default();
    config.enabled = false;
    let store = MokaCacheStore::new(&config);
    let tenant = Uuid::new_v4();
    store.set(Keyspace::Search, [3u8; 32], tenant, b"x".to_vec());
    assert!(store.get(Keyspace::Search, &[3u8; 32]).is_none());
    assert!(!store.stats().enabled);
}

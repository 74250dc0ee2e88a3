//! Basic cache read/write flow against the search keyspace.

use anyhow::Result;

#[cfg(feature = "mock")]
#[tokio::main]
async fn main() -> Result<()> {
    use synapse_core::cache::{CacheStore, Keyspace, MokaCacheStore};
    use synapse_core::config::CacheConfig;
    use synapse_core::hashing;

    let cache = MokaCacheStore::new(&CacheConfig::default());
    let tenant_id = uuid::Uuid::new_v4();
    let key = hashing::search_key("hello", r#"{"mode":"hybrid","top_k":10}"#);

    match cache.get(Keyspace::Search, &key) {
        Some(bytes) => println!("hit ({} bytes)", bytes.len()),
        None => {
            println!("miss, writing through");
            cache.set(Keyspace::Search, key, tenant_id, b"{\"results\":[]}".to_vec());
        }
    }

    Ok(())
}

#[cfg(not(feature = "mock"))]
fn main() {
    eprintln!("Run with: cargo run --example basic_lookup --features mock");
}

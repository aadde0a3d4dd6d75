use std::time::Duration;

use itinera_cache::{CacheClient, CacheOutcome, KvCache, RedisKvCache};
use itinera_test_infra::redis::RedisServer;
use redis::AsyncCommands;

struct Fixture {
    redis: RedisServer,
    cache: RedisKvCache,
}

impl Fixture {
    async fn start() -> Self {
        let redis = RedisServer::new().await.expect("start redis");
        let url = redis.url().await.expect("redis url");
        let cache = RedisKvCache::open(&url).expect("open redis cache");
        Self { redis, cache }
    }
}

#[tokio::test]
#[ignore = "requires docker"]
async fn set_get_and_ttl() {
    let fixture = Fixture::start().await;

    fixture
        .cache
        .set("itinerary:abc", "{\"a\":1}".to_string(), Duration::from_secs(300))
        .await
        .unwrap();

    let value = fixture.cache.get("itinerary:abc").await.unwrap();
    assert_eq!(value.as_deref(), Some("{\"a\":1}"));

    let mut conn = fixture.redis.connection().await.unwrap();
    let ttl: i64 = conn.ttl("itinerary:abc").await.unwrap();
    assert!(ttl > 290 && ttl <= 300, "unexpected ttl {ttl}");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn get_missing_key_is_none() {
    let fixture = Fixture::start().await;
    assert_eq!(fixture.cache.get("itinerary:missing").await.unwrap(), None);
}

#[tokio::test]
#[ignore = "requires docker"]
async fn exact_pattern_delete_leaves_neighbours() {
    let fixture = Fixture::start().await;
    for key in ["itinerary:a", "itinerary:ab", "shareable:0123456789abcdef"] {
        fixture
            .cache
            .set(key, "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
    }

    assert_eq!(fixture.cache.delete_pattern("itinerary:a").await.unwrap(), 1);
    assert!(fixture.cache.get("itinerary:a").await.unwrap().is_none());
    assert!(fixture.cache.get("itinerary:ab").await.unwrap().is_some());
    assert!(fixture
        .cache
        .get("shareable:0123456789abcdef")
        .await
        .unwrap()
        .is_some());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn glob_pattern_delete_scans() {
    let fixture = Fixture::start().await;
    let cache = RedisKvCache::open(&fixture.redis.url().await.unwrap())
        .unwrap()
        .with_scan_count(2);
    for i in 0..7 {
        cache
            .set(&format!("itinerary:{i}"), "v".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
    }
    cache
        .set("shareable:0123456789abcdef", "v".to_string(), Duration::from_secs(60))
        .await
        .unwrap();

    assert_eq!(cache.delete_pattern("itinerary:*").await.unwrap(), 7);
    assert_eq!(cache.delete_pattern("itinerary:*").await.unwrap(), 0);
    assert!(cache.get("shareable:0123456789abcdef").await.unwrap().is_some());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn client_reports_availability() {
    let fixture = Fixture::start().await;
    let client = CacheClient::new(fixture.cache);

    assert!(client.is_available().await);
    assert_eq!(
        client
            .set("itinerary:x", &vec![1, 2, 3], Duration::from_secs(5))
            .await,
        CacheOutcome::Ok(())
    );
    assert_eq!(
        client.get::<Vec<i32>>("itinerary:x").await,
        CacheOutcome::Ok(Some(vec![1, 2, 3]))
    );
}

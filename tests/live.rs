//! Runs against a real broker when `BEANSTALKD_ADDR` (`host:port`) is set,
//! e.g. after `beanstalkd -l 127.0.0.1 -p 14711 &`. Without it, these tests
//! pass without doing anything.
use std::env;
use std::time::Duration;

use beanstalk_client::{Connection, Dict, Value};
use tokio::time::timeout;

async fn live_connection() -> Option<Connection> {
    let Ok(addr) = env::var("BEANSTALKD_ADDR") else {
        eprintln!("BEANSTALKD_ADDR not set, skipping");
        return None;
    };

    let (host, port) =
        addr.rsplit_once(':').expect("BEANSTALKD_ADDR is host:port");
    let port = port.parse().expect("BEANSTALKD_ADDR has a numeric port");

    Some(Connection::open(host, port).await.unwrap())
}

fn counts(stats: &Dict) -> (Value, Value) {
    (
        stats["current-jobs-ready"].clone(),
        stats["current-jobs-reserved"].clone(),
    )
}

#[tokio::test]
async fn test_round_trip_leaves_tube_unchanged() {
    let Some(mut conn) = live_connection().await else {
        return;
    };

    let tube = format!("round-trip-{}", std::process::id());
    assert_eq!(conn.use_tube(&tube).await.unwrap(), tube);
    assert_eq!(conn.watch(&tube).await.unwrap(), 2);
    assert_eq!(conn.ignore("default").await.unwrap(), 1);

    // An empty tube gives nothing back, promptly.
    let reserving = conn.reserve_with_timeout(0);
    let reserved = timeout(Duration::from_secs(2), reserving)
        .await
        .expect("reserve-with-timeout 0 should not block")
        .unwrap();
    assert!(reserved.is_none());

    let before = counts(&conn.stats_tube(&tube).await.unwrap());

    let id = conn.put_with(b"round\r\ntrip", 100, 0, 60).await.unwrap();

    let mut job = conn.reserve_with_timeout(0).await.unwrap().unwrap();
    assert_eq!(job.id(), id);
    assert_eq!(job.body(), "round\r\ntrip");
    assert_eq!(job.priority(&mut conn).await.unwrap(), 100);

    job.delete(&mut conn).await.unwrap();
    assert!(!job.is_reserved());

    let after = counts(&conn.stats_tube(&tube).await.unwrap());
    assert_eq!(before, after);

    assert!(conn.peek(id).await.unwrap().is_none());
    assert!(conn.reserve_with_timeout(0).await.unwrap().is_none());

    conn.close().await;
}

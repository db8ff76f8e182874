//! Log events emitted below a lookup carry the lookup's trace id and query.

mod common;

use std::io;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use common::{FlakyStore, ScriptedProvider};
use pricing_shield::cache::CacheConfig;
use pricing_shield::{MemoryStore, PricingConfig, PricingService, RateQuery, RateSource};
use tracing::subscriber::DefaultGuard;

fn query() -> RateQuery {
    RateQuery::new("Summer", "FloatingPointResort", "SingletonRoom")
}

fn test_config() -> PricingConfig {
    PricingConfig::new().cache(
        CacheConfig::new()
            .claim_wait(Duration::from_secs(2))
            .poll_interval(Duration::from_millis(5)),
    )
}

/// Formatted log output collected in memory.
#[derive(Clone, Default)]
struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Install a debug-level subscriber for the current thread.
    fn capture(&self) -> DefaultGuard {
        let buffer = self.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || buffer.clone())
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    fn line_containing(&self, needle: &str) -> String {
        let bytes = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&bytes)
            .lines()
            .find(|line| line.contains(needle))
            .unwrap_or_else(|| panic!("no log line contains {needle:?}"))
            .to_owned()
    }
}

impl io::Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn assert_carries_lookup_fields(line: &str) {
    assert!(line.contains("trace_id="), "{line}");
    assert!(line.contains("hotel=FloatingPointResort"), "{line}");
    assert!(line.contains("room=SingletonRoom"), "{line}");
}

// Current-thread runtimes keep spawned recomputes under the thread's subscriber.

#[tokio::test]
async fn stale_serve_is_logged_with_lookup_fields() {
    let logs = LogBuffer::default();
    let _guard = logs.capture();

    let provider = Arc::new(
        ScriptedProvider::rate(&query(), "200").with_delay(Duration::from_millis(150)),
    );
    let service = Arc::new(PricingService::new(
        provider.clone(),
        Arc::new(MemoryStore::new()),
        test_config().cache_ttl(Duration::from_millis(30)),
    ));

    service.fetch_rate(&query()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(60)).await;

    let refresh = {
        let service = Arc::clone(&service);
        tokio::spawn(async move { service.fetch_rate(&query()).await })
    };
    tokio::time::sleep(Duration::from_millis(30)).await;

    let stale = service.fetch_rate(&query()).await.unwrap();
    assert_eq!(stale.source, RateSource::Stale);
    refresh.await.unwrap().unwrap();

    assert_carries_lookup_fields(&logs.line_containing("serving stale entry"));
}

#[tokio::test]
async fn persist_failure_is_logged_with_lookup_fields() {
    let logs = LogBuffer::default();
    let _guard = logs.capture();

    let provider = Arc::new(ScriptedProvider::rate(&query(), "200"));
    let store = FlakyStore::new();
    store.fail_writes(true);
    let service = PricingService::new(provider.clone(), Arc::new(store), test_config());

    let rate = service.fetch_rate(&query()).await.unwrap();
    assert_eq!(rate.value, "200");

    assert_carries_lookup_fields(&logs.line_containing("failed to persist computed value"));
}

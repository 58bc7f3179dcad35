//! Registry with a hub, a `LogWriter`, one call and one deduplicated subscription.
//!
//! Run with `RUST_LOG=debug` to see the diagnostics.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use callhub::{
    BoxHandle, Config, EventSinkRef, HandlerError, Listener, LogWriter, NamedEvent, Registry,
    ResultSinkRef, canonical_key,
};
use tokio_util::sync::CancellationToken;

struct Printer(&'static str);

#[async_trait]
impl Listener for Printer {
    async fn on_event(&self, event: &NamedEvent) {
        println!(
            "[{}] {} => {}",
            self.0,
            event.name(),
            String::from_utf8_lossy(&event.payload)
        );
    }

    fn name(&self) -> &str {
        self.0
    }
}

fn ticker(args: Bytes, sink: EventSinkRef) -> Result<BoxHandle, HandlerError> {
    let millis: u64 = std::str::from_utf8(&args)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| HandlerError::invalid("period must be a number of milliseconds"))?;
    let token = CancellationToken::new();
    let stop = token.clone();
    tokio::spawn(async move {
        let mut n = 0u64;
        loop {
            tokio::select! {
                _ = stop.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_millis(millis)) => {
                    n += 1;
                    sink.on_event(Bytes::from(n.to_string()));
                }
            }
        }
    });
    Ok(Box::new(token))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut builder = Registry::builder(Config::default());
    let hub = builder.hub();
    let registry = builder.build();
    let writer = LogWriter::spawn(registry.diagnostics());

    hub.attach(Arc::new(Printer("alice")));
    hub.attach(Arc::new(Printer("bob")));

    registry.register_function("Echo", |args: Bytes, sink: ResultSinkRef| {
        sink.on_success(args);
        Ok(())
    });
    registry.register_subscription("Ticker", ticker, |args: &[u8]| {
        Ok(canonical_key("Ticker", [String::from_utf8_lossy(args)]))
    });

    let reply = registry
        .call_timeout("Echo", Bytes::from_static(b"hello"), Duration::from_secs(1))
        .await?;
    println!("Echo => {}", String::from_utf8_lossy(&reply));

    // Same args, same key: one producer for both subscribers.
    let key = registry.subscribe("Ticker", Bytes::from_static(b"100"))?;
    registry.subscribe("Ticker", Bytes::from_static(b"100"))?;
    println!("{key} refcount = {:?}", registry.refcount(&key));

    tokio::time::sleep(Duration::from_millis(350)).await;
    registry.cancel_subscription(&key);
    tokio::time::sleep(Duration::from_millis(200)).await;
    registry.cancel_subscription(&key);

    registry.shutdown();
    hub.shutdown().await;
    writer.abort();
    Ok(())
}

//! Periodic best-effort reads
//!
//! A poller refreshes one value (block number, counter) on a fixed period and
//! publishes the latest success. Failed fetches are logged and skipped; they
//! never touch session or transaction state. Dropping the poller stops it.

use crate::chain::ChainClient;
use crate::Result;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

pub struct Poller<T> {
    latest: watch::Receiver<Option<T>>,
    handle: JoinHandle<()>,
}

impl<T> Poller<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Start polling `fetch` every `period`, beginning immediately
    pub fn spawn<F, Fut>(name: &'static str, period: Duration, mut fetch: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
    {
        let (sender, latest) = watch::channel(None);

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                match fetch().await {
                    Ok(value) => {
                        if sender.send(Some(value)).is_err() {
                            break;
                        }
                    }
                    Err(e) => tracing::debug!(poller = name, error = %e, "Poll failed"),
                }
            }
        });

        Self { latest, handle }
    }

    /// Latest successfully fetched value
    pub fn latest(&self) -> Option<T> {
        self.latest.borrow().clone()
    }

    /// Receiver notified on every successful fetch
    pub fn subscribe(&self) -> watch::Receiver<Option<T>> {
        self.latest.clone()
    }

    /// Stop polling
    pub fn stop(self) {}
}

impl<T> Drop for Poller<T> {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Poll the chain's block number
pub fn block_number_poller(chain: Arc<dyn ChainClient>, period: Duration) -> Poller<u64> {
    Poller::spawn("block_number", period, move || {
        let chain = chain.clone();
        async move { chain.block_number().await }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::testing::MockChainClient;

    async fn next_value<T: Clone>(rx: &mut watch::Receiver<Option<T>>) -> T {
        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(Option::is_some))
            .await
            .expect("poller produced a value")
            .expect("poller alive")
            .clone()
            .unwrap()
    }

    #[tokio::test]
    async fn publishes_block_numbers() {
        let chain = Arc::new(MockChainClient::new());
        chain.set_block(100);

        let poller = block_number_poller(chain.clone(), Duration::from_millis(10));
        let mut rx = poller.subscribe();

        let first = next_value(&mut rx).await;
        assert!(first >= 100);

        rx.mark_unchanged();
        rx.changed().await.unwrap();
        assert!(poller.latest().unwrap() > first);
    }

    #[tokio::test]
    async fn failures_keep_last_value() {
        let chain = Arc::new(MockChainClient::new());
        chain.set_block(5);

        let poller = block_number_poller(chain.clone(), Duration::from_millis(10));
        let mut rx = poller.subscribe();
        next_value(&mut rx).await;

        chain.fail_reads(true);
        tokio::time::sleep(Duration::from_millis(50)).await;
        let frozen = poller.latest().unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(poller.latest().unwrap(), frozen);

        chain.fail_reads(false);
        rx.mark_unchanged();
        tokio::time::timeout(Duration::from_secs(5), rx.changed())
            .await
            .unwrap()
            .unwrap();
        assert!(poller.latest().unwrap() > frozen);
    }

    #[tokio::test]
    async fn stop_ends_the_task() {
        let chain = Arc::new(MockChainClient::new());
        let poller = block_number_poller(chain.clone(), Duration::from_millis(10));
        let mut rx = poller.subscribe();
        next_value(&mut rx).await;

        poller.stop();
        let result = tokio::time::timeout(Duration::from_secs(5), async {
            while rx.changed().await.is_ok() {}
        })
        .await;
        tokio_test::assert_ok!(result);
    }
}

use std::time::Duration;

use anyhow::{ensure, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// 表示を更新するための通知。状態は持たない。
#[derive(Clone, Copy, Debug)]
pub struct Tick {
    pub at: Instant,
}

/// 一定間隔で`Tick`を送るタスク。
///
/// `Ticker`を破棄するとタスクも止まる。
pub struct Ticker {
    receiver: mpsc::Receiver<Tick>,
    handle: JoinHandle<()>,
}

impl Ticker {
    /// `period`が0の場合はエラーを返す。
    pub fn spawn(period: Duration) -> Result<Self> {
        ensure!(!period.is_zero(), "Tick period must be greater than zero");

        let (sender, receiver) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                let at = interval.tick().await;
                if sender.send(Tick { at }).await.is_err() {
                    break;
                }
            }
        });

        Ok(Self { receiver, handle })
    }

    /// 次の通知を待つ。最初の通知はすぐに届く。
    pub async fn tick(&mut self) -> Option<Tick> {
        self.receiver.recv().await
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

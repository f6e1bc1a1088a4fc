//! Commands and the cooperative loop that drives them.
//!
//! A view reacts to a [`Message`](View::Message) by mutating its state and
//! returning a [`Command`]: a batch of futures that each resolve to another
//! message. [`run_until_idle`] polls every outstanding future on the calling
//! task and feeds results back into the view in completion order.

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use futures::FutureExt;
use std::future::Future;
use std::sync::Arc;

pub struct Command<M> {
    futures: Vec<BoxFuture<'static, M>>,
}

impl<M> std::fmt::Debug for Command<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Command").field("pending", &self.futures.len()).finish()
    }
}

impl<M: Send + 'static> Command<M> {
    pub fn none() -> Self {
        Command { futures: Vec::new() }
    }

    /// Run `future` and turn its output into a message.
    pub fn perform<T, F, G>(future: F, map: G) -> Self
    where
        F: Future<Output = T> + Send + 'static,
        G: FnOnce(T) -> M + Send + 'static,
    {
        Command {
            futures: vec![future.map(map).boxed()],
        }
    }

    pub fn batch(commands: impl IntoIterator<Item = Command<M>>) -> Self {
        Command {
            futures: commands.into_iter().flat_map(|c| c.futures).collect(),
        }
    }

    pub fn map<N, F>(self, f: F) -> Command<N>
    where
        N: Send + 'static,
        F: Fn(M) -> N + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Command {
            futures: self
                .futures
                .into_iter()
                .map(|future| {
                    let f = f.clone();
                    future.map(move |m| (*f)(m)).boxed()
                })
                .collect(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.futures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.futures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.futures.is_empty()
    }
}

pub trait View {
    type Message: Send + 'static;

    fn update(&mut self, message: Self::Message) -> Command<Self::Message>;
}

/// Drive `command` and every command it produces until nothing is pending.
/// Returns the number of messages delivered to the view.
pub async fn run_until_idle<V: View>(view: &mut V, command: Command<V::Message>) -> usize {
    let mut pending: FuturesUnordered<_> = command.futures.into_iter().collect();
    let mut delivered = 0;
    while let Some(message) = pending.next().await {
        delivered += 1;
        for future in view.update(message).futures {
            pending.push(future);
        }
    }
    delivered
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    struct Counter {
        seen: Vec<u32>,
    }

    impl View for Counter {
        type Message = u32;

        fn update(&mut self, message: u32) -> Command<u32> {
            self.seen.push(message);
            if message == 1 {
                Command::perform(async {}, |_| 2)
            } else {
                Command::none()
            }
        }
    }

    #[tokio::test]
    async fn test_follow_up_commands_run() {
        let mut view = Counter { seen: Vec::new() };
        let delivered = run_until_idle(&mut view, Command::perform(async { 1 }, |n| n)).await;
        assert_eq!(delivered, 2);
        assert_eq!(view.seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_completion_order_wins() {
        let mut view = Counter { seen: Vec::new() };
        let slow = Command::perform(tokio::time::sleep(Duration::from_millis(40)), |_| 10);
        let fast = Command::perform(async { 20 }, |n| n);
        run_until_idle(&mut view, Command::batch([slow, fast])).await;
        assert_eq!(view.seen, vec![20, 10]);
    }

    #[test]
    fn test_map_and_batch() {
        let cmd: Command<u32> = Command::batch([Command::perform(async { 1 }, |n| n), Command::none()]);
        assert_eq!(cmd.len(), 1);
        let mapped = cmd.map(|n| n.to_string());
        assert!(!mapped.is_none());
    }
}

use tokio_stream::Stream;

/// Monotonic counter bumped by every mutation that changed the store.
pub type Revision = u64;

/// Fans a revision out to every live [`Changes`] handle.
#[derive(Default)]
pub struct Observers {
    revision: Revision,
    senders: Vec<flume::Sender<Revision>>,
}

impl Observers {
    pub fn revision(&self) -> Revision {
        self.revision
    }

    pub fn subscribe(&mut self) -> Changes {
        let (tx, rx) = flume::unbounded();
        self.senders.push(tx);
        Changes { rx }
    }

    pub fn notify(&mut self) {
        self.revision += 1;
        let revision = self.revision;
        // dropped handles are pruned here
        self.senders.retain(|tx| tx.send(revision).is_ok());
    }
}

/// Receiving half handed to a view.
pub struct Changes {
    rx: flume::Receiver<Revision>,
}

impl Changes {
    /// Drains pending notifications, returning the newest revision if there were any.
    pub fn poll(&self) -> Option<Revision> {
        self.rx.try_iter().last()
    }

    /// Waits for the next notification. `None` once the store is gone.
    pub async fn changed(&self) -> Option<Revision> {
        self.rx.recv_async().await.ok()
    }

    pub fn into_stream(self) -> impl Stream<Item = Revision> + Unpin {
        self.rx.into_stream()
    }
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    #[test]
    fn poll_returns_latest() {
        let mut observers = Observers::default();
        let changes = observers.subscribe();
        assert_eq!(changes.poll(), None);

        observers.notify();
        observers.notify();
        assert_eq!(changes.poll(), Some(2));
        assert_eq!(changes.poll(), None);
    }

    #[test]
    fn dropped_handles_are_pruned() {
        let mut observers = Observers::default();
        let kept = observers.subscribe();
        drop(observers.subscribe());

        observers.notify();
        assert_eq!(observers.senders.len(), 1);
        assert_eq!(kept.poll(), Some(1));
    }

    #[tokio::test]
    async fn stream_ends_with_the_store() {
        let mut observers = Observers::default();
        let stream = observers.subscribe().into_stream();
        observers.notify();
        drop(observers);

        let seen = stream.collect::<Vec<_>>().await;
        assert_eq!(seen, vec![1]);
    }
}

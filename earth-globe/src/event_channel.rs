use bevy::log::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// Typed publish/subscribe channel. Every subscriber receives its own copy of
/// each published event and drains it with [`Subscription::try_recv`].
pub struct EventChannel<T> {
    subscribers: Vec<(SubscriptionId, async_channel::Sender<T>)>,
    next_id: u64,
}

pub struct Subscription<T> {
    id: SubscriptionId,
    receiver: async_channel::Receiver<T>,
}

impl<T> Subscription<T> {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }
    pub fn try_recv(&self) -> Option<T> {
        self.receiver.try_recv().ok()
    }
    pub fn drain(&self) -> Vec<T> {
        let mut events = vec![];
        while let Ok(event) = self.receiver.try_recv() {
            events.push(event);
        }
        events
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self {
            subscribers: vec![],
            next_id: 0,
        }
    }
}

impl<T: Clone> EventChannel<T> {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn subscribe(&mut self) -> Subscription<T> {
        let (sender, receiver) = async_channel::unbounded();
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, sender));
        Subscription { id, receiver }
    }
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(subscriber, _)| *subscriber != id);
        self.subscribers.len() != before
    }
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
    /// Delivers `event` to every live subscriber. Subscribers whose
    /// [`Subscription`] was dropped are removed.
    pub fn publish(&mut self, event: T) {
        self.subscribers.retain(|(id, sender)| {
            if sender.try_send(event.clone()).is_ok() {
                true
            } else {
                debug!("dropping closed subscription {:?}", id);
                false
            }
        });
    }
}

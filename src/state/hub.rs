use tokio::sync::broadcast;

use crate::dto::viewer::ViewerEvent;

/// Fan-out of [`ViewerEvent`]s from one viewer actor to every observer.
///
/// Slow observers lag and skip events rather than hold the actor back.
pub struct EventHub {
    sender: broadcast::Sender<ViewerEvent>,
}

impl EventHub {
    /// Hub keeping at most `capacity` unread events per observer (at least one).
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Observer seeing events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ViewerEvent> {
        self.sender.subscribe()
    }

    /// Publish `event`; having no observers is not an error.
    pub fn broadcast(&self, event: ViewerEvent) {
        let _ = self.sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observers_only_see_later_events() {
        let hub = EventHub::new(0);
        hub.broadcast(ViewerEvent::RolesChanged { participants: 1 });
        let mut observer = hub.subscribe();

        hub.broadcast(ViewerEvent::RolesChanged { participants: 2 });

        assert_eq!(
            observer.try_recv().ok(),
            Some(ViewerEvent::RolesChanged { participants: 2 })
        );
        assert!(observer.try_recv().is_err());
    }
}

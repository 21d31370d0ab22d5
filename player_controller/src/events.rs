//! Discrete controller notifications fanned out to registered observers.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerEvent {
    Jumped,
    GroundJumped,
    AirJumped,
    LeftGround,
    Landed,
    Crushed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Explicit observer list. Notifications are fire-and-forget and fire at
/// most once per qualifying transition per step.
#[derive(Default)]
pub struct EventHub {
    observers: Vec<(ObserverId, Box<dyn FnMut(ControllerEvent)>)>,
    next_id: u64,
}

impl EventHub {
    pub fn subscribe(&mut self, observer: impl FnMut(ControllerEvent) + 'static) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer_id, _)| *observer_id != id);
        self.observers.len() != before
    }

    pub fn publish(&mut self, event: ControllerEvent) {
        for (_, observer) in &mut self.observers {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn subscribers_receive_events_until_unsubscribed() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let mut hub = EventHub::default();

        let sink = Rc::clone(&seen);
        let id = hub.subscribe(move |event| sink.borrow_mut().push(event));
        hub.publish(ControllerEvent::Jumped);
        hub.publish(ControllerEvent::Landed);

        assert!(hub.unsubscribe(id));
        hub.publish(ControllerEvent::Crushed);

        assert_eq!(
            *seen.borrow(),
            vec![ControllerEvent::Jumped, ControllerEvent::Landed]
        );
        assert!(!hub.unsubscribe(id));
    }
}

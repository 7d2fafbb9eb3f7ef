use serde_json::Value;

use super::EventBuffer;
use crate::event::DomainEvent;

/// A business entity that raises domain events.
///
/// The aggregate owns an [`EventBuffer`]; events published on it are turned
/// into outbox rows when the aggregate is committed. `snapshot` is the
/// business state written alongside those rows and must not include the
/// buffer (mark the field `#[serde(skip)]`).
pub trait AggregateRoot: Send {
    fn aggregate_id(&self) -> String;
    fn events(&self) -> &EventBuffer;
    fn events_mut(&mut self) -> &mut EventBuffer;
    fn snapshot(&self) -> Result<Value, serde_json::Error>;

    /// Record an event for delivery after the next successful commit.
    fn publish_event<E: DomainEvent>(&mut self, event: E)
    where
        Self: Sized,
    {
        self.events_mut().publish(event);
    }

    fn has_pending_events(&self) -> bool {
        !self.events().is_empty()
    }

    fn clear_events(&mut self) {
        self.events_mut().clear();
    }
}

/// Implement [`AggregateRoot`] and [`Committable`](crate::Committable) for a
/// serializable struct with an id field and an [`EventBuffer`] field.
///
/// ```ignore
/// #[derive(Default, Serialize, Deserialize)]
/// struct Order {
///     id: String,
///     total_cents: u64,
///     #[serde(skip)]
///     events: EventBuffer,
/// }
///
/// impl_aggregate_root!(Order, id, events);
/// ```
#[macro_export]
macro_rules! impl_aggregate_root {
    ($ty:ty, $id:ident, $events:ident) => {
        impl $crate::AggregateRoot for $ty {
            fn aggregate_id(&self) -> String {
                self.$id.to_string()
            }

            fn events(&self) -> &$crate::EventBuffer {
                &self.$events
            }

            fn events_mut(&mut self) -> &mut $crate::EventBuffer {
                &mut self.$events
            }

            fn snapshot(
                &self,
            ) -> Result<$crate::__private::serde_json::Value, $crate::__private::serde_json::Error>
            {
                $crate::__private::serde_json::to_value(self)
            }
        }

        impl $crate::Committable for $ty {
            fn aggregates_mut(&mut self) -> Vec<&mut dyn $crate::AggregateRoot> {
                vec![self as &mut dyn $crate::AggregateRoot]
            }
        }
    };
}

use serde_json::Value;

use super::EventEnvelope;

/// A stateless, pure transformation that moves an event payload from one schema
/// version to the next.
///
/// Upcasters are plain structs with function pointers, registered on the
/// [`EventRegistry`](super::EventRegistry) and applied before decoding, so rows
/// captured under an old shape stay publishable.
#[derive(Clone, Copy, Debug)]
pub struct EventUpcaster {
    pub event_type: &'static str,
    pub from_version: u32,
    pub to_version: u32,
    pub transform: fn(payload: Value) -> Value,
}

/// Apply upcasters to an envelope. Chains automatically (v1->v2->v3).
pub fn upcast_envelope(mut envelope: EventEnvelope, upcasters: &[EventUpcaster]) -> EventEnvelope {
    loop {
        let next = upcasters.iter().find(|u| {
            u.event_type == envelope.event_type
                && u.from_version == envelope.schema_version
                && u.to_version > u.from_version
        });

        let Some(upcaster) = next else {
            break;
        };

        let payload = std::mem::take(&mut envelope.payload);
        envelope.payload = (upcaster.transform)(payload);
        envelope.schema_version = upcaster.to_version;
    }
    envelope
}

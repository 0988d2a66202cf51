use chrono::{DateTime, Utc};
use shared::domain::{CallLogEntry, LogEntryId, McNumber, PhoneNumber};
use uuid::Uuid;

/// Increment-or-insert keyed by phone number. Two carriers sharing a phone
/// number collapse into one entry, and that entry keeps the MC number of the
/// first call; this is deliberate, observable behavior.
pub fn record_call(
    log: &[CallLogEntry],
    phone_number: &PhoneNumber,
    mc_number: &McNumber,
    now: DateTime<Utc>,
) -> Vec<CallLogEntry> {
    let mut updated: Vec<CallLogEntry> = log.to_vec();

    if let Some(entry) = updated
        .iter_mut()
        .find(|entry| &entry.phone_number == phone_number)
    {
        entry.call_count += 1;
        entry.last_called = now;
        return updated;
    }

    updated.push(CallLogEntry {
        id: LogEntryId::new(Uuid::new_v4().to_string()),
        phone_number: phone_number.clone(),
        carrier_name: mc_number.clone(),
        call_count: 1,
        last_called: now,
    });
    updated
}

/// Most recent first. Display ordering only; the stored log keeps insertion
/// order.
pub fn sorted_for_display(log: &[CallLogEntry]) -> Vec<CallLogEntry> {
    let mut sorted = log.to_vec();
    sorted.sort_by(|a, b| b.last_called.cmp(&a.last_called));
    sorted
}

pub fn total_calls(log: &[CallLogEntry]) -> u64 {
    log.iter().map(|entry| u64::from(entry.call_count)).sum()
}

use shared::{
    domain::{CallLogEntry, CarrierRecord},
    protocol::{BulkCallItem, BulkItemResult, CallStatus},
};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub success_count: usize,
    pub error_count: usize,
}

/// Join selected MC numbers against the carrier store, in store order,
/// dropping targets without a dialable phone number before anything reaches
/// the wire.
pub fn build_items<F>(is_selected: F, carriers: &[CarrierRecord]) -> Vec<BulkCallItem>
where
    F: Fn(&str) -> bool,
{
    carriers
        .iter()
        .filter(|carrier| is_selected(carrier.mc_number.as_str()))
        .filter(|carrier| carrier.phone.is_dialable())
        .map(|carrier| BulkCallItem {
            phone_number: carrier.phone.clone(),
            mc_number: carrier.mc_number.clone(),
            state: carrier.state.clone(),
        })
        .collect()
}

/// Same join for recalls over log entries. A recall carries no state column,
/// so the wire item sends an empty state.
pub fn recall_items<F>(is_selected: F, logs: &[CallLogEntry]) -> Vec<BulkCallItem>
where
    F: Fn(&str) -> bool,
{
    logs.iter()
        .filter(|entry| is_selected(entry.id.as_str()))
        .filter(|entry| entry.phone_number.is_dialable())
        .map(|entry| BulkCallItem {
            phone_number: entry.phone_number.clone(),
            mc_number: entry.carrier_name.clone(),
            state: String::new(),
        })
        .collect()
}

pub fn summarize(results: &[BulkItemResult]) -> BulkSummary {
    results.iter().fold(BulkSummary::default(), |mut acc, r| {
        match r.status {
            CallStatus::Success => acc.success_count += 1,
            CallStatus::Error => acc.error_count += 1,
        }
        acc
    })
}

// In-memory game page. Holds the raw text the game would render and parses it the
// same way the live page is read.
use super::{
    ChangeBatch, ChangeMask, ObservedScope, PageAdapter, Subscription, SubscriptionHandle,
};
use shared::models::{ActionAffordance, AffordanceLabels, BalanceReading, EnergyReading};
use shared::utils::gauge_format;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

/// How the energy gauge renders its value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GaugeScale {
    Absolute,
    /// Gauge shows a percentage; readings are scaled to this capacity.
    Percent { capacity: i64 },
}

struct Subscriber {
    scope: ObservedScope,
    mask: ChangeMask,
    sender: mpsc::UnboundedSender<ChangeBatch>,
}

#[derive(Default)]
struct PageState {
    energy_text: Option<String>,
    balance_text: Option<String>,
    button_label: Option<String>,
    scope_present: bool,
    subscribers: HashMap<u64, Subscriber>,
    next_handle: u64,
    actions: u64,
}

pub struct MemoryPage {
    labels: AffordanceLabels,
    scale: GaugeScale,
    toggle_on_action: bool,
    state: Mutex<PageState>,
}

impl MemoryPage {
    pub fn new(labels: AffordanceLabels) -> Self {
        MemoryPage {
            labels,
            scale: GaugeScale::Absolute,
            toggle_on_action: false,
            state: Mutex::new(PageState { scope_present: true, ..Default::default() }),
        }
    }

    pub fn with_scale(mut self, scale: GaugeScale) -> Self {
        self.scale = scale;
        self
    }

    /// Makes `perform_action` flip the control label like the game does.
    pub fn simulating_game(mut self) -> Self {
        self.toggle_on_action = true;
        self
    }

    pub fn labels(&self) -> &AffordanceLabels {
        &self.labels
    }

    fn state(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_energy_text(&self, text: Option<&str>) {
        self.state().energy_text = text.map(str::to_string);
    }

    pub fn set_energy(&self, energy: EnergyReading) {
        self.set_energy_text(Some(&energy.to_string()));
    }

    pub fn set_balance_text(&self, text: Option<&str>) {
        self.state().balance_text = text.map(str::to_string);
    }

    pub fn set_balance(&self, balance: BalanceReading) {
        self.set_balance_text(Some(&balance.to_string()));
    }

    pub fn set_button_label(&self, label: Option<&str>) {
        self.state().button_label = label.map(str::to_string);
    }

    pub fn show_start(&self) {
        let label = self.labels.start.clone();
        self.set_button_label(Some(&label));
    }

    pub fn show_stop(&self) {
        let label = self.labels.stop.clone();
        self.set_button_label(Some(&label));
    }

    pub fn button_label(&self) -> Option<String> {
        self.state().button_label.clone()
    }

    /// Removes or restores the gauge element that subscriptions attach to.
    pub fn set_scope_present(&self, present: bool) {
        self.state().scope_present = present;
    }

    /// Delivers one notification to every subscriber whose mask accepts at least one
    /// of the mutations. Returns the number of subscribers notified.
    pub fn notify(&self, batch: &[super::MutationKind]) -> usize {
        let mut state = self.state();
        let mut delivered = 0;
        state.subscribers.retain(|handle, sub| {
            let filtered: ChangeBatch =
                batch.iter().copied().filter(|k| sub.mask.accepts(*k)).collect();
            if filtered.is_empty() {
                return true;
            }
            match sub.sender.send(filtered) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(_) => {
                    tracing::debug!(handle, scope = ?sub.scope, "Dropping closed subscriber");
                    false
                }
            }
        });
        delivered
    }

    /// Sets the gauge text and fires a character-data notification, as the game does
    /// when the number ticks.
    pub fn tick_energy(&self, energy: EnergyReading) -> usize {
        self.set_energy(energy);
        self.notify(&[super::MutationKind::CharacterData])
    }

    pub fn action_count(&self) -> u64 {
        self.state().actions
    }

    pub fn subscriber_count(&self) -> usize {
        self.state().subscribers.len()
    }
}

impl PageAdapter for MemoryPage {
    fn read_energy(&self) -> Option<EnergyReading> {
        let text = self.state().energy_text.clone()?;
        let parsed = match self.scale {
            GaugeScale::Absolute => gauge_format::parse_energy(&text),
            GaugeScale::Percent { capacity } => gauge_format::parse_percent(&text)
                .map(|pct| (pct * capacity as f64 / 100.0).round() as EnergyReading),
        };
        match parsed {
            Ok(energy) => Some(energy),
            Err(e) => {
                tracing::trace!(error = %e, "Energy gauge unreadable");
                None
            }
        }
    }

    fn read_balance(&self) -> Option<BalanceReading> {
        let text = self.state().balance_text.clone()?;
        gauge_format::parse_balance(&text).ok()
    }

    fn read_action_affordance(&self) -> Option<ActionAffordance> {
        let label = self.state().button_label.clone()?;
        Some(ActionAffordance::from_label(&label, &self.labels))
    }

    fn perform_action(&self) {
        let mut state = self.state();
        state.actions += 1;
        if !self.toggle_on_action {
            return;
        }
        let (start, stop) = (&self.labels.start, &self.labels.stop);
        let next = match state.button_label.as_deref() {
            Some(label) if label.contains(start.as_str()) => Some(stop.clone()),
            Some(label) if label.contains(stop.as_str()) => Some(start.clone()),
            _ => None,
        };
        if let Some(next) = next {
            tracing::debug!(label = %next, "Action control toggled");
            state.button_label = Some(next);
        }
    }

    fn subscribe(&self, scope: ObservedScope, mask: ChangeMask) -> Option<Subscription> {
        let mut state = self.state();
        if !state.scope_present {
            return None;
        }
        let (sender, batches) = mpsc::unbounded_channel();
        state.next_handle += 1;
        let handle = state.next_handle;
        state.subscribers.insert(handle, Subscriber { scope, mask, sender });
        Some(Subscription { handle: SubscriptionHandle(handle), batches })
    }

    fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.state().subscribers.remove(&handle.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::MutationKind;

    fn page() -> MemoryPage {
        MemoryPage::new(AffordanceLabels::default())
    }

    #[test]
    fn test_reads_parse_page_text() {
        let page = page();
        assert_eq!(page.read_energy(), None);
        page.set_energy_text(Some("8.500"));
        page.set_balance_text(Some("1,234.5"));
        page.show_start();
        assert_eq!(page.read_energy(), Some(8500));
        assert_eq!(page.read_balance(), Some(1234.5));
        assert!(page.read_action_affordance().unwrap().is_start);
    }

    #[test]
    fn test_unparsable_text_is_no_reading() {
        let page = page();
        page.set_energy_text(Some("loading…"));
        page.set_balance_text(Some("—"));
        assert_eq!(page.read_energy(), None);
        assert_eq!(page.read_balance(), None);
    }

    #[test]
    fn test_percent_gauge_is_scaled() {
        let page = page().with_scale(GaugeScale::Percent { capacity: 9000 });
        page.set_energy_text(Some("50%"));
        assert_eq!(page.read_energy(), Some(4500));
        page.set_energy_text(Some("99.99%"));
        assert_eq!(page.read_energy(), Some(8999));
    }

    #[test]
    fn test_perform_action_toggles_when_simulating() {
        let page = page().simulating_game();
        page.show_start();
        page.perform_action();
        assert_eq!(page.button_label().as_deref(), Some("Stop mining"));
        page.perform_action();
        assert_eq!(page.button_label().as_deref(), Some("Start mining"));
        assert_eq!(page.action_count(), 2);

        let plain = MemoryPage::new(AffordanceLabels::default());
        plain.show_start();
        plain.perform_action();
        assert_eq!(plain.button_label().as_deref(), Some("Start mining"));
    }

    #[tokio::test]
    async fn test_notify_filters_by_mask_and_unsubscribe() {
        let page = page();
        let mut sub = page.subscribe(ObservedScope::EnergyGauge, ChangeMask::GAUGE).unwrap();

        assert_eq!(page.notify(&[MutationKind::Attributes]), 0);
        assert_eq!(page.notify(&[MutationKind::Attributes, MutationKind::ChildList]), 1);
        assert_eq!(sub.batches.recv().await.unwrap(), vec![MutationKind::ChildList]);

        page.unsubscribe(sub.handle);
        assert_eq!(page.subscriber_count(), 0);
        assert_eq!(page.tick_energy(10), 0);
        assert!(sub.batches.recv().await.is_none());
    }

    #[test]
    fn test_subscribe_without_scope() {
        let page = page();
        page.set_scope_present(false);
        assert!(page.subscribe(ObservedScope::EnergyGauge, ChangeMask::GAUGE).is_none());
    }

    #[test]
    fn test_closed_subscriber_is_dropped() {
        let page = page();
        let sub = page.subscribe(ObservedScope::EnergyGauge, ChangeMask::GAUGE).unwrap();
        drop(sub);
        assert_eq!(page.tick_energy(5), 0);
        assert_eq!(page.subscriber_count(), 0);
    }
}

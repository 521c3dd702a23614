// Page adapter: everything the monitor knows about the game page goes through here.
pub mod memory;
pub mod replay;

use shared::models::{ActionAffordance, BalanceReading, EnergyReading};
use tokio::sync::mpsc;

/// Part of the page a subscription watches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObservedScope {
    EnergyGauge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    CharacterData,
    ChildList,
    Attributes,
}

/// Kinds of change a subscriber wants to hear about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeMask {
    pub character_data: bool,
    pub child_list: bool,
    pub attributes: bool,
    pub subtree: bool,
}

impl ChangeMask {
    /// Text and child changes anywhere under the gauge.
    pub const GAUGE: ChangeMask = ChangeMask {
        character_data: true,
        child_list: true,
        attributes: false,
        subtree: true,
    };

    pub fn accepts(&self, kind: MutationKind) -> bool {
        match kind {
            MutationKind::CharacterData => self.character_data,
            MutationKind::ChildList => self.child_list,
            MutationKind::Attributes => self.attributes,
        }
    }
}

/// All mutations delivered by a single notification.
pub type ChangeBatch = Vec<MutationKind>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub batches: mpsc::UnboundedReceiver<ChangeBatch>,
}

/// Access to the game page. Reads return `None` when the element is missing or its
/// text does not parse; callers treat both the same way.
pub trait PageAdapter: Send + Sync {
    /// Energy in absolute units. Percentage gauges are scaled by the adapter.
    fn read_energy(&self) -> Option<EnergyReading>;
    fn read_balance(&self) -> Option<BalanceReading>;
    fn read_action_affordance(&self) -> Option<ActionAffordance>;
    fn perform_action(&self);
    /// `None` when the scope element is not on the page.
    fn subscribe(&self, scope: ObservedScope, mask: ChangeMask) -> Option<Subscription>;
    fn unsubscribe(&self, handle: SubscriptionHandle);
}

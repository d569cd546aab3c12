//! Online/offline state machine fed by host connectivity events

/// Host network reachability
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Connectivity {
    Online,
    Offline,
}

/// Tracks connectivity and view visibility.
///
/// Transitions report whether the state actually changed so the engine only
/// reacts to edges, not repeated signals.
#[derive(Clone, Copy, Debug)]
pub struct ConnectivityMonitor {
    state: Connectivity,
    visible: bool,
}

impl ConnectivityMonitor {
    /// Start from the host's current view of connectivity
    #[must_use]
    pub const fn new(initially_online: bool) -> Self {
        Self {
            state: if initially_online {
                Connectivity::Online
            } else {
                Connectivity::Offline
            },
            visible: true,
        }
    }

    /// Returns `true` on an offline → online edge
    pub fn went_online(&mut self) -> bool {
        let changed = self.state == Connectivity::Offline;
        self.state = Connectivity::Online;
        changed
    }

    /// Returns `true` on an online → offline edge
    pub fn went_offline(&mut self) -> bool {
        let changed = self.state == Connectivity::Online;
        self.state = Connectivity::Offline;
        changed
    }

    /// Record view visibility; returns `true` if it changed
    pub fn set_visible(&mut self, visible: bool) -> bool {
        let changed = self.visible != visible;
        self.visible = visible;
        changed
    }

    #[must_use]
    pub const fn state(&self) -> Connectivity {
        self.state
    }

    #[must_use]
    pub const fn is_online(&self) -> bool {
        matches!(self.state, Connectivity::Online)
    }

    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }
}

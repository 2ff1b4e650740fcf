//! WorkspaceManager: focus ring plus the toggleable chrome around the panes.
//!
//! The layout itself is fixed (globe on the left, sidebar on the right,
//! player bar at the bottom); what varies is which pane has focus and which
//! optional panels are shown.

use crate::action::ComponentId;
use crate::focus::FocusRing;

pub struct WorkspaceManager {
    pub show_log_panel: bool,
    pub show_help: bool,
    /// Footer keybindings bar.
    pub show_keys_bar: bool,
    pub focus: FocusRing,
}

impl WorkspaceManager {
    pub fn new() -> Self {
        Self {
            show_log_panel: false,
            show_help: false,
            show_keys_bar: true,
            focus: FocusRing::new(vec![ComponentId::Globe, ComponentId::StationList]),
        }
    }

    pub fn focused(&self) -> Option<ComponentId> {
        self.focus.current()
    }

    pub fn focus_next(&mut self) -> Option<ComponentId> {
        self.focus.next()
    }

    pub fn focus_prev(&mut self) -> Option<ComponentId> {
        self.focus.prev()
    }

    pub fn focus_set(&mut self, id: ComponentId) {
        self.focus.set(id);
    }

    /// Show or hide the expanded log panel; it is focusable only while shown.
    pub fn toggle_log_panel(&mut self) -> bool {
        self.show_log_panel = !self.show_log_panel;
        let mut items = vec![ComponentId::Globe, ComponentId::StationList];
        if self.show_log_panel {
            items.push(ComponentId::LogPanel);
        }
        self.focus.set_items(items);
        self.show_log_panel
    }

    /// Focus the Nth pane (0-indexed). Returns the focused id.
    pub fn focus_nth(&mut self, n: usize) -> Option<ComponentId> {
        self.focus.set_by_position(n)
    }
}

impl Default for WorkspaceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_panel_joins_focus_ring_only_while_shown() {
        let mut wm = WorkspaceManager::new();
        wm.focus_set(ComponentId::LogPanel);
        assert_eq!(wm.focused(), Some(ComponentId::Globe));

        assert!(wm.toggle_log_panel());
        wm.focus_set(ComponentId::LogPanel);
        assert_eq!(wm.focused(), Some(ComponentId::LogPanel));

        assert!(!wm.toggle_log_panel());
        assert_eq!(wm.focused(), Some(ComponentId::Globe));
    }
}

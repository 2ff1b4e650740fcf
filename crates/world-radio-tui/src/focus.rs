//! FocusRing: manages keyboard focus cycling between components.

use crate::action::ComponentId;

pub struct FocusRing {
    items: Vec<ComponentId>,
    current: usize,
}

impl FocusRing {
    pub fn new(items: Vec<ComponentId>) -> Self {
        Self { items, current: 0 }
    }

    pub fn current(&self) -> Option<ComponentId> {
        self.items.get(self.current).copied()
    }

    pub fn next(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = (self.current + 1) % self.items.len();
        self.current()
    }

    pub fn prev(&mut self) -> Option<ComponentId> {
        if self.items.is_empty() {
            return None;
        }
        self.current = if self.current == 0 {
            self.items.len() - 1
        } else {
            self.current - 1
        };
        self.current()
    }

    pub fn set(&mut self, id: ComponentId) {
        if let Some(pos) = self.items.iter().position(|&x| x == id) {
            self.current = pos;
        }
    }

    /// Replace the ring, keeping focus on the same id when it survives.
    pub fn set_items(&mut self, items: Vec<ComponentId>) {
        let keep = self.current();
        self.items = items;
        self.current = keep
            .and_then(|id| self.items.iter().position(|&x| x == id))
            .unwrap_or(0);
    }

    pub fn is_focused(&self, id: ComponentId) -> bool {
        self.current() == Some(id)
    }

    /// Focus the Nth item in the ring (0-indexed). No-op if out of bounds.
    pub fn set_by_position(&mut self, pos: usize) -> Option<ComponentId> {
        if pos < self.items.len() {
            self.current = pos;
            self.current()
        } else {
            None
        }
    }
}

impl Default for FocusRing {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cycles_both_ways() {
        let mut ring = FocusRing::new(vec![ComponentId::Globe, ComponentId::StationList]);
        assert_eq!(ring.current(), Some(ComponentId::Globe));
        assert_eq!(ring.next(), Some(ComponentId::StationList));
        assert_eq!(ring.next(), Some(ComponentId::Globe));
        assert_eq!(ring.prev(), Some(ComponentId::StationList));
    }

    #[test]
    fn set_ignores_unknown_ids() {
        let mut ring = FocusRing::new(vec![ComponentId::Globe, ComponentId::StationList]);
        ring.set(ComponentId::LogPanel);
        assert!(ring.is_focused(ComponentId::Globe));
        assert_eq!(ring.set_by_position(5), None);
        assert_eq!(ring.set_by_position(1), Some(ComponentId::StationList));
    }
}

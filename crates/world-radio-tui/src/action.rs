//! Action enum: all user-initiated intents and internal events.

/// Unique identifier for a focusable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentId {
    Globe,
    StationList,
    LogPanel,
    HelpOverlay,
}

/// All actions that can flow through the system.
/// Components produce Actions; the App dispatches them.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Selection ────────────────────────────────────────────────────────────
    /// Explore a country: (code, name).
    SelectCountry(String, String),
    /// Country under the globe reticle changed.
    Hover(Option<String>),

    // ── Playback ─────────────────────────────────────────────────────────────
    /// Select the station at this index of the current listing.
    PlayStation(usize),
    TogglePlay,
    /// Relative volume change.
    Volume(f32),
    Mute,

    // ── Navigation ───────────────────────────────────────────────────────────
    FocusNext,
    FocusPrev,
    FocusPane(ComponentId),

    // ── Filter/search ────────────────────────────────────────────────────────
    OpenFilter,
    CloseFilter,

    // ── UI toggles ───────────────────────────────────────────────────────────
    ToggleLogs,
    ToggleHelp,
    ToggleKeys,
    CopyToClipboard(String),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
    Resize(u16, u16),
}

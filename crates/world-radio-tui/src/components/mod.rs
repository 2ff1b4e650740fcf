pub mod country_panel;
pub mod globe;
pub mod help_overlay;
pub mod log_panel;
pub mod player_bar;
pub mod station_list;

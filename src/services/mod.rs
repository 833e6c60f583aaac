/// Game loading and consistency checks.
pub mod game_service;
/// Background tasks observing the media player.
pub mod playback_service;
/// Score and per-player aggregates over the event log.
pub mod scoring;
/// Viewer actor and its public handle.
pub mod viewer;

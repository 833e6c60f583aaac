/// Edit and delete gates supplied by the embedding application.
pub mod access;
/// Candidate stat editing state machine.
pub mod editor;
/// Ordered log of committed stats.
pub mod event_log;
/// Game model and stat kinds.
pub mod game;
/// Broadcast hub for viewer observers.
pub mod hub;
/// Observed media player state.
pub mod playback;
/// Rosters and the participant to side mapping.
pub mod roster;

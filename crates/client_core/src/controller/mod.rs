//! Controller layer: list/form/delete state transitions and the orchestrator
//! that drives them against a [`crate::RequestApi`].

pub mod delete;
pub mod events;
pub mod form;
pub mod list_state;
pub mod orchestration;

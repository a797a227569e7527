//! Core time handling for the simulation.

pub mod calendar;

//! Relational store entities.

pub mod recent_change;
pub mod vacation;

//! Simulated indoor service robot: a hidden-Markov belief filter over a
//! grid map, a STRIPS-style forward planner over symbolic world states,
//! and an executor that grounds plans into noisy unit motions.

pub mod algorithms;
pub mod config;
pub mod engine;
pub mod experiments;
pub mod localization;
pub mod logging;
pub mod planning;
pub mod robot;

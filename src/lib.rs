//! Traffic Dispatch Library
//!
//! Congestion-aware route planning and a discrete-tick traffic simulation
//! with signaled intersections and ride dispatch.

pub mod simulation;

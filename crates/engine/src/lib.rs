//! Attribution engine: conversion recording, first-touch weighting and
//! journey aggregation over pluggable stores.

pub mod journey;
pub mod locks;
pub mod memory;
pub mod recorder;
pub mod resolver;
pub mod service;

pub use journey::JourneyAggregator;
pub use memory::MemoryStore;
pub use recorder::{ConversionRecorder, RecorderConfig};
pub use resolver::TouchResolver;
pub use service::{AttributionEngine, EngineConfig, RecordedTrack};

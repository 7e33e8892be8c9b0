pub mod claim;
pub mod contract;
pub mod dataset;
pub mod member;
pub mod metrics;
pub mod quality_measure;
pub mod validation;
pub mod workflow;

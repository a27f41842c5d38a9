//! Infrastructure layer - Router implementation and ambient services

pub mod evaluation;
pub mod experiment;
pub mod logging;
pub mod services;

//! Infrastructure services

mod experiment_router;

pub use experiment_router::ExperimentRouter;

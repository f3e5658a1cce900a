mod correlation;
mod data;
mod driver_configuration;
mod error;
pub mod feature;
pub mod pattern;
mod pipeline;
mod request_driver;
pub mod sandbox;
mod scenario_context;
pub mod steps;
mod util;

pub use correlation::{CorrelationId, IdGenerator, UuidGenerator};
pub use data::CapturedResponse;
pub use driver_configuration::{DriverConfiguration, DEFAULT_CORRELATION_HEADER};
pub use error::{BoxError, Error, Phase, Store, StoreFailure, Subject};
pub use feature::{Feature, FeatureReport, Runner, ScenarioOutcome, ScenarioResult};
pub use pipeline::{DispatchPipeline, RemotePipeline, ServicePipeline};
pub use request_driver::RequestDriver;
pub use sandbox::{
    memory::{InMemoryReadStore, InMemoryWriteStore, MemoryStoreError},
    ReadModelTransactions, Sandbox, WriteModelTransactions,
};
pub use scenario_context::{ScenarioContext, ScenarioContextBuilder};
pub use stepwise_codegen::scenario_test;

pub mod cancel;
pub mod capability;
pub mod classify;
pub mod dispatch;
pub mod engine;
pub mod orchestrator;
pub mod registry;

pub use cancel::CancelFlag;
pub use capability::{
    ExtractProvider, Extraction, LoadProvider, TableStream, TransformStep, WriteMode,
};
pub use classify::{ErrorScope, classify};
pub use dispatch::{ExtractDispatcher, LoadDispatcher};
pub use engine::{EngineOutcome, TransformEngine};
pub use orchestrator::{Orchestrator, Stage};
pub use registry::{
    BuiltinFactory, ProviderRegistry, RegistryError, ResolvedStep, ScriptResolver,
    TransformRegistry,
};

pub mod catalog;
pub mod registry;
pub mod types;

pub use registry::{NoopRuntimeConfigStore, RuntimeConfigStore, TopicRegistry};
pub use types::{
    ParameterDef, ParameterSource, PromptRole, RuntimeConfig, Topic, TopicCategory, TopicFilter,
    TopicType,
};

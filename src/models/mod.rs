//! Model definitions and their persistence.

pub mod store;
pub mod types;

pub use store::{FileMeta, JsonModelStore, ModelStore, ModelsFile, read_models_file};
pub use types::{
    Capability, EnvBinding, LANGCHAIN, LLAMA_INDEX, ModelArg, ModelDocument, ModelRecord,
};

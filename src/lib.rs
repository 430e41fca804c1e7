//! Custom character model support: a bundle catalog on disk, a cooperative
//! refresh pipeline, model attachment with a prop registry, and per-tick
//! relays that mirror host character state onto the custom rig.

pub mod attachment;
pub mod bundle;
pub mod catalog;
pub mod character;
pub mod plugin;
pub mod relays;
pub mod rig;
pub mod settings;

pub use attachment::{ModelHandler, ModelSwapRequest};
pub use bundle::BundleCache;
pub use catalog::refresh::ModelRefresh;
pub use catalog::{ModelCatalog, ModelDirectory};
pub use plugin::{CustomModelsEnabled, ModelPipeline, ReskinPlugin};

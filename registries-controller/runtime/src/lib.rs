#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod args;
mod snapshot;

pub use self::{args::Args, snapshot::Snapshot};
pub use registries_controller_core as core;
pub use registries_controller_k8s_api as k8s;

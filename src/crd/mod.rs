//! Typed model of the chaos-mesh.org/v1alpha1 resources

#[macro_use]
mod macros;

mod aws;
mod azure;
mod block;
mod cloudstack;
pub mod common;
mod dns;
mod embed;
mod gcp;
mod http;
mod io;
mod jvm;
mod k8s;
mod kernel;
mod network;
mod physical_machine;
mod pod;
mod schedule;
pub mod selector;
mod status_check;
mod stress;
mod time;
mod workflow;
mod yc;

pub use aws::*;
pub use azure::*;
pub use block::*;
pub use cloudstack::*;
pub use common::*;
pub use dns::*;
pub use embed::*;
pub use gcp::*;
pub use http::*;
pub use io::*;
pub use jvm::*;
pub use k8s::*;
pub use kernel::*;
pub use network::*;
pub use physical_machine::*;
pub use pod::*;
pub use schedule::*;
pub use selector::*;
pub use status_check::*;
pub use stress::*;
pub use time::*;
pub use workflow::*;
pub use yc::*;

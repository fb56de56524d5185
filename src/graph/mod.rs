// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

pub mod connector;
pub mod io;
pub mod port;
pub mod resource;

pub use connector::Connector;
pub use io::{Inputs, Outputs};
pub use port::{InputPort, OutputPort, PortAddr, PortSpec};
pub use resource::{Resource, ResourceRef, ResourceType, ANY_TYPE};

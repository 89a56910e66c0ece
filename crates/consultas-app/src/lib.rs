// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod catalog;
pub mod console;
pub mod form;
pub mod ids;
pub mod model;
pub mod pager;
pub mod session;

pub use catalog::*;
pub use console::*;
pub use form::*;
pub use ids::*;
pub use model::*;
pub use pager::*;
pub use session::*;

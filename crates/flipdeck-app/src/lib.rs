// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod fields;
pub mod format;
pub mod model;
pub mod session;
pub mod state;
pub mod store;
pub mod view;

pub use fields::*;
pub use format::*;
pub use model::*;
pub use session::*;
pub use state::*;
pub use store::*;
pub use view::*;

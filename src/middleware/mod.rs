// SPDX-License-Identifier: MIT

//! HTTP middleware.

pub mod security;
pub mod session;

pub use session::SessionUser;

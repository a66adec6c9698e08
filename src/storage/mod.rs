// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod user_store;

// Re-export main types for convenience
pub use user_store::{NewUser, SqliteUserStore, StoreError, User, UserChanges, UserStore};

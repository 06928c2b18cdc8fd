// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Local persistence of the current session.

pub mod credential;
pub mod storage;

pub use credential::{CredentialStore, ACCESS_TOKEN_KEY, USER_KEY};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};

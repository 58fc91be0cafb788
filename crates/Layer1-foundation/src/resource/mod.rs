//! Resource - 프로세스 전역 공유 클라이언트
//!
//! Expensive external clients (the generative backend, the translator, the
//! literature search client) are built on first use and then shared by
//! every request. See [`LazyResource`].

mod lazy;

pub use lazy::{InitFuture, LazyResource, ResourceInitError, ResourceStatus};

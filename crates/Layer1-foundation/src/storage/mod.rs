//! Storage module for MediMind
//!
//! - `json`: JSON - 설정 파일 저장/로드 및 병합

mod json;

pub use json::{merge_json, JsonStore, GLOBAL_DIR_NAME, PROJECT_DIR_NAME};

mod store;

pub use store::{merge_json, JsonStore, GLOBAL_DIR_NAME, PROJECT_DIR_NAME};

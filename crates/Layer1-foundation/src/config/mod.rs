//! Config - 통합 설정 관리
//!
//! - `medimind.rs` - MediMindConfig 통합 설정 (cache, memory, delegates)

mod medimind;

pub use medimind::{
    GeneratorConfig, LiteratureConfig, MediMindConfig, TranslatorConfig, MEDIMIND_CONFIG_FILE,
};

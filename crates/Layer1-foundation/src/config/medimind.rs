//! MediMind Config - 통합 설정
//!
//! 글로벌(`<config_dir>/medimind/config.json`)과 프로젝트(`./.medimind/config.json`)
//! 설정을 키 단위로 병합하며, 프로젝트 설정이 우선합니다.

use crate::cache::CacheConfig;
use crate::memory::ReclaimConfig;
use crate::storage::{merge_json, JsonStore};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// 설정 파일명
pub const MEDIMIND_CONFIG_FILE: &str = "config.json";

// ============================================================================
// MediMind Config (통합)
// ============================================================================

/// MediMind 통합 설정
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediMindConfig {
    /// 결과 캐시
    #[serde(default)]
    pub cache: CacheConfig,

    /// 메모리 회수 / 청크 처리
    #[serde(default)]
    pub memory: ReclaimConfig,

    /// 요약/질의응답 백엔드
    #[serde(default)]
    pub generator: GeneratorConfig,

    /// 번역기
    #[serde(default)]
    pub translator: TranslatorConfig,

    /// 문헌 검색
    #[serde(default)]
    pub literature: LiteratureConfig,
}

impl MediMindConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let global = JsonStore::global().ok();
        let project = JsonStore::current_project()?;
        Self::load_from(global.as_ref(), &project)
    }

    /// Load from explicit stores (project overrides global, key by key)
    pub fn load_from(global: Option<&JsonStore>, project: &JsonStore) -> Result<Self> {
        let mut merged = serde_json::to_value(Self::default())?;

        // 1. 글로벌 설정
        if let Some(global) = global {
            if let Some(value) = global.load_value_optional(MEDIMIND_CONFIG_FILE)? {
                debug!(dir = %global.base_dir().display(), "applying global config");
                merge_json(&mut merged, value);
            }
        }

        // 2. 프로젝트 설정
        if let Some(value) = project.load_value_optional(MEDIMIND_CONFIG_FILE)? {
            debug!(dir = %project.base_dir().display(), "applying project config");
            merge_json(&mut merged, value);
        }

        let config: Self = serde_json::from_value(merged)
            .map_err(|e| Error::Config(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// 글로벌 설정 저장
    pub fn save_global(&self) -> Result<()> {
        JsonStore::global()?.save(MEDIMIND_CONFIG_FILE, self)
    }

    /// 프로젝트 설정 저장
    pub fn save_project(&self) -> Result<()> {
        JsonStore::current_project()?.save(MEDIMIND_CONFIG_FILE, self)
    }

    /// 설정 값 검증
    pub fn validate(&self) -> Result<()> {
        if self.memory.chunk_size > self.translator.max_request_chars {
            return Err(Error::config(format!(
                "memory.chunkSize ({}) exceeds translator.maxRequestChars ({})",
                self.memory.chunk_size, self.translator.max_request_chars
            )));
        }
        if self.literature.default_max_results == 0 {
            return Err(Error::config("literature.defaultMaxResults must be at least 1"));
        }
        Ok(())
    }

    // ========================================================================
    // Presets
    // ========================================================================

    /// 리소스 제한 환경용
    pub fn minimal() -> Self {
        Self {
            cache: CacheConfig::minimal(),
            memory: ReclaimConfig {
                threshold_bytes: 256 * 1024,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// 적극적 캐싱
    pub fn performance() -> Self {
        Self {
            cache: CacheConfig::performance(),
            memory: ReclaimConfig {
                threshold_bytes: 8 * 1024 * 1024,
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

// ============================================================================
// Generator Config
// ============================================================================

/// 생성형 백엔드 (Gemini) 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorConfig {
    #[serde(default = "default_generator_model")]
    pub model: String,

    /// API 키를 읽을 환경 변수
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_generator_base_url")]
    pub base_url: String,

    #[serde(default = "default_generator_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: default_generator_model(),
            api_key_env: default_api_key_env(),
            base_url: default_generator_base_url(),
            timeout_secs: default_generator_timeout_secs(),
            max_output_tokens: None,
        }
    }
}

impl GeneratorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key from the configured environment variable
    pub fn api_key(&self) -> Result<String> {
        match std::env::var(&self.api_key_env) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(Error::Config(format!(
                "Environment variable {} is not set",
                self.api_key_env
            ))),
        }
    }
}

// ============================================================================
// Translator Config
// ============================================================================

/// 번역기 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatorConfig {
    #[serde(default = "default_translator_base_url")]
    pub base_url: String,

    /// 원문 언어 (`auto` = 자동 감지)
    #[serde(default = "default_source_language")]
    pub source_language: String,

    /// 요청당 최대 글자 수
    #[serde(default = "default_max_request_chars")]
    pub max_request_chars: usize,

    #[serde(default = "default_translator_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            base_url: default_translator_base_url(),
            source_language: default_source_language(),
            max_request_chars: default_max_request_chars(),
            timeout_secs: default_translator_timeout_secs(),
        }
    }
}

impl TranslatorConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ============================================================================
// Literature Config
// ============================================================================

/// 문헌 검색 (PubMed E-utilities) 설정
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteratureConfig {
    #[serde(default = "default_literature_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_results")]
    pub default_max_results: usize,

    #[serde(default = "default_literature_timeout_secs")]
    pub timeout_secs: u64,

    /// NCBI API 키 환경 변수 (선택)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,
}

impl Default for LiteratureConfig {
    fn default() -> Self {
        Self {
            base_url: default_literature_base_url(),
            default_max_results: default_max_results(),
            timeout_secs: default_literature_timeout_secs(),
            api_key_env: None,
        }
    }
}

impl LiteratureConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// NCBI API key, if one is configured and set
    pub fn api_key(&self) -> Option<String> {
        self.api_key_env
            .as_deref()
            .and_then(|name| std::env::var(name).ok())
            .filter(|key| !key.trim().is_empty())
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_generator_model() -> String {
    "gemini-2.0-flash".to_string()
}
fn default_api_key_env() -> String {
    "GEMINI_KEY".to_string()
}
fn default_generator_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}
fn default_generator_timeout_secs() -> u64 {
    60
}
fn default_translator_base_url() -> String {
    "https://translate.googleapis.com/translate_a/single".to_string()
}
fn default_source_language() -> String {
    "auto".to_string()
}
fn default_max_request_chars() -> usize {
    5000
}
fn default_translator_timeout_secs() -> u64 {
    15
}
fn default_literature_base_url() -> String {
    "https://eutils.ncbi.nlm.nih.gov/entrez/eutils".to_string()
}
fn default_max_results() -> usize {
    5
}
fn default_literature_timeout_secs() -> u64 {
    10
}

//! # medimind-assistant
//!
//! 의료 리포트 어시스턴트 - 캐시, 지연 초기화, 성능 측정이 적용된
//! 추출 / 요약 / 질의응답 / 번역 / 문헌 검색 작업입니다.
//!
//! ## 핵심 컴포넌트
//!
//! - **ReportAssistant**: 모든 작업의 진입점 (`PerfContext` 위에서 실행)
//! - **AssistantResources**: 생성기, 번역기, 문헌 검색 클라이언트의 공유 핸들
//! - **Document**: 업로드된 원본 바이트와 콘텐츠 해시
//!
//! ## 사용 예
//!
//! ```ignore
//! use medimind_assistant::{Document, ReportAssistant};
//! use medimind_foundation::MediMindConfig;
//!
//! let config = MediMindConfig::load()?;
//! let assistant = ReportAssistant::from_config(&config);
//!
//! let doc = Document::from_path("report.txt").await?;
//! let summary = assistant.summarize(&doc, "hi").await?;
//! let answer = assistant.answer(&doc, "Is the HbA1c in range?").await?;
//! let articles = assistant.search("metformin", 5).await?;
//! ```

pub mod assistant;
pub mod document;
pub mod error;
pub mod output;
pub mod resources;

pub use assistant::{language_code, AssistantStats, ReportAssistant};
pub use document::Document;
pub use error::{AssistantError, Result};
pub use output::CachedOutput;
pub use resources::{kinds, AssistantResources, ResourceReport};

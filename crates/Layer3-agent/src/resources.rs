//! Shared delegate handles
//!
//! The document parser is cheap and built eagerly. The generator, translator
//! and literature clients are [`LazyResource`]s: built on the first request
//! that needs them and then shared for the rest of the process.

use medimind_foundation::{LazyResource, MediMindConfig, ResourceStatus};
use medimind_provider::{
    DocumentParser, GeminiClient, Generator, GoogleTranslator, LiteratureSearch, PubMedClient,
    TextDocumentParser, Translator,
};
use serde::Serialize;
use std::sync::Arc;

/// Resource kind labels
pub mod kinds {
    pub const GENERATOR: &str = "generator";
    pub const TRANSLATOR: &str = "translator";
    pub const LITERATURE: &str = "literature";
}

/// Status of one lazy resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceReport {
    pub kind: String,
    pub status: ResourceStatus,
    pub attempts: u64,
}

/// Delegates used by the assistant
pub struct AssistantResources {
    pub parser: Arc<dyn DocumentParser>,
    pub generator: LazyResource<dyn Generator>,
    pub translator: LazyResource<dyn Translator>,
    pub literature: LazyResource<dyn LiteratureSearch>,
}

impl AssistantResources {
    pub fn new(
        parser: Arc<dyn DocumentParser>,
        generator: LazyResource<dyn Generator>,
        translator: LazyResource<dyn Translator>,
        literature: LazyResource<dyn LiteratureSearch>,
    ) -> Self {
        Self {
            parser,
            generator,
            translator,
            literature,
        }
    }

    /// Concrete delegates built from configuration
    ///
    /// Nothing touches the network or the environment until a resource is
    /// first acquired; a missing API key surfaces then as a
    /// `ResourceInitError`.
    pub fn from_config(config: &MediMindConfig) -> Self {
        let generator_config = config.generator.clone();
        let generator = LazyResource::new(kinds::GENERATOR, move || {
            let config = generator_config.clone();
            async move {
                let client = GeminiClient::from_config(&config)?;
                anyhow::Ok(Arc::new(client) as Arc<dyn Generator>)
            }
        });

        let translator_config = config.translator.clone();
        let translator = LazyResource::new(kinds::TRANSLATOR, move || {
            let config = translator_config.clone();
            async move {
                let client = GoogleTranslator::from_config(&config)?;
                anyhow::Ok(Arc::new(client) as Arc<dyn Translator>)
            }
        });

        let literature_config = config.literature.clone();
        let literature = LazyResource::new(kinds::LITERATURE, move || {
            let config = literature_config.clone();
            async move {
                let client = PubMedClient::from_config(&config)?;
                anyhow::Ok(Arc::new(client) as Arc<dyn LiteratureSearch>)
            }
        });

        Self::new(
            Arc::new(TextDocumentParser::new()),
            generator,
            translator,
            literature,
        )
    }

    /// Status of every lazy resource
    pub fn reports(&self) -> Vec<ResourceReport> {
        vec![
            report(&self.generator),
            report(&self.translator),
            report(&self.literature),
        ]
    }
}

fn report<T: ?Sized + Send + Sync + 'static>(resource: &LazyResource<T>) -> ResourceReport {
    ResourceReport {
        kind: resource.kind().to_string(),
        status: resource.status(),
        attempts: resource.attempts(),
    }
}

impl std::fmt::Debug for AssistantResources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantResources")
            .field("generator", &self.generator)
            .field("translator", &self.translator)
            .field("literature", &self.literature)
            .finish_non_exhaustive()
    }
}

use std::sync::Arc;

use tracing::info;

use crate::app::credentials::{CredentialResolver, GENERATIVE_API_KEY};
use crate::domain::note::{extract_procedure_type, extract_tags};
use crate::domain::{AppError, GenerationKind, GenerativeProviderConfig, NoteDraft};
use crate::ports::transport::{GenerateRequest, GenerationConfig, Part, Transport};

/// Instruction template the transcript is wrapped in. The named
/// sections line up with the extraction heuristics in `domain::note`.
const NOTE_INSTRUCTION: &str = "You are a clinical documentation assistant. \
Rewrite the dictated transcript below into a structured markdown note with \
these sections:\n\n\
## Procedure\n## Findings\n## Assessment\n## Plan\n\n\
Finish with a line starting with `Tags:` listing up to five short lowercase \
tags. Use only information present in the transcript.\n\n\
Transcript:\n";

/// Compiles a raw transcript into a structured note draft via the
/// generative provider, then extracts the procedure type and tags with
/// the ordered heuristics.
pub struct NoteCompiler {
    transport: Arc<dyn Transport>,
    credentials: Arc<CredentialResolver>,
    generative: GenerativeProviderConfig,
}

impl NoteCompiler {
    pub fn new(
        transport: Arc<dyn Transport>,
        credentials: Arc<CredentialResolver>,
        generative: GenerativeProviderConfig,
    ) -> Self {
        Self {
            transport,
            credentials,
            generative,
        }
    }

    pub async fn compile(&self, transcript: &str) -> Result<NoteDraft, AppError> {
        let key = self.credentials.resolve(GENERATIVE_API_KEY)?;

        let request = GenerateRequest {
            model: self.generative.model.clone(),
            parts: vec![Part::Text {
                text: format!("{}{}", NOTE_INSTRUCTION, transcript),
            }],
            generation_config: Some(GenerationConfig {
                temperature: Some(0.2),
                max_output_tokens: Some(2048),
            }),
            api_key: key.expose().to_string(),
        };

        let response = self
            .transport
            .generate_content(request)
            .await
            .map_err(classify_generation)?;

        let content = response
            .first_text()
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| AppError::Generation {
                kind: GenerationKind::Other,
                message: "provider returned no content".to_string(),
            })?;

        let procedure_type = extract_procedure_type(&content);
        let tags = extract_tags(&content);

        info!(
            chars = content.len(),
            procedure = ?procedure_type,
            tags = tags.len(),
            "note compiled"
        );

        Ok(NoteDraft {
            content,
            procedure_type,
            tags,
            transcript: transcript.to_string(),
        })
    }
}

/// Classify a provider failure for caller-facing messaging: 403 is a
/// credential problem, 429 a rate limit, anything else generic.
fn classify_generation(err: AppError) -> AppError {
    match err {
        AppError::Provider {
            status, message, ..
        } => {
            let kind = match status {
                Some(403) => GenerationKind::Credential,
                Some(429) => GenerationKind::RateLimit,
                _ => GenerationKind::Other,
            };
            AppError::Generation { kind, message }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashMap;

    use crate::adapters::credentials::BundledConfigSource;
    use crate::adapters::direct_transport::DirectTransport;
    use crate::domain::Platform;

    const GEMINI_ROUTE: &str = "/models/gemini-1.5-flash:generateContent";

    fn compiler_for(server: &mockito::ServerGuard, with_key: bool) -> NoteCompiler {
        let mut values = HashMap::new();
        if with_key {
            values.insert(GENERATIVE_API_KEY.to_string(), "g-test".to_string());
        }
        let credentials = Arc::new(CredentialResolver::with_sources(
            Platform::Native,
            vec![Box::new(BundledConfigSource::new(values))],
            None,
        ));
        let transport = Arc::new(DirectTransport::new(&server.url(), &server.url()).unwrap());
        NoteCompiler::new(transport, credentials, GenerativeProviderConfig::default())
    }

    fn note_body(content: &str) -> String {
        serde_json::json!({
            "candidates": [{"content": {"parts": [{"text": content}]}}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_compile_extracts_fields() {
        let content = "## Procedure\nProcedure: Colonoscopy\n\n## Findings\nNo polyps.\n\n\
                       ## Assessment\nNormal exam.\n\n## Plan\nRoutine follow-up.\n\n\
                       Tags: colonoscopy, screening, routine";

        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GEMINI_ROUTE)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(note_body(content))
            .create_async()
            .await;

        let compiler = compiler_for(&server, true);
        let draft = compiler.compile("dictated colonoscopy report").await.unwrap();

        assert_eq!(draft.procedure_type.as_deref(), Some("Colonoscopy"));
        assert_eq!(draft.tags, vec!["colonoscopy", "screening", "routine"]);
        assert_eq!(draft.transcript, "dictated colonoscopy report");
        assert!(draft.content.contains("## Plan"));
    }

    #[tokio::test]
    async fn test_diagnosis_label_extraction() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GEMINI_ROUTE)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(note_body("Diagnosis: Acute appendicitis.\nPlan: refer to surgery."))
            .create_async()
            .await;

        let compiler = compiler_for(&server, true);
        let draft = compiler.compile("abdominal pain dictation").await.unwrap();

        assert_eq!(draft.procedure_type.as_deref(), Some("Acute appendicitis"));
    }

    #[tokio::test]
    async fn test_403_classified_as_credential_problem() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GEMINI_ROUTE)
            .with_status(403)
            .with_body("API key invalid")
            .create_async()
            .await;

        let compiler = compiler_for(&server, true);
        let err = compiler.compile("anything").await.unwrap_err();

        match err {
            AppError::Generation { kind, message } => {
                assert_eq!(kind, GenerationKind::Credential);
                assert!(message.contains("API key invalid"));
            }
            other => panic!("expected generation error, got {:?}", other.to_string()),
        }
    }

    #[tokio::test]
    async fn test_429_classified_as_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GEMINI_ROUTE)
            .with_status(429)
            .with_body("quota exceeded")
            .create_async()
            .await;

        let compiler = compiler_for(&server, true);
        let err = compiler.compile("anything").await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Generation {
                kind: GenerationKind::RateLimit,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_other_statuses_are_generic_failures() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", GEMINI_ROUTE)
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let compiler = compiler_for(&server, true);
        let err = compiler.compile("anything").await.unwrap_err();

        assert!(matches!(
            err,
            AppError::Generation {
                kind: GenerationKind::Other,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_credential_is_config_error() {
        let server = mockito::Server::new_async().await;
        let compiler = compiler_for(&server, false);

        let err = compiler.compile("anything").await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}

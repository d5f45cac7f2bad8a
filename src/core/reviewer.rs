use anyhow::{Context, Result};
use futures_util::StreamExt;
use std::io::Write;
use tracing::info;

use crate::adapters::llm::StreamingGenerator;
use crate::core::explorer::CodeExplorer;
use crate::core::prompt::PromptFactory;

/// Returned instead of a review when the explorer found no code.
pub const NOTHING_TO_REVIEW: &str = "No code to review.";

pub struct Reviewer {
    explorer: Box<dyn CodeExplorer>,
    generator: Box<dyn StreamingGenerator>,
    system_prompt: String,
}

impl Reviewer {
    pub fn new(explorer: Box<dyn CodeExplorer>, generator: Box<dyn StreamingGenerator>) -> Self {
        Self {
            explorer,
            generator,
            system_prompt: PromptFactory::general_review_prompt().to_string(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    /// Streams the review to stdout and returns the full text.
    pub async fn review(&self) -> Result<String> {
        let mut stdout = std::io::stdout();
        self.review_to(&mut stdout).await
    }

    pub async fn review_to<W: Write>(&self, out: &mut W) -> Result<String> {
        let code = self.explorer.explore().context("Failed to collect code")?;
        if code.trim().is_empty() {
            info!("Explorer returned no code, skipping generation");
            writeln!(out, "{}", NOTHING_TO_REVIEW)?;
            return Ok(NOTHING_TO_REVIEW.to_string());
        }

        info!(
            "Reviewing {} bytes of code with model: {}",
            code.len(),
            self.generator.model_name()
        );
        let mut fragments = self
            .generator
            .stream_generate(&code, Some(self.system_prompt.as_str()))
            .await?;

        let mut review = String::new();
        while let Some(fragment) = fragments.next().await {
            out.write_all(fragment.as_bytes())?;
            out.flush()?;
            review.push_str(&fragment);
        }
        writeln!(out)?;
        out.flush()?;

        info!("Review finished ({} bytes)", review.len());
        Ok(review)
    }
}

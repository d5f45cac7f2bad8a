const GENERAL_REVIEW_PROMPT: &str = r#"You are an AI code reviewer.
Your task is to review the provided code and give feedback on its quality, style, and potential improvements.
Point out bugs, security problems and performance issues first, then readability and maintainability.
Reference the file (and line, where possible) each remark applies to.
Review the following code:"#;

pub struct PromptFactory;

impl PromptFactory {
    pub fn general_review_prompt() -> &'static str {
        GENERAL_REVIEW_PROMPT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn general_review_prompt_is_stable() {
        let prompt = PromptFactory::general_review_prompt();
        assert!(prompt.starts_with("You are an AI code reviewer."));
        assert_eq!(prompt, PromptFactory::general_review_prompt());
    }
}

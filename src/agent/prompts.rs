//! Prompts sent to the backend
//!
//! The model is asked for a bare command line, so its answer can be cached
//! and executed as-is.

/// Operating system name used to target the generated command
pub fn host_os() -> &'static str {
    std::env::consts::OS
}

/// Wrap a natural-language task into the command-generation prompt
pub fn build_command_prompt(os_type: &str, task: &str) -> String {
    format!(
        r#"You are a helpful assistant that converts natural language instructions into command line instructions. 1. Your output should only include the command line instruction, nothing else. 2. Provide the command in the correct format for {os_type}, ensuring it is syntactically correct and executable. 3. Include specific arguments or options as necessary. 4. Do not include unnecessary explanations or additional text. 5. Task: "{task}" Return the command without any extra formatting."#
    )
}

/// Ask for a simpler or more efficient version of a generated command
pub fn build_revision_prompt(original_command: &str) -> String {
    format!(
        "The following command was generated, but the user wants a revision:\n\
         Original command: {original_command}\n\
         Please provide a revised, possibly simpler or more efficient version of this command.\n\
         Only return the command, nothing else."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_prompt_mentions_os_and_task() {
        let prompt = build_command_prompt("linux", "list hidden files");
        assert!(prompt.contains("correct format for linux"));
        assert!(prompt.contains(r#"Task: "list hidden files""#));
    }

    #[test]
    fn test_revision_prompt() {
        let prompt = build_revision_prompt("find . -name '*.log' -exec rm {} \\;");
        assert!(prompt.starts_with("The following command was generated"));
        assert!(prompt.contains("Original command: find . -name '*.log'"));
        assert!(prompt.ends_with("Only return the command, nothing else."));
    }
}

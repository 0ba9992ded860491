//! Prompt templates for reasoning and correction.
//!
//! Plain string substitution; the templates are fixed and the placeholders
//! are named. The reasoning engine consumes only the reasoning template;
//! the correction and extraction templates belong to the correction loop.

/// Reasoning prompt for the student model.
pub const REASONING_PROMPT: &str = "\
You are a math problem solver. Solve the following problem step by step.

Problem: {question}

Provide your solution in this format:
1. Break down the problem
2. Show each calculation step
3. State the final answer clearly

Your reasoning:";

/// Correction prompt for the teacher model.
pub const CORRECTION_PROMPT: &str = "\
You are an expert math teacher. A student attempted this problem but got it wrong.

Problem: {question}

Student's incorrect attempt:
{student_reasoning}

Correct answer: {correct_answer}

Provide a clear, step-by-step correct solution that:
1. Identifies where the student went wrong
2. Shows the proper reasoning process
3. Arrives at the correct answer

Correct solution:";

/// Prompt for extracting a bare numeric answer from reasoning text.
pub const EXTRACT_ANSWER_PROMPT: &str = "\
Extract only the final numerical answer from this reasoning.

Reasoning: {reasoning}

Return ONLY the number, nothing else.";

/// Format the reasoning prompt for a question.
pub fn format_reasoning_prompt(question: &str) -> String {
    REASONING_PROMPT.replace("{question}", question)
}

/// Format the correction prompt for the teacher model.
pub fn format_correction_prompt(
    question: &str,
    student_reasoning: &str,
    correct_answer: &str,
) -> String {
    CORRECTION_PROMPT
        .replace("{question}", question)
        .replace("{student_reasoning}", student_reasoning)
        .replace("{correct_answer}", correct_answer)
}

/// Format the answer-extraction prompt.
pub fn format_extract_prompt(reasoning: &str) -> String {
    EXTRACT_ANSWER_PROMPT.replace("{reasoning}", reasoning)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reasoning_prompt_substitutes_question() {
        let prompt = format_reasoning_prompt("What is 2+2?");
        assert!(prompt.contains("Problem: What is 2+2?"));
        assert!(!prompt.contains("{question}"));
        assert!(prompt.ends_with("Your reasoning:"));
    }

    #[test]
    fn test_correction_prompt_substitutes_all_placeholders() {
        let prompt = format_correction_prompt("Q", "wrong steps", "42");
        assert!(prompt.contains("Problem: Q"));
        assert!(prompt.contains("wrong steps"));
        assert!(prompt.contains("Correct answer: 42"));
        assert!(!prompt.contains('{'));
    }

    #[test]
    fn test_extract_prompt_substitutes_reasoning() {
        let prompt = format_extract_prompt("so the total is 18");
        assert!(prompt.contains("Reasoning: so the total is 18"));
        assert!(!prompt.contains("{reasoning}"));
    }
}

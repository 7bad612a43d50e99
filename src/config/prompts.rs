//! Prompt templates for SmartLearn.
//!
//! Prompts can be customized by placing TOML files in the custom prompts directory.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Collection of all prompt templates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub tutor: TutorPrompts,
    pub quiz: QuizPrompts,
    pub lecture: LecturePrompts,
    pub parsing: ParsingPrompts,
    /// Custom variables from config, available in all prompts.
    #[serde(skip)]
    pub variables: std::collections::HashMap<String, String>,
}

impl Default for Prompts {
    fn default() -> Self {
        let mut variables = std::collections::HashMap::new();
        variables.insert("team".to_string(), "SmartLearn".to_string());
        Self {
            tutor: TutorPrompts::default(),
            quiz: QuizPrompts::default(),
            lecture: LecturePrompts::default(),
            parsing: ParsingPrompts::default(),
            variables,
        }
    }
}

/// Prompts used while answering a student's question.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorPrompts {
    pub classify: String,
    pub greeting: String,
    pub hypothetical: String,
    pub expand: String,
    pub answer_system: String,
    pub answer_user: String,
    pub related_system: String,
    pub related_user: String,
}

impl Default for TutorPrompts {
    fn default() -> Self {
        Self {
            classify: r#"You are the front desk of an educational tutoring assistant covering school subjects such as mathematics, physics, chemistry, biology, literature, history, geography, civics, technology and computer science.

Read the user's message.
- If answering it requires subject knowledge, reply with: true
- If it is a greeting, small talk or a social pleasantry, reply with: false

Reply with exactly one word, true or false.

Examples:
- "Hi, how are you?" -> false
- "What is the Pythagorean theorem?" -> true
- "Who invented the light bulb?" -> true"#
                .to_string(),

            greeting: r#"You are a friendly educational tutoring assistant built by the {{team}} team. You help students with school subjects such as mathematics, physics, chemistry, biology, literature, history, geography, civics, technology and computer science.

Greet the user back in your role and briefly say what you can help with. Do not add any other information."#
                .to_string(),

            hypothetical: r#"You are an educational tutoring assistant. Write one short paragraph that directly answers the question below, as it might appear in a textbook. Return only the paragraph."#
                .to_string(),

            expand: r#"You are an educational tutoring assistant. For the question below:
1. Write a one-sentence summary of what is being asked.
2. List the key entities or topics the question refers to.

Respond only with JSON of the form {"summary": "...", "items": ["...", "..."]}.

Example: for "Who was Marie Curie and what did she discover?" respond
{"summary": "Who Marie Curie was and her discoveries", "items": ["Marie Curie", "Discoveries of Marie Curie"]}"#
                .to_string(),

            answer_system: r#"You are an educational tutoring assistant.

Guidelines:
- Answer the user's question using the reference passages provided after the question
- If the passages contain anything relevant, however little, answer with it
- If they contain nothing relevant, reply exactly: "Sorry, {{sentinel}}."
- Never add information that is not in the passages"#
                .to_string(),

            answer_user: r#"Question: {{question}}

Reference passages:
{{context}}"#
                .to_string(),

            related_system: r#"You are an educational tutoring assistant. Read the material provided and write exactly one question together with its answer, both grounded only in that material.

Format:
Question: ...
Answer: ..."#
                .to_string(),

            related_user: r#"Material:
{{context}}"#
                .to_string(),
        }
    }
}

/// Prompts for multiple-choice quiz generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QuizPrompts {
    pub system: String,
    pub user: String,
}

impl Default for QuizPrompts {
    fn default() -> Self {
        Self {
            system: r#"You create multiple-choice quiz questions from study material.

Read the passage and write as many questions as its length and content support. Each question has exactly four options and exactly one correct answer. If a question asks about the purpose or the gist of a paragraph, quote that paragraph in the question.

Respond only with a JSON array:
[
  {
    "question": "<question>",
    "options": ["<A>", "<B>", "<C>", "<D>"],
    "correct_answer": "<the correct option, copied verbatim>"
  }
]"#
                .to_string(),

            user: r#"Material for the questions:
{{content}}"#
                .to_string(),
        }
    }
}

/// Prompts for lecture narration and slide images.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LecturePrompts {
    pub script_system: String,
    pub script_user: String,
    pub describe_image: String,
}

impl Default for LecturePrompts {
    fn default() -> Self {
        Self {
            script_system: r#"You are a teacher narrating a slide deck. Write the spoken narration for one slide: natural sentences, no markdown, no stage directions, about 60 to 150 words. Explain tables and images in words rather than reading them cell by cell."#
                .to_string(),

            script_user: r#"Slide {{slide_number}} of {{total_slides}}: {{title}}

Text:
{{text}}

Tables:
{{tables}}

Images:
{{images}}"#
                .to_string(),

            describe_image: r#"Describe this image in detail. Focus on the main elements, their arrangement, and any text or important visual information."#
                .to_string(),
        }
    }
}

/// Prompts for turning extracted page text into markdown.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParsingPrompts {
    pub system: String,
    pub user: String,
}

impl Default for ParsingPrompts {
    fn default() -> Self {
        Self {
            system: r#"You transcribe educational content into markdown with these rules:

1. Use `#` for main topics (book titles, law names, main subjects).
2. Use `##` for sections ("Chapter 1", "Lesson 2", "Example 3").
3. Use `###` for subsections ("Definitions", "Theorems", "Proofs").
4. Use `####` for specific points ("Article 1", "Step 2").
5. Use `-` for bullet points and `1.`, `2.` for numbered lists.
6. Format equations with LaTeX inside `$$ ... $$`.
7. Format tables in markdown, keeping text in the correct cells.
8. Respond only with the markdown content, without code fences or commentary."#
                .to_string(),

            user: r#"Transcribe page {{page}} of "{{filename}}" into markdown:

{{text}}"#
                .to_string(),
        }
    }
}

impl Prompts {
    /// Load prompts from the default location, with optional custom directory and variables.
    pub fn load(
        custom_dir: Option<&str>,
        custom_variables: Option<&std::collections::HashMap<String, String>>,
    ) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(vars) = custom_variables {
            prompts.variables = vars.clone();
        }
        prompts
            .variables
            .entry("team".to_string())
            .or_insert_with(|| "SmartLearn".to_string());

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            let tutor_path = custom_path.join("tutor.toml");
            if tutor_path.exists() {
                let content = std::fs::read_to_string(&tutor_path)?;
                prompts.tutor = toml::from_str(&content)?;
            }

            let quiz_path = custom_path.join("quiz.toml");
            if quiz_path.exists() {
                let content = std::fs::read_to_string(&quiz_path)?;
                prompts.quiz = toml::from_str(&content)?;
            }

            let lecture_path = custom_path.join("lecture.toml");
            if lecture_path.exists() {
                let content = std::fs::read_to_string(&lecture_path)?;
                prompts.lecture = toml::from_str(&content)?;
            }

            let parsing_path = custom_path.join("parsing.toml");
            if parsing_path.exists() {
                let content = std::fs::read_to_string(&parsing_path)?;
                prompts.parsing = toml::from_str(&content)?;
            }
        }

        Ok(prompts)
    }

    /// Render a prompt template with the given variables.
    pub fn render(template: &str, vars: &std::collections::HashMap<String, String>) -> String {
        let mut result = template.to_string();
        for (key, value) in vars {
            result = result.replace(&format!("{{{{{}}}}}", key), value);
        }
        result
    }

    /// Render a prompt template with both provided variables and custom config variables.
    /// Provided variables take precedence over custom config variables.
    pub fn render_with_custom(
        &self,
        template: &str,
        vars: &std::collections::HashMap<String, String>,
    ) -> String {
        let mut merged = self.variables.clone();
        for (key, value) in vars {
            merged.insert(key.clone(), value.clone());
        }
        Self::render(template, &merged)
    }
}

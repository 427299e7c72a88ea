// crates/core/src/prompts.rs
//! Prompt builders for the three text-generation stages.

use crate::llm::CompletionRequest;

const WRITER_SYSTEM: &str = "You are a creative picture book writer.";

const PROMPT_ENGINEER_SYSTEM: &str =
    "You are an expert at creating input prompts for text-to-image neural networks.";

/// Stage 2: a title for the book.
pub fn title_prompt(user_input: &str) -> CompletionRequest {
    CompletionRequest::text(format!(
        "Given a sentence/topic, it is your job to create a title suitable for a picture book.\n\n\
         Sentence/topic: {user_input}\n\
         Writer: This is a title for the above sentence/topic:"
    ))
    .with_system(WRITER_SYSTEM)
    .with_max_tokens(64)
}

/// Stage 3: the text for every page, one `Page <N>:` block per page.
pub fn page_text_prompt(user_input: &str, title: &str, total_pages: u32) -> CompletionRequest {
    CompletionRequest::text(format!(
        "Given the title and the provided sentence/topic of the {total_pages} page picture book, \
         it is your job to write the text that should appear on each of the {total_pages} pages.\n\
         Start each page with \"Page <number>:\".\n\n\
         Title: {title}\n\
         Sentence/topic: {user_input}\n\
         Text for each of the {total_pages} pages from a creative picture book writer for the above picture book:"
    ))
    .with_system(WRITER_SYSTEM)
}

/// Stage 4: one text-to-image prompt per page, in the same `Page <N>:` layout.
///
/// `page_text` is the raw generator output of stage 3, not the parsed pages.
pub fn image_prompt_prompt(title: &str, page_text: &str, total_pages: u32) -> CompletionRequest {
    CompletionRequest::text(format!(
        "Prompts are comma separated tags. Put the subject first, characteristic tags in the middle \
         and lighting or camera settings at the end. Describe the lighting and time of day. \
         Keep each prompt of medium length.\n\
         Example: Stunning concept art render of a mysterious magical forest with river passing through, \
         epic concept art, light effect, volumetric light, 3d, ultra clear detailed, octane render, 8k\n\n\
         Given the title and text for each page of a picture book, create a prompt for the image that \
         should accompany the text on each page. Start each prompt with \"Page <number>:\".\n\n\
         Title: {title}\n\
         Text for each page:\n{page_text}\n\
         Text-to-image neural network input prompts for each of the {total_pages} pages for the above picture book:"
    ))
    .with_system(PROMPT_ENGINEER_SYSTEM)
}

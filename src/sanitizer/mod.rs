//! Plain-text rendering of feed markup for display.

use html5ever::tendril::StrTendril;
use html5ever::tokenizer::{
    BufferQueue, Token, TokenSink, TokenSinkResult, Tokenizer, TokenizerOpts,
};

/// Collects character tokens, dropping tags, comments and doctypes.
#[derive(Default)]
struct TextSink {
    text: String,
}

impl TokenSink for TextSink {
    type Handle = ();

    fn process_token(&mut self, token: Token, _line_number: u64) -> TokenSinkResult<()> {
        if let Token::CharacterTokens(chunk) = token {
            self.text.push_str(&chunk);
        }
        TokenSinkResult::Continue
    }
}

/// Strip markup from `s`, keeping only text content.
///
/// Text tokens are concatenated in source order, with nothing inserted
/// between them, and the result is trimmed. Comments and tags are dropped;
/// entities are decoded. Text inside `<script>` and `<style>` is kept like
/// any other text.
pub fn strip_markup(s: &str) -> String {
    if s.is_empty() {
        return String::new();
    }

    let mut input = BufferQueue::new();
    input.push_back(StrTendril::from_slice(s));

    let mut tokenizer = Tokenizer::new(TextSink::default(), TokenizerOpts::default());
    // The sink never asks for a script pause, so one feed drains the queue.
    let _ = tokenizer.feed(&mut input);
    tokenizer.end();

    tokenizer.sink.text.trim().to_string()
}

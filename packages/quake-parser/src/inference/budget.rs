//! Prompt size budgeting.
//!
//! The inference prompt embeds the whole page, so an oversized page must be
//! cut before the model sees it. The cut is proportional to the overflow:
//! with a prompt of `t` tokens against a ceiling of `max`, the HTML keeps
//! `max / t * margin` of its characters. The fixed prompt text does not
//! shrink with the HTML, so the estimate is repeated until the prompt fits.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::traits::inferrer::{SchemaInferrer, TokenCounter};

/// Upper bound on count-and-cut rounds.
const MAX_PASSES: usize = 5;

/// Token ceiling for inference prompts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PromptBudget {
    /// Largest prompt the model may receive, in tokens
    pub max_tokens: usize,

    /// Fraction of the proportional cut actually kept (default: 0.9)
    pub safety_margin: f64,
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            max_tokens: 80_000,
            safety_margin: 0.9,
        }
    }
}

impl PromptBudget {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            max_tokens,
            ..Default::default()
        }
    }

    pub fn with_safety_margin(mut self, margin: f64) -> Self {
        self.safety_margin = margin.clamp(0.05, 1.0);
        self
    }

    /// Cut `html` so the rendered prompt fits the ceiling.
    ///
    /// Returns a prefix of `html` (possibly all of it). Cuts land on
    /// character boundaries.
    pub async fn fit<'a>(
        &self,
        html: &'a str,
        title: &str,
        inferrer: &dyn SchemaInferrer,
        counter: &dyn TokenCounter,
    ) -> &'a str {
        let mut current = html;

        for pass in 0..MAX_PASSES {
            let tokens = counter
                .count_tokens(&inferrer.render_prompt(current, title))
                .await;
            if tokens <= self.max_tokens || current.is_empty() {
                if pass > 0 {
                    debug!(
                        original_chars = html.len(),
                        kept_chars = current.len(),
                        tokens,
                        max_tokens = self.max_tokens,
                        "Truncated HTML for inference"
                    );
                }
                return current;
            }

            let chars = current.chars().count();
            let ratio = self.max_tokens as f64 / tokens as f64 * self.safety_margin;
            let target = ((chars as f64 * ratio) as usize).min(chars.saturating_sub(1));
            debug!(pass, tokens, chars, target, "Prompt over budget");
            current = char_prefix(current, target);
        }

        let tokens = counter
            .count_tokens(&inferrer.render_prompt(current, title))
            .await;
        if tokens > self.max_tokens {
            warn!(
                original_chars = html.len(),
                kept_chars = current.len(),
                tokens,
                max_tokens = self.max_tokens,
                "Prompt still over budget after truncation"
            );
        }
        current
    }
}

/// The first `n` characters of `s`.
fn char_prefix(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inference::tokens::HeuristicTokenCounter;
    use crate::testing::MockInferrer;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Reports every prompt as twice the ceiling, however short.
    struct StubbornCounter {
        tokens: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl TokenCounter for StubbornCounter {
        async fn count_tokens(&self, _text: &str) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.tokens
        }
    }

    #[tokio::test]
    async fn test_small_page_is_untouched() {
        let budget = PromptBudget::new(80_000);
        let html = "<html><body><p>Magnitude 5.2</p></body></html>";

        let kept = budget
            .fit(html, "Quake", &MockInferrer::new(), &HeuristicTokenCounter)
            .await;

        assert_eq!(kept, html);
    }

    #[tokio::test]
    async fn test_oversized_page_fits_under_ceiling() {
        let budget = PromptBudget::new(2_000);
        let inferrer = MockInferrer::new();
        // Roughly 3x the ceiling
        let html = "<p>aftershock</p>".repeat(1_500);
        let before = HeuristicTokenCounter::estimate(&inferrer.render_prompt(&html, "Quake"));
        assert!(before > 3 * budget.max_tokens);

        let kept = budget.fit(&html, "Quake", &inferrer, &HeuristicTokenCounter).await;

        let after = HeuristicTokenCounter::estimate(&inferrer.render_prompt(kept, "Quake"));
        assert!(after < budget.max_tokens, "{} tokens left", after);
        assert!(html.starts_with(kept));
        assert!(!kept.is_empty());
    }

    #[tokio::test]
    async fn test_final_cut_is_counted_again() {
        let budget = PromptBudget::new(1_000);
        let counter = StubbornCounter {
            tokens: 2_000,
            calls: AtomicUsize::new(0),
        };
        let html = "a".repeat(10_000);

        let kept = budget.fit(&html, "Quake", &MockInferrer::new(), &counter).await;

        assert_eq!(counter.calls.load(Ordering::SeqCst), MAX_PASSES + 1);
        assert!(!kept.is_empty());
        assert!(kept.len() < html.len());
    }

    #[test]
    fn test_char_prefix_respects_boundaries() {
        assert_eq!(char_prefix("déjà vu", 3), "déj");
        assert_eq!(char_prefix("abc", 10), "abc");
        assert_eq!(char_prefix("abc", 0), "");
    }
}

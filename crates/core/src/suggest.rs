//! Inbox reply-suggestion engine.
//!
//! Given the latest inbound message of a conversation, rank the company's
//! reply templates by keyword affinity and attach the best-matching
//! knowledge-base snippet. Deterministic and database-free: the caller
//! loads candidate templates and knowledge items, this module only scores
//! and renders.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::types::DbId;

/// Minimum template score for a suggestion to be emitted at all.
const SCORE_THRESHOLD: f64 = 0.15;

/// Maximum number of suggestions returned per request.
pub const MAX_SUGGESTIONS: usize = 3;

/// Stop words skipped during tokenisation. Mixed Portuguese/English because
/// site managers write in both.
const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "com", "da", "de", "do", "e", "em", "for", "has", "is", "na",
    "no", "o", "of", "on", "os", "ou", "para", "por", "que", "the", "to", "um", "uma", "was",
    "with", "you",
];

/// A reply template candidate, as loaded from `ai_templates`.
#[derive(Debug, Clone)]
pub struct TemplateCandidate {
    pub id: DbId,
    /// Comma-separated trigger keywords, e.g. `"orçamento, preço, valor"`.
    pub trigger_keywords: String,
    /// Reply body with `{{contact_name}}` / `{{company_name}}` placeholders.
    pub body: String,
}

/// A knowledge-base candidate, as loaded from `knowledge_items`.
#[derive(Debug, Clone)]
pub struct KnowledgeCandidate {
    pub id: DbId,
    pub title: String,
    pub body: String,
}

/// Placeholder values substituted into the rendered template body.
#[derive(Debug, Clone)]
pub struct RenderContext<'a> {
    pub contact_name: &'a str,
    pub company_name: &'a str,
}

/// One ranked reply draft.
#[derive(Debug, Clone, Serialize)]
pub struct Suggestion {
    pub template_id: DbId,
    /// Rendered reply text with placeholders substituted.
    pub body: String,
    /// Match score in `[0, 1]`, higher is better.
    pub score: f64,
    /// Best-matching knowledge item, when one overlaps the message.
    pub knowledge_item_id: Option<DbId>,
    pub knowledge_snippet: Option<String>,
}

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\p{Alphabetic}\d]+").expect("static regex"))
}

/// Lowercase alphanumeric tokens of `text`, stop words removed.
pub fn tokenize(text: &str) -> HashSet<String> {
    word_re()
        .find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|w| w.len() > 1 && !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Jaccard similarity between two token sets.
fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count() as f64;
    let union = a.union(b).count() as f64;
    intersection / union
}

/// Score a template's trigger keywords against the message tokens.
///
/// Uses trigger-set coverage rather than plain Jaccard so a short keyword
/// list fully contained in a long message still scores 1.0.
fn template_score(message: &HashSet<String>, triggers: &HashSet<String>) -> f64 {
    if triggers.is_empty() || message.is_empty() {
        return 0.0;
    }
    let hit = triggers.intersection(message).count() as f64;
    hit / triggers.len() as f64
}

/// Substitute `{{contact_name}}` and `{{company_name}}` in a template body.
fn render(body: &str, ctx: &RenderContext<'_>) -> String {
    body.replace("{{contact_name}}", ctx.contact_name)
        .replace("{{company_name}}", ctx.company_name)
}

/// Rank templates against `message` and return up to [`MAX_SUGGESTIONS`]
/// rendered drafts, best first. Ties break on lower template id so results
/// are stable across runs.
pub fn suggest_replies(
    message: &str,
    templates: &[TemplateCandidate],
    knowledge: &[KnowledgeCandidate],
    ctx: &RenderContext<'_>,
) -> Vec<Suggestion> {
    let message_tokens = tokenize(message);

    let best_knowledge = knowledge
        .iter()
        .map(|k| {
            let tokens = tokenize(&format!("{} {}", k.title, k.body));
            (k, jaccard(&message_tokens, &tokens))
        })
        .filter(|(_, score)| *score > 0.0)
        .max_by(|(a, sa), (b, sb)| sa.total_cmp(sb).then(b.id.cmp(&a.id)));

    let mut scored: Vec<(f64, &TemplateCandidate)> = templates
        .iter()
        .map(|t| {
            let triggers = tokenize(&t.trigger_keywords);
            (template_score(&message_tokens, &triggers), t)
        })
        .filter(|(score, _)| *score >= SCORE_THRESHOLD)
        .collect();

    scored.sort_by(|(sa, a), (sb, b)| sb.total_cmp(sa).then(a.id.cmp(&b.id)));

    scored
        .into_iter()
        .take(MAX_SUGGESTIONS)
        .map(|(score, t)| Suggestion {
            template_id: t.id,
            body: render(&t.body, ctx),
            score,
            knowledge_item_id: best_knowledge.map(|(k, _)| k.id),
            knowledge_snippet: best_knowledge.map(|(k, _)| snippet(&k.body)),
        })
        .collect()
}

/// First ~200 characters of a knowledge body, cut at a word boundary.
fn snippet(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() <= MAX {
        return body.to_string();
    }
    let cut = body[..MAX].rfind(' ').unwrap_or(MAX);
    format!("{}…", &body[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> RenderContext<'static> {
        RenderContext {
            contact_name: "Marcos",
            company_name: "Construtora Alfa",
        }
    }

    fn template(id: DbId, triggers: &str, body: &str) -> TemplateCandidate {
        TemplateCandidate {
            id,
            trigger_keywords: triggers.to_string(),
            body: body.to_string(),
        }
    }

    #[test]
    fn tokenize_drops_stop_words_and_case() {
        let tokens = tokenize("O orçamento da obra está PRONTO para você");
        assert!(tokens.contains("orçamento"));
        assert!(tokens.contains("pronto"));
        assert!(!tokens.contains("da"));
        assert!(!tokens.contains("o"));
    }

    #[test]
    fn matching_template_outranks_unrelated_one() {
        let templates = vec![
            template(1, "orçamento, preço", "Olá {{contact_name}}, segue o orçamento."),
            template(2, "visita, agendamento", "Podemos agendar uma visita."),
        ];

        let out = suggest_replies("qual o preço do orçamento?", &templates, &[], &ctx());
        assert_eq!(out.len(), 1, "unrelated template must not appear");
        assert_eq!(out[0].template_id, 1);
        assert!(out[0].score > 0.9);
    }

    #[test]
    fn placeholders_are_substituted() {
        let templates = vec![template(
            1,
            "horário",
            "Olá {{contact_name}}, a {{company_name}} atende das 8h às 18h.",
        )];
        let out = suggest_replies("qual o horário de atendimento?", &templates, &[], &ctx());
        assert_eq!(
            out[0].body,
            "Olá Marcos, a Construtora Alfa atende das 8h às 18h."
        );
    }

    #[test]
    fn below_threshold_yields_empty_result() {
        let templates = vec![template(1, "orçamento, preço, valor, custo, pagamento", "...")];
        // Message shares nothing with the trigger set.
        let out = suggest_replies("bom dia", &templates, &[], &ctx());
        assert!(out.is_empty());
    }

    #[test]
    fn best_knowledge_item_is_attached() {
        let templates = vec![template(1, "entrega, prazo", "O prazo é {{company_name}}.")];
        let knowledge = vec![
            KnowledgeCandidate {
                id: 10,
                title: "Prazo de entrega".into(),
                body: "Entregas em até 30 dias úteis após aprovação do pedido.".into(),
            },
            KnowledgeCandidate {
                id: 11,
                title: "Política de reembolso".into(),
                body: "Reembolsos em até 7 dias.".into(),
            },
        ];

        let out = suggest_replies("qual o prazo de entrega?", &templates, &knowledge, &ctx());
        assert_eq!(out[0].knowledge_item_id, Some(10));
        assert!(out[0].knowledge_snippet.as_deref().unwrap().contains("30 dias"));
    }

    #[test]
    fn at_most_three_suggestions() {
        let templates: Vec<_> = (1..=5)
            .map(|id| template(id, "obra", &format!("Resposta {id}")))
            .collect();
        let out = suggest_replies("novidades da obra?", &templates, &[], &ctx());
        assert_eq!(out.len(), MAX_SUGGESTIONS);
        // Equal scores break ties on lower id.
        assert_eq!(out[0].template_id, 1);
    }

    #[test]
    fn snippet_cuts_at_word_boundary() {
        let long = "palavra ".repeat(60);
        let s = snippet(&long);
        assert!(s.len() <= 202);
        assert!(s.ends_with('…'));
    }
}

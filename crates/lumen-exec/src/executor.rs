use lumen_core::state::GenerationKind;
use lumen_core::tools::ToolId;
use tracing::debug;

use crate::contracts::GenerationOutcome;
use crate::contracts::GenerationRequest;
use crate::contracts::GenerationStatus;

/// Seam to whatever produces text for a prompt. Hosted LLM providers sit
/// behind this trait; the crate only ships the offline implementation.
pub trait GenerationExecutor {
    fn name(&self) -> &'static str;

    fn execute(&self, request: GenerationRequest) -> GenerationOutcome;
}

/// Deterministic offline responses. Same request, same text.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimulatedExecutor;

impl GenerationExecutor for SimulatedExecutor {
    fn name(&self) -> &'static str {
        "simulated"
    }

    fn execute(&self, request: GenerationRequest) -> GenerationOutcome {
        debug!(
            request_id = request.request_id,
            executor = self.name(),
            "executing generation"
        );
        let topic = topic_of(&request.prompt);
        if topic.is_empty() {
            return build_outcome(
                &request,
                GenerationStatus::Failed,
                "empty prompt".to_string(),
            );
        }

        let text = match request.kind {
            GenerationKind::Chat => format!(
                "I'm running offline right now, so here is a quick take on \"{topic}\": \
start small, stay consistent, and share what you learn along the way."
            ),
            GenerationKind::Tool(ToolId::Caption) => [
                format!("{topic}, but make it a lifestyle ✨"),
                format!("Today's vibe: {topic} ☕"),
                format!("Can't stop thinking about {topic} 💭"),
            ]
            .join("\n"),
            GenerationKind::Tool(ToolId::Hashtags) => hashtags(topic),
            GenerationKind::Tool(ToolId::Script) => [
                format!("HOOK: You won't believe what {topic} can do."),
                format!("BEAT 1: The problem everyone has with {topic}."),
                "BEAT 2: The one change that fixes it.".to_string(),
                "BEAT 3: What happened when I tried it.".to_string(),
                "CTA: Follow for part two.".to_string(),
            ]
            .join("\n"),
            GenerationKind::Tool(ToolId::Bio) => [
                format!("Professional: {topic} | Sharing what works."),
                format!("Playful: Powered by coffee and {topic}."),
                format!("Minimal: {topic}."),
            ]
            .join("\n"),
            GenerationKind::Tool(ToolId::Ideas) => {
                ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"]
                    .iter()
                    .enumerate()
                    .map(|(idx, day)| format!("{day}: {topic} idea #{}", idx + 1))
                    .collect::<Vec<_>>()
                    .join("\n")
            }
        };
        build_outcome(&request, GenerationStatus::Succeeded, text)
    }
}

/// Tool prompts wrap the topic as `...: {topic}. ...`; chat prompts are the
/// topic itself.
fn topic_of(prompt: &str) -> &str {
    let tail = prompt.split_once(": ").map_or(prompt, |(_, rest)| rest);
    let topic = tail.split_once(". ").map_or(tail, |(head, _)| head);
    topic.trim().trim_end_matches('.').trim()
}

fn hashtags(topic: &str) -> String {
    let words: Vec<String> = topic
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|ch| ch.is_alphanumeric())
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|word| !word.is_empty())
        .collect();
    let mut tags: Vec<String> = words.iter().map(|word| format!("#{word}")).collect();
    if words.len() > 1 {
        tags.push(format!("#{}", words.concat()));
    }
    for generic in ["#contentcreator", "#dailyinspo", "#explore"] {
        tags.push(generic.to_string());
    }
    tags.join("\n")
}

fn build_outcome(
    request: &GenerationRequest,
    status: GenerationStatus,
    text: String,
) -> GenerationOutcome {
    GenerationOutcome {
        request_id: request.request_id,
        status,
        text,
        logs: vec![format!(
            "generation {} {}",
            request.request_id,
            match status {
                GenerationStatus::Succeeded => "succeeded",
                GenerationStatus::Failed => "failed",
            }
        )],
    }
}

#[cfg(test)]
mod tests {
    use lumen_core::actions::GenerationReply;
    use lumen_core::tools::ToolRegistry;
    use pretty_assertions::assert_eq;

    use super::*;

    fn tool_request(tool: ToolId, input: &str) -> GenerationRequest {
        GenerationRequest {
            request_id: 4,
            kind: GenerationKind::Tool(tool),
            prompt: ToolRegistry::get(tool).build_prompt(input),
        }
    }

    #[test]
    fn topic_is_recovered_from_every_tool_template() {
        for spec in ToolRegistry::list() {
            assert_eq!(topic_of(&spec.build_prompt("home baking")), "home baking");
        }
        assert_eq!(topic_of("how do I grow on reels?"), "how do I grow on reels?");
    }

    #[test]
    fn hashtags_are_derived_from_topic() {
        let outcome = SimulatedExecutor.execute(tool_request(ToolId::Hashtags, "Home Baking!"));
        assert_eq!(outcome.status, GenerationStatus::Succeeded);
        let tags: Vec<&str> = outcome.text.lines().take(3).collect();
        assert_eq!(tags, vec!["#home", "#baking", "#homebaking"]);
    }

    #[test]
    fn ideas_cover_a_week() {
        let outcome = SimulatedExecutor.execute(tool_request(ToolId::Ideas, "yoga"));
        assert_eq!(outcome.text.lines().count(), 7);
        assert_eq!(outcome.request_id, 4);
    }

    #[test]
    fn execution_is_deterministic() {
        let request = GenerationRequest {
            request_id: 1,
            kind: GenerationKind::Chat,
            prompt: "pricing my first course".to_string(),
        };
        assert_eq!(
            SimulatedExecutor.execute(request.clone()),
            SimulatedExecutor.execute(request)
        );
    }

    #[test]
    fn blank_prompt_fails_into_reply() {
        let outcome = SimulatedExecutor.execute(GenerationRequest {
            request_id: 2,
            kind: GenerationKind::Chat,
            prompt: "   ".to_string(),
        });
        assert_eq!(
            outcome.into_reply(),
            GenerationReply::Failed("empty prompt".to_string())
        );
    }
}

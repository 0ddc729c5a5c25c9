use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    Caption,
    Hashtags,
    Script,
    Bio,
    Ideas,
}

impl ToolId {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Caption => "caption",
            Self::Hashtags => "hashtags",
            Self::Script => "script",
            Self::Bio => "bio",
            Self::Ideas => "ideas",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        ToolRegistry::list()
            .iter()
            .map(|spec| spec.id)
            .find(|id| id.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolSpec {
    pub id: ToolId,
    pub title: &'static str,
    pub description: &'static str,
    /// `{input}` is replaced with the user's topic.
    pub prompt_template: &'static str,
}

impl ToolSpec {
    pub fn build_prompt(&self, input: &str) -> String {
        self.prompt_template.replace("{input}", input.trim())
    }
}

pub struct ToolRegistry;

const TOOL_SPECS: [ToolSpec; 5] = [
    ToolSpec {
        id: ToolId::Caption,
        title: "Caption Generator",
        description: "Short, punchy social captions for a post.",
        prompt_template: "Write three engaging social media captions about: {input}. \
Keep each under 150 characters and include one emoji.",
    },
    ToolSpec {
        id: ToolId::Hashtags,
        title: "Hashtag Generator",
        description: "A mix of broad and niche hashtags for reach.",
        prompt_template: "Suggest 15 relevant hashtags for a post about: {input}. \
Mix popular and niche tags, one per line.",
    },
    ToolSpec {
        id: ToolId::Script,
        title: "Video Script",
        description: "A 30 to 60 second short-form video script.",
        prompt_template: "Write a 30-60 second short video script about: {input}. \
Include a hook, three beats, and a call to action.",
    },
    ToolSpec {
        id: ToolId::Bio,
        title: "Bio Writer",
        description: "Profile bios in a few tones.",
        prompt_template: "Write three profile bios for: {input}. \
One professional, one playful, one minimal. Max 150 characters each.",
    },
    ToolSpec {
        id: ToolId::Ideas,
        title: "Content Ideas",
        description: "A week of content ideas for a niche.",
        prompt_template: "Give seven content ideas, one per day, for a creator focused on: {input}.",
    },
];

impl ToolRegistry {
    pub fn list() -> &'static [ToolSpec] {
        &TOOL_SPECS
    }

    pub fn get(id: ToolId) -> &'static ToolSpec {
        match id {
            ToolId::Caption => &TOOL_SPECS[0],
            ToolId::Hashtags => &TOOL_SPECS[1],
            ToolId::Script => &TOOL_SPECS[2],
            ToolId::Bio => &TOOL_SPECS[3],
            ToolId::Ideas => &TOOL_SPECS[4],
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn registry_lookup_matches_id() {
        for spec in ToolRegistry::list() {
            assert_eq!(ToolRegistry::get(spec.id), spec);
        }
    }

    #[test]
    fn registry_order_is_stable() {
        let ids: Vec<&'static str> = ToolRegistry::list()
            .iter()
            .map(|spec| spec.id.as_str())
            .collect();
        assert_eq!(ids, vec!["caption", "hashtags", "script", "bio", "ideas"]);
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(ToolId::parse(" Hashtags "), Some(ToolId::Hashtags));
        assert_eq!(ToolId::parse("thumbnail"), None);
    }

    #[test]
    fn prompt_embeds_trimmed_input() {
        let prompt = ToolRegistry::get(ToolId::Ideas).build_prompt("  home baking \n");
        assert_eq!(
            prompt,
            "Give seven content ideas, one per day, for a creator focused on: home baking."
        );
    }
}

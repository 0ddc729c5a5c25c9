use lumen_core::actions::GenerationReply;
use lumen_core::state::GenerationKind;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationStatus {
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationRequest {
    pub request_id: u64,
    pub kind: GenerationKind,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    pub request_id: u64,
    pub status: GenerationStatus,
    pub text: String,
    pub logs: Vec<String>,
}

impl GenerationOutcome {
    pub fn into_reply(self) -> GenerationReply {
        match self.status {
            GenerationStatus::Succeeded => GenerationReply::Text(self.text),
            GenerationStatus::Failed => GenerationReply::Failed(self.text),
        }
    }
}

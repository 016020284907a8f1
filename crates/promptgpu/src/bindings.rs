use engine::ShaderPayload;
use shadergen::Model;
use studio::ShaderDraft;
use studioconfig::ModelSetting;

pub fn model_from_setting(setting: ModelSetting) -> Model {
    match setting {
        ModelSetting::Claude => Model::Claude,
        ModelSetting::Gpt4o => Model::Gpt4o,
    }
}

/// Shares the fragment allocation so the heal coordinator can match the
/// compile verdict to the draft by identity.
pub fn payload_from_draft(draft: &ShaderDraft) -> ShaderPayload {
    ShaderPayload::new(draft.fragment.clone())
        .with_compute(draft.compute.clone())
        .with_description(draft.description.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn maps_model_settings() {
        assert_eq!(model_from_setting(ModelSetting::Claude), Model::Claude);
        assert_eq!(model_from_setting(ModelSetting::Gpt4o), Model::Gpt4o);
    }

    #[test]
    fn payload_shares_fragment() {
        let draft = ShaderDraft {
            fragment: Arc::from("@fragment fn fs_main() {}"),
            compute: None,
            description: "plasma".into(),
        };
        let payload = payload_from_draft(&draft);
        assert!(Arc::ptr_eq(&payload.fragment, &draft.fragment));
        assert_eq!(payload.description, "plasma");
    }
}

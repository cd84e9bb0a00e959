//! Built-in generation flows offered by the dashboard.

use crate::{
    definition::{
        ChoiceOption, EndpointSpec, Requiredness, StepDefinition, TextRule, WizardDefinition,
    },
    error::WizardError,
};

pub const THUMBNAIL: &str = "thumbnail";
pub const REDDIT_VIDEO: &str = "reddit_video";
pub const CLIP: &str = "clip";
pub const BROKERAGE_CONNECT: &str = "brokerage_connect";

pub const FLOW_NAMES: [&str; 4] = [THUMBNAIL, REDDIT_VIDEO, CLIP, BROKERAGE_CONNECT];

/// Longest source segment a clip may cover, in seconds.
const MAX_CLIP_SOURCE_SECONDS: u32 = 3 * 60 * 60;

pub fn by_name(name: &str) -> Result<WizardDefinition, WizardError> {
    match name {
        THUMBNAIL => thumbnail(),
        REDDIT_VIDEO => reddit_video(),
        CLIP => clip(),
        BROKERAGE_CONNECT => brokerage_connect(),
        other => Err(WizardError::InvalidDefinition(format!(
            "unknown flow '{other}' (expected one of {})",
            FLOW_NAMES.join(", ")
        ))),
    }
}

pub fn thumbnail() -> Result<WizardDefinition, WizardError> {
    WizardDefinition::new(
        THUMBNAIL,
        vec![
            StepDefinition::text(
                "youtube_url",
                "Video link",
                Requiredness::Required,
                TextRule::HttpUrl,
            ),
            StepDefinition::text(
                "prompt",
                "Describe the thumbnail",
                Requiredness::Optional,
                TextRule::NonEmpty,
            ),
            StepDefinition::choice(
                "style",
                "Style",
                vec![
                    ChoiceOption::new("bold", "Bold text"),
                    ChoiceOption::new("reaction", "Reaction face"),
                    ChoiceOption::new("minimal", "Minimal"),
                ],
            ),
        ],
        EndpointSpec::multipart("/thumbnail").with_result_field("image_url"),
    )
}

pub fn reddit_video() -> Result<WizardDefinition, WizardError> {
    WizardDefinition::new(
        REDDIT_VIDEO,
        vec![
            StepDefinition::choice(
                "persona",
                "Narrator persona",
                vec![
                    ChoiceOption::new("Elon Musk", "Elon Musk"),
                    ChoiceOption::new("Donald Trump", "Donald Trump"),
                    ChoiceOption::new("Andrew Tate", "Andrew Tate"),
                    ChoiceOption::new("Narrator", "Classic narrator"),
                ],
            ),
            StepDefinition::choice(
                "font",
                "Caption font",
                vec![
                    ChoiceOption::new("bebas", "Bebas Neue"),
                    ChoiceOption::new("komika", "Komika Axis"),
                    ChoiceOption::new("montserrat", "Montserrat"),
                ],
            ),
            StepDefinition::choice(
                "video",
                "Background video",
                vec![
                    ChoiceOption::new("minecraft", "Minecraft parkour"),
                    ChoiceOption::new("subway", "Subway surfers"),
                    ChoiceOption::new("gta", "GTA driving"),
                ],
            ),
            StepDefinition::choice(
                "voice",
                "Voice",
                vec![
                    ChoiceOption::new("adam", "Adam"),
                    ChoiceOption::new("bella", "Bella"),
                    ChoiceOption::new("josh", "Josh"),
                ],
            ),
            StepDefinition::text(
                "story_url",
                "Reddit post link",
                Requiredness::Required,
                TextRule::HttpUrl,
            ),
        ],
        EndpointSpec::json("/reddit-video").with_result_field("video_url"),
    )
}

pub fn clip() -> Result<WizardDefinition, WizardError> {
    WizardDefinition::new(
        CLIP,
        vec![
            StepDefinition::text(
                "youtube_url",
                "Video link",
                Requiredness::Required,
                TextRule::HttpUrl,
            ),
            StepDefinition::range("segment", "Segment (seconds)", 0, MAX_CLIP_SOURCE_SECONDS),
            StepDefinition::choice(
                "caption_style",
                "Captions",
                vec![
                    ChoiceOption::new("karaoke", "Word highlight"),
                    ChoiceOption::new("plain", "Plain subtitles"),
                    ChoiceOption::new("none", "No captions"),
                ],
            ),
        ],
        EndpointSpec::json("/clip").with_result_field("video_url"),
    )
}

pub fn brokerage_connect() -> Result<WizardDefinition, WizardError> {
    WizardDefinition::new(
        BROKERAGE_CONNECT,
        vec![
            StepDefinition::choice(
                "brokerage",
                "Brokerage",
                vec![
                    ChoiceOption::new("robinhood", "Robinhood"),
                    ChoiceOption::new("webull", "Webull"),
                    ChoiceOption::new("alpaca", "Alpaca"),
                ],
            ),
            StepDefinition::text(
                "account_label",
                "Account nickname",
                Requiredness::Optional,
                TextRule::NonEmpty,
            ),
        ],
        EndpointSpec::json("/brokerage/connect").with_result_field("redirect_url"),
    )
}

//! Wire types for the Story Spoiler API.

use serde::{Deserialize, Serialize};

/// Story spoiler payload sent to the create and edit endpoints. Optional
/// fields stay off the wire when unset. `id` is write-only from the
/// suite's point of view and never populated here.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Story {
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

/// Response envelope returned by every mutating endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse {
    #[serde(rename = "msg")]
    pub message: Option<String>,
    #[serde(rename = "storyId", default)]
    pub story_id: Option<String>,
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn unset_optional_fields_stay_off_the_wire() -> eyre::Result<()> {
        let story = Story {
            title: "A title".into(),
            description: "A description".into(),
            ..Story::default()
        };

        let json = serde_json::to_value(&story)?;
        assert_eq!(
            serde_json::json!({"title": "A title", "description": "A description"}),
            json
        );
        Ok(())
    }

    #[test]
    fn empty_url_is_serialized_when_present() -> eyre::Result<()> {
        let story = Story {
            title: "A title".into(),
            description: "A description".into(),
            url: Some(String::new()),
            ..Story::default()
        };

        let json = serde_json::to_value(&story)?;
        assert_eq!(
            serde_json::json!({"title": "A title", "description": "A description", "url": ""}),
            json
        );
        Ok(())
    }

    #[test]
    fn api_response_reads_the_documented_field_names() -> eyre::Result<()> {
        let parsed: ApiResponse =
            serde_json::from_str(r#"{"msg": "Successfully created!", "storyId": "abc-123"}"#)?;
        assert_eq!(Some("Successfully created!"), parsed.message.as_deref());
        assert_eq!(Some("abc-123"), parsed.story_id.as_deref());

        let no_id: ApiResponse = serde_json::from_str(r#"{"msg": "No spoilers..."}"#)?;
        assert_eq!(Some("No spoilers..."), no_id.message.as_deref());
        assert_eq!(None, no_id.story_id);
        Ok(())
    }
}

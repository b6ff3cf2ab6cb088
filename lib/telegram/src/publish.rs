//! Type-specific validation and rendering choice.
//!
//! [`render_plan`] evaluates the dispatch rules in order and either
//! produces a concrete send plan or a validation failure. It performs no
//! I/O, so every rule is testable without a transport.

use serde_json::Value;
use telepost_core::{Post, PostType, PublishError};

/// Minimum poll options the provider accepts.
pub const MIN_POLL_OPTIONS: usize = 2;
/// Maximum poll options the provider accepts; longer lists are truncated.
pub const MAX_POLL_OPTIONS: usize = 10;

/// A validated send operation, ready for the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderPlan {
    /// Send a poll.
    Poll {
        question: String,
        options: Vec<String>,
    },
    /// Send an image with the body as caption.
    Image { url: String, caption: String },
    /// Send a plain text message.
    Text { text: String },
}

/// Chooses the rendering for a post, validating its fields.
///
/// Rules, in order:
/// 1. every post needs a non-blank body, whatever its type;
/// 2. polls need a non-blank question and 2-10 parseable options;
/// 3. any post with an image URL renders as an image with the body as
///    caption;
/// 4. everything else renders as text.
///
/// # Errors
///
/// Returns [`PublishError::Validation`] when the post's fields do not
/// satisfy its rendering; no side effect has been produced at that point.
pub fn render_plan(post: &Post) -> Result<RenderPlan, PublishError> {
    if post.body.trim().is_empty() {
        return Err(PublishError::validation("post has no body"));
    }

    if post.post_type == PostType::Poll {
        let question = post
            .poll_question
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .ok_or_else(|| PublishError::validation("poll has no question"))?;

        let serialized = post
            .poll_options
            .as_deref()
            .ok_or_else(|| PublishError::validation("poll has no options"))?;

        return Ok(RenderPlan::Poll {
            question: question.to_string(),
            options: parse_poll_options(serialized)?,
        });
    }

    if let Some(url) = post.image_url.as_deref().filter(|u| !u.trim().is_empty()) {
        return Ok(RenderPlan::Image {
            url: url.to_string(),
            caption: post.body.clone(),
        });
    }

    Ok(RenderPlan::Text {
        text: post.body.clone(),
    })
}

/// Deserializes the store's option list, enforcing the provider bounds.
///
/// # Errors
///
/// Returns a validation failure when the value is not a JSON list of at
/// least [`MIN_POLL_OPTIONS`] strings.
pub fn parse_poll_options(serialized: &str) -> Result<Vec<String>, PublishError> {
    let value: Value = serde_json::from_str(serialized)
        .map_err(|e| PublishError::validation(format!("poll options are not valid JSON: {e}")))?;

    let Some(items) = value.as_array() else {
        return Err(PublishError::validation("poll options are not a list"));
    };

    let mut options = Vec::with_capacity(items.len().min(MAX_POLL_OPTIONS));
    for item in items {
        match item.as_str() {
            Some(option) => options.push(option.to_string()),
            None => {
                return Err(PublishError::validation(
                    "poll options must all be strings",
                ));
            }
        }
    }

    if options.len() < MIN_POLL_OPTIONS {
        return Err(PublishError::validation(format!(
            "poll needs at least {MIN_POLL_OPTIONS} options, got {}",
            options.len()
        )));
    }

    options.truncate(MAX_POLL_OPTIONS);
    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use telepost_core::{PageId, PostStatus};

    fn post(post_type: PostType) -> Post {
        Post {
            id: PageId::new("p1"),
            title: "t".to_string(),
            body: "hello".to_string(),
            post_type,
            image_url: None,
            poll_question: None,
            poll_options: None,
            channel: None,
            publish_at: Local::now(),
            status: PostStatus::Scheduled,
        }
    }

    #[test]
    fn text_post_renders_as_text() {
        let plan = render_plan(&post(PostType::Text)).expect("should validate");
        assert_eq!(
            plan,
            RenderPlan::Text {
                text: "hello".to_string()
            }
        );
    }

    #[test]
    fn blank_body_fails_validation() {
        let mut blank = post(PostType::Text);
        blank.body = "   ".to_string();

        let err = render_plan(&blank).expect_err("must fail");
        assert!(err.is_validation());
    }

    #[test]
    fn image_url_wins_regardless_of_nominal_type() {
        let mut with_image = post(PostType::Text);
        with_image.image_url = Some("https://example.com/a.png".to_string());

        let plan = render_plan(&with_image).expect("should validate");
        assert_eq!(
            plan,
            RenderPlan::Image {
                url: "https://example.com/a.png".to_string(),
                caption: "hello".to_string(),
            }
        );
    }

    #[test]
    fn image_post_with_blank_body_fails_validation() {
        let mut with_image = post(PostType::ImageText);
        with_image.body = String::new();
        with_image.image_url = Some("https://example.com/a.png".to_string());

        let err = render_plan(&with_image).expect_err("must fail");
        assert!(err.is_validation());
    }

    #[test]
    fn poll_without_body_fails_validation() {
        let mut poll = post(PostType::Poll);
        poll.body = "   ".to_string();
        poll.poll_question = Some("Which?".to_string());
        poll.poll_options = Some(r#"["A","B"]"#.to_string());

        let err = render_plan(&poll).expect_err("must fail");
        assert!(err.is_validation());
    }

    #[test]
    fn poll_with_three_options() {
        let mut poll = post(PostType::Poll);
        poll.poll_question = Some("Which?".to_string());
        poll.poll_options = Some(r#"["A","B","C"]"#.to_string());

        let plan = render_plan(&poll).expect("should validate");
        let RenderPlan::Poll { question, options } = plan else {
            panic!("expected a poll plan");
        };
        assert_eq!(question, "Which?");
        assert_eq!(options, ["A", "B", "C"]);
    }

    #[test]
    fn poll_options_truncate_to_ten() {
        let serialized = serde_json::to_string(
            &(1..=15).map(|n| format!("option {n}")).collect::<Vec<_>>(),
        )
        .expect("serialize");

        let options = parse_poll_options(&serialized).expect("should validate");
        assert_eq!(options.len(), MAX_POLL_OPTIONS);
        assert_eq!(options[0], "option 1");
        assert_eq!(options[9], "option 10");
    }

    #[test]
    fn poll_with_one_option_fails_validation() {
        let err = parse_poll_options(r#"["A"]"#).expect_err("must fail");
        assert!(err.is_validation());
    }

    #[test]
    fn poll_with_invalid_json_fails_validation() {
        let err = parse_poll_options("A, B, C").expect_err("must fail");
        assert!(err.is_validation());
    }

    #[test]
    fn poll_with_non_string_options_fails_validation() {
        let err = parse_poll_options("[1, 2]").expect_err("must fail");
        assert!(err.is_validation());
    }

    #[test]
    fn poll_without_question_fails_validation() {
        let mut poll = post(PostType::Poll);
        poll.poll_options = Some(r#"["A","B"]"#.to_string());

        let err = render_plan(&poll).expect_err("must fail");
        assert!(err.is_validation());
    }
}
